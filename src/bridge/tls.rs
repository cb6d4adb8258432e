//! TLS for `mqtts://` brokers.
//!
//! The broker is reached through an internal address while its certificate
//! is issued for a public name, so the certificate chain is verified against
//! the configured `tls_hostname` instead of the dialed host.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::info;

use crate::utils::error::BridgeError;

/// Web PKI roots plus the CA at `ca_path` when that file exists.
pub fn root_store(ca_path: &Path) -> Result<RootCertStore, BridgeError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if ca_path.exists() {
        let mut reader = BufReader::new(File::open(ca_path)?);
        for cert in rustls_pemfile::certs(&mut reader) {
            roots.add(cert?)?;
        }
        info!(path = %ca_path.display(), "Loaded CA certificate for TLS");
    }

    Ok(roots)
}

pub fn client_config(ca_path: &Path, tls_hostname: Option<&str>) -> Result<ClientConfig, BridgeError> {
    let roots = Arc::new(root_store(ca_path)?);
    let builder = ClientConfig::builder();

    let config = match tls_hostname {
        Some(host) => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(PinnedHostVerifier::new(roots, host)?))
            .with_no_client_auth(),
        None => builder.with_root_certificates(roots).with_no_client_auth(),
    };
    Ok(config)
}

/// Standard web PKI verification with the server name replaced by a fixed one.
#[derive(Debug)]
pub struct PinnedHostVerifier {
    inner: Arc<WebPkiServerVerifier>,
    expected: ServerName<'static>,
}

impl PinnedHostVerifier {
    pub fn new(roots: Arc<RootCertStore>, host: &str) -> Result<Self, BridgeError> {
        let inner = WebPkiServerVerifier::builder(roots)
            .build()
            .map_err(|e| BridgeError::Tls(e.to_string()))?;
        let expected = ServerName::try_from(host.to_string())
            .map_err(|e| BridgeError::Tls(format!("invalid tls hostname '{host}': {e}")))?;
        Ok(Self { inner, expected })
    }

    pub fn expected(&self) -> &ServerName<'static> {
        &self.expected
    }
}

impl ServerCertVerifier for PinnedHostVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        self.inner
            .verify_server_cert(end_entity, intermediates, &self.expected, ocsp_response, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
