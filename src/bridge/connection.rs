//! Broker connection
//!
//! One rumqttc client per process. The event loop task is the only consumer
//! of broker notifications: it flips the connected flag, (re)subscribes on
//! every ConnAck and feeds each publish to the router inline, so messages
//! are dispatched in delivery order. On any connection error it waits a
//! fixed backoff and polls again, which makes rumqttc reconnect. There is no
//! retry limit.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, SubscribeReasonCode,
    TlsConfiguration, Transport,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::publisher::Bridge;
use super::router::Router;
use super::tls;
use crate::config::{BrokerEndpoint, MqttSettings};
use crate::hub::Hub;
use crate::utils::error::BridgeError;

/// Depth of the client → event loop request channel.
const REQUEST_CAPACITY: usize = 64;
/// rumqttc rejects shorter keep-alive intervals.
const MIN_KEEP_ALIVE_SECS: u64 = 5;
/// Keeps a refused connection from spinning `poll()`.
const MIN_RECONNECT_SECS: u64 = 1;

/// Build the client options: timestamped client id, clean session,
/// optional credentials and TLS.
pub fn mqtt_options(settings: &MqttSettings) -> Result<MqttOptions, BridgeError> {
    let endpoint = BrokerEndpoint::parse(&settings.broker_url)?;

    let client_id = format!("{}-{}", settings.client_id, Utc::now().timestamp_millis());
    let mut options = MqttOptions::new(client_id, endpoint.host.clone(), endpoint.port);
    options.set_clean_session(true);
    options.set_keep_alive(Duration::from_secs(
        settings.keep_alive_secs.max(MIN_KEEP_ALIVE_SECS),
    ));

    if let Some(username) = &settings.username {
        options.set_credentials(username, settings.password.clone().unwrap_or_default());
    }

    if endpoint.tls {
        let config = tls::client_config(
            Path::new(&settings.ca_path),
            settings.tls_hostname.as_deref(),
        )?;
        options.set_transport(Transport::tls_with_config(TlsConfiguration::Rustls(
            Arc::new(config),
        )));
    }

    Ok(options)
}

pub fn reconnect_backoff(settings: &MqttSettings) -> Duration {
    Duration::from_secs(settings.reconnect_secs.max(MIN_RECONNECT_SECS))
}

/// Create the client, wrap it in a [`Bridge`] and spawn the event loop.
pub fn start(settings: &MqttSettings, hub: Arc<Hub>) -> Result<(Arc<Bridge>, JoinHandle<()>), BridgeError> {
    let options = mqtt_options(settings)?;
    info!(
        broker = %settings.broker_url,
        client_id = %options.client_id(),
        "Connecting to MQTT broker"
    );

    let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
    let bridge = Arc::new(Bridge::new(client));
    let backoff = reconnect_backoff(settings);

    let task = tokio::spawn(run_event_loop(
        eventloop,
        bridge.clone(),
        Router::new(hub),
        backoff,
    ));
    Ok((bridge, task))
}

pub async fn run_event_loop(
    mut eventloop: EventLoop,
    bridge: Arc<Bridge>,
    router: Router,
    backoff: Duration,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    info!("Connected to MQTT broker");
                    bridge.set_connected(true);
                    bridge.subscribe_all();
                } else {
                    warn!(code = ?ack.code, "MQTT broker refused connection");
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                router.dispatch(&publish.topic, &publish.payload);
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                for code in &ack.return_codes {
                    if matches!(code, SubscribeReasonCode::Failure) {
                        warn!(pkid = ack.pkid, "MQTT broker rejected a subscription");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                info!("MQTT connection closed by broker");
                bridge.set_connected(false);
            }
            Ok(event) => debug!(?event, "MQTT event"),
            Err(e) => {
                if bridge.is_connected() {
                    info!("MQTT connection closed");
                }
                bridge.set_connected(false);
                error!(error = %e, retry_in = ?backoff, "MQTT connection error");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
