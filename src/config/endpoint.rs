use url::Url;

use crate::utils::error::ConfigError;

const MQTT_PORT: u16 = 1883;
const MQTTS_PORT: u16 = 8883;

/// Where the broker lives, split out of `mqtt.broker_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl BrokerEndpoint {
    /// Parse `mqtt://host[:port]` or `mqtts://host[:port]`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::BrokerUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        let tls = match url.scheme() {
            "mqtt" => false,
            "mqtts" => true,
            other => return Err(invalid(&format!("unsupported scheme '{other}'"))),
        };
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host"))?;
        let port = url
            .port()
            .unwrap_or(if tls { MQTTS_PORT } else { MQTT_PORT });

        Ok(Self {
            host: host.to_string(),
            port,
            tls,
        })
    }
}
