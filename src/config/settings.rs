use serde::Deserialize;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub mqtt: MqttSettings,
    pub storage: StorageSettings,
    pub ticker: TickerSettings,
    pub log: LogSettings,
}

/// HTTP/WebSocket listener and REST auth settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory of the browser frontend; nothing is served when unset.
    pub static_dir: Option<String>,
    pub jwt_secret: String,
    /// Password for the seeded `admin` user. Without it no user is created.
    pub admin_password: Option<String>,
    pub session_hours: i64,
}

/// Broker connection settings.
#[derive(Debug, Deserialize, Clone)]
pub struct MqttSettings {
    /// `mqtt://host[:port]` or `mqtts://host[:port]`
    pub broker_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Extra CA certificate, used for `mqtts://` when the file exists.
    pub ca_path: String,
    /// Name the broker certificate is checked against instead of the dialed host.
    pub tls_hostname: Option<String>,
    /// Client id seed; the connect timestamp is appended.
    pub client_id: String,
    pub reconnect_secs: u64,
    pub keep_alive_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub db_path: String,
    pub deployment_dir: String,
}

/// Periods of the simulated level and water feeds.
#[derive(Debug, Deserialize, Clone)]
pub struct TickerSettings {
    pub level_interval_ms: u64,
    pub water_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Every value is optional; missing ones are filled from `Settings::default()`.
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub mqtt: Option<PartialMqttSettings>,
    pub storage: Option<PartialStorageSettings>,
    pub ticker: Option<PartialTickerSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<String>,
    pub jwt_secret: Option<String>,
    pub admin_password: Option<String>,
    pub session_hours: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialMqttSettings {
    pub broker_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ca_path: Option<String>,
    pub tls_hostname: Option<String>,
    pub client_id: Option<String>,
    pub reconnect_secs: Option<u64>,
    pub keep_alive_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialStorageSettings {
    pub db_path: Option<String>,
    pub deployment_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialTickerSettings {
    pub level_interval_ms: Option<u64>,
    pub water_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl PartialSettings {
    /// Fill every missing value from `default`.
    pub fn merge(self, default: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let mqtt = self.mqtt.unwrap_or_default();
        let storage = self.storage.unwrap_or_default();
        let ticker = self.ticker.unwrap_or_default();
        let log = self.log.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(default.server.host),
                port: server.port.unwrap_or(default.server.port),
                static_dir: server.static_dir.or(default.server.static_dir),
                jwt_secret: server.jwt_secret.unwrap_or(default.server.jwt_secret),
                admin_password: server.admin_password.or(default.server.admin_password),
                session_hours: server.session_hours.unwrap_or(default.server.session_hours),
            },
            mqtt: MqttSettings {
                broker_url: mqtt.broker_url.unwrap_or(default.mqtt.broker_url),
                username: mqtt.username.or(default.mqtt.username),
                password: mqtt.password.or(default.mqtt.password),
                ca_path: mqtt.ca_path.unwrap_or(default.mqtt.ca_path),
                tls_hostname: mqtt.tls_hostname.or(default.mqtt.tls_hostname),
                client_id: mqtt.client_id.unwrap_or(default.mqtt.client_id),
                reconnect_secs: mqtt.reconnect_secs.unwrap_or(default.mqtt.reconnect_secs),
                keep_alive_secs: mqtt.keep_alive_secs.unwrap_or(default.mqtt.keep_alive_secs),
            },
            storage: StorageSettings {
                db_path: storage.db_path.unwrap_or(default.storage.db_path),
                deployment_dir: storage
                    .deployment_dir
                    .unwrap_or(default.storage.deployment_dir),
            },
            ticker: TickerSettings {
                level_interval_ms: ticker
                    .level_interval_ms
                    .unwrap_or(default.ticker.level_interval_ms),
                water_interval_ms: ticker
                    .water_interval_ms
                    .unwrap_or(default.ticker.water_interval_ms),
            },
            log: LogSettings {
                level: log.level.unwrap_or(default.log.level),
            },
        }
    }
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 3000,
                static_dir: None,
                jwt_secret: "change-me".to_string(),
                admin_password: None,
                session_hours: 24,
            },
            mqtt: MqttSettings {
                broker_url: "mqtt://localhost:1883".to_string(),
                username: None,
                password: None,
                ca_path: "/app/certs/ca.pem".to_string(),
                tls_hostname: None,
                client_id: "rv-backend".to_string(),
                reconnect_secs: 5,
                keep_alive_secs: 30,
            },
            storage: StorageSettings {
                db_path: "rvdash_db".to_string(),
                deployment_dir: "/data/deployments".to_string(),
            },
            ticker: TickerSettings {
                level_interval_ms: 2_000,
                water_interval_ms: 10_000,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}
