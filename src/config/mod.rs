mod endpoint;
mod settings;

use config::{Config, Environment, File};

use crate::utils::error::ConfigError;
use settings::PartialSettings;

pub use endpoint::BrokerEndpoint;
pub use settings::{
    LogSettings, MqttSettings, ServerSettings, Settings, StorageSettings, TickerSettings,
};

/// Flat variable names the deployed containers already set, and the keys
/// they feed. They take precedence over the file and `RVDASH__*` variables.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("MQTT_BROKER_URL", "mqtt.broker_url"),
    ("MQTT_USERNAME", "mqtt.username"),
    ("MQTT_PASSWORD", "mqtt.password"),
    ("MQTT_CA_PATH", "mqtt.ca_path"),
    ("TLS_CERT_HOSTNAME", "mqtt.tls_hostname"),
    ("MQTT_CLIENT_ID", "mqtt.client_id"),
    ("ADMIN_PASSWORD", "server.admin_password"),
    ("JWT_SECRET", "server.jwt_secret"),
    ("PORT", "server.port"),
    ("DATABASE_PATH", "storage.db_path"),
    ("DEPLOYMENT_STORAGE_PATH", "storage.deployment_dir"),
];

/// Loads `.env`, `config/default.toml` and the environment, then fills
/// whatever is still missing with `Settings::default()`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let _ = dotenvy::dotenv();
    load_config_from("config/default")
}

/// Same as [`load_config`] with an explicit file (extension optional) and
/// without reading `.env`.
pub fn load_config_from(file: &str) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(file).required(false))
        .add_source(
            Environment::with_prefix("RVDASH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    for (var, key) in LEGACY_ENV {
        let value = std::env::var(var).ok().filter(|v| !v.is_empty());
        builder = builder.set_override_option(*key, value)?;
    }

    let partial: PartialSettings = builder.build()?.try_deserialize()?;
    let settings = partial.merge(Settings::default());

    // fail at startup rather than on the first connect attempt
    BrokerEndpoint::parse(&settings.mqtt.broker_url)?;

    Ok(settings)
}
