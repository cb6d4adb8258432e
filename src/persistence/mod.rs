//! The `persistence` module is the document store: seed and config rows,
//! the simulated level/water documents, users, sessions and deployment
//! records. Live telemetry never lands here.

mod seed;
pub mod sled_store;

use chrono::{SecondsFormat, Utc};

pub use seed::{LIGHT_NAMES, seed};
pub use sled_store::{Collection, Document, Store};

pub const LIGHTS: &str = "lights";
pub const TRAILER_LEVEL: &str = "trailer_level";
pub const SETTINGS: &str = "settings";
pub const WATER: &str = "water";
pub const USERS: &str = "users";
pub const SESSIONS: &str = "sessions";
pub const DEPLOYMENTS: &str = "deployments";
/// Read-only snapshots; nothing in `rvdash` writes them.
pub const THERMOSTAT: &str = "thermostat";
pub const ENERGY: &str = "energy";
pub const AIR_QUALITY: &str = "airquality";

/// Id of the single-row collections.
pub const MAIN_ID: &str = "main";

/// Current UTC time as stored in documents.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
