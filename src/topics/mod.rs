//! Topic registry
//!
//! The broker namespace is fixed: `rv/<domain>[/<id>]/<message type>`. This
//! module names every segment, lists the subscriptions the bridge issues on
//! connect, and holds the static route table that maps an inbound
//! (domain, message type) pair to a WebSocket channel and a field whitelist.

mod route;

pub use route::{IdSource, Projection, ROUTES, Route, find_route};

pub const ROOT: &str = "rv";

pub const LIGHTS: &str = "lights";
pub const THERMOSTAT: &str = "thermostat";
pub const ENERGY: &str = "energy";
pub const AIRQUALITY: &str = "airquality";
pub const GPS: &str = "gps";
pub const DEPLOYMENT: &str = "deployment";

pub const COMMAND: &str = "command";
pub const STATUS: &str = "status";
pub const TEMP_HUMID: &str = "temphumid";
pub const LAT_LON: &str = "latlon";
pub const ALT: &str = "alt";
pub const DETAILS: &str = "details";
pub const AVAILABLE: &str = "available";

pub const LIGHT_STATUS: &str = "rv/lights/+/status";
pub const THERMOSTAT_COMMAND: &str = "rv/thermostat/command";
pub const THERMOSTAT_STATUS: &str = "rv/thermostat/status";
pub const ENERGY_STATUS: &str = "rv/energy/status";
pub const AIRQUALITY_STATUS: &str = "rv/airquality/status";
pub const AIRQUALITY_TEMP_HUMID: &str = "rv/airquality/temphumid";
pub const GPS_LAT_LON: &str = "rv/gps/latlon";
pub const GPS_ALT: &str = "rv/gps/alt";
pub const GPS_DETAILS: &str = "rv/gps/details";
pub const DEPLOYMENT_AVAILABLE: &str = "rv/deployment/available";

/// Filters subscribed on every successful connect, one request each.
pub const SUBSCRIPTIONS: &[&str] = &[
    LIGHT_STATUS,
    ENERGY_STATUS,
    AIRQUALITY_STATUS,
    AIRQUALITY_TEMP_HUMID,
    GPS_LAT_LON,
    GPS_ALT,
    GPS_DETAILS,
    THERMOSTAT_STATUS,
];

/// `rv/lights/{id}/command`
pub fn light_command(id: u32) -> String {
    format!("{ROOT}/{LIGHTS}/{id}/{COMMAND}")
}

/// A topic split into its meaningful parts. Borrowed from the topic string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicPath<'a> {
    pub domain: &'a str,
    pub id: Option<&'a str>,
    pub message_type: &'a str,
}

impl<'a> TopicPath<'a> {
    /// Split `topic` on `/`. Returns `None` when the root does not match or
    /// the segment count does not fit the domain's shape: lights carry an id
    /// segment, every other domain does not.
    pub fn parse(topic: &'a str) -> Option<Self> {
        let parts: Vec<&str> = topic.split('/').collect();
        if parts.first() != Some(&ROOT) {
            return None;
        }

        match parts.as_slice() {
            [_, domain, id, message_type] if *domain == LIGHTS => Some(Self {
                domain: *domain,
                id: Some(*id),
                message_type: *message_type,
            }),
            [_, domain, message_type] if *domain != LIGHTS => Some(Self {
                domain: *domain,
                id: None,
                message_type: *message_type,
            }),
            _ => None,
        }
    }
}
