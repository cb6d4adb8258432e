//! bridge
//!
//! The MQTT side of the dashboard. The bridge owns the single broker
//! connection, routes inbound telemetry to the hub and exposes the outbound
//! command publishes used by the REST handlers.
//!
//! - `connection`: client options, TLS, and the event loop task
//! - `router`: topic parsing, route lookup and field projection
//! - `publisher`: the `Bridge` handle and its connected-guarded publishes
//! - `tls`: root store and hostname-pinned certificate verification

pub mod connection;
pub mod publisher;
pub mod router;
pub mod tls;

pub use connection::{mqtt_options, start};
pub use publisher::{Bridge, DeploymentNotice, LightCommand, MqttSink, ThermostatCommand};
pub use router::{Dispatch, Router};

#[cfg(test)]
pub(crate) mod recording;
