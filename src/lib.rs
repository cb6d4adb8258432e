//! # rvdash
//!
//! `rvdash` is the backend of an RV telemetry dashboard. It bridges a fixed
//! MQTT topic namespace to browser WebSocket connections, simulates the
//! trailer level and water tank feeds, and serves the REST API the dashboard
//! uses for settings, device commands and firmware deployments.
//!
//! ## Core Modules
//!
//! - `api`: REST handlers, session authentication and the HTTP router.
//! - `bridge`: the MQTT connection, inbound routing and outbound commands.
//! - `config`: Handles loading and managing server configuration.
//! - `hub`: the set of WebSocket connections and the broadcast envelope.
//! - `persistence`: a small JSON document store on top of `sled`.
//! - `server`: wires everything together for `rvdash server`.
//! - `ticker`: the periodic level and water simulations.
//! - `topics`: topic names and the topic → broadcast channel table.
//! - `transport`: the `/ws` endpoint.
//! - `utils`: Contains shared utilities, such as error handling and logging.

pub mod api;
pub mod bridge;
pub mod config;
pub mod hub;
pub mod persistence;
pub mod server;
pub mod ticker;
pub mod topics;
pub mod transport;
pub mod utils;
