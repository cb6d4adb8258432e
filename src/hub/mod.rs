//! hub
//!
//! The broadcast hub: the live set of `/ws` connections and the fan-out of
//! `{type, data, timestamp}` envelopes to all of them. The bridge and the
//! tickers are its producers; the transport registers its consumers.

pub mod client;
pub mod engine;
pub mod envelope;

pub use client::{Client, ClientId};
pub use engine::Hub;
pub use envelope::{Envelope, Frame};
