//! Broadcast envelope
//!
//! Every frame on `/ws` is `{"type": <channel>, "data": <object>,
//! "timestamp": <ISO 8601>}`. The envelope is serialized once per broadcast
//! and the resulting `Frame` is shared by all connections.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One serialized envelope.
pub type Frame = Arc<str>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub channel: String,
    pub data: Value,
    pub timestamp: String,
}

impl Envelope {
    /// Stamp `data` with the current UTC time, millisecond precision.
    pub fn now(channel: &str, data: Value) -> Self {
        Self {
            channel: channel.to_string(),
            data,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::from)
    }
}
