//! Inbound dispatch
//!
//! Every message the broker delivers goes through [`Router::dispatch`]:
//! parse the JSON payload, split the topic, look the (domain, message type)
//! pair up in the route table, project the whitelisted fields and hand the
//! result to the hub. Nothing here touches the document store.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::hub::Hub;
use crate::topics::{IdSource, Projection, Route, TopicPath, find_route};

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Sent to the hub on `channel`; `delivered` clients got the frame.
    Broadcast {
        channel: &'static str,
        delivered: usize,
    },
    /// Topic outside the namespace or without a route.
    Ignored,
    /// Payload was not JSON.
    Malformed,
}

#[derive(Debug, Clone)]
pub struct Router {
    hub: Arc<Hub>,
}

impl Router {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> Dispatch {
        let payload: Value = match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(topic, error = %e, "Dropping MQTT message with malformed payload");
                return Dispatch::Malformed;
            }
        };

        let Some((route, data)) = resolve(topic, payload) else {
            debug!(topic, "Ignoring unroutable message");
            return Dispatch::Ignored;
        };

        debug!(topic, channel = route.channel, "Received {}", route.channel);
        let delivered = self.hub.broadcast(route.channel, data);
        Dispatch::Broadcast {
            channel: route.channel,
            delivered,
        }
    }
}

/// Find the route for `topic` and build its broadcast data from `payload`.
pub fn resolve(topic: &str, payload: Value) -> Option<(&'static Route, Value)> {
    let path = TopicPath::parse(topic)?;
    let route = find_route(path.domain, path.message_type)?;

    let id = match route.id {
        IdSource::None => None,
        IdSource::Numeric => Some(path.id?.parse::<u32>().ok()?),
    };
    if payload.is_null() && matches!(route.projection, Projection::Fields(_)) {
        return None;
    }

    Some((route, project(route.projection, id, payload)))
}

fn project(projection: Projection, id: Option<u32>, payload: Value) -> Value {
    let fields = match projection {
        Projection::Passthrough => return payload,
        Projection::Fields(fields) => fields,
    };

    let mut data = Map::new();
    if let Some(id) = id {
        data.insert("id".to_string(), Value::from(id));
        data.insert("_id".to_string(), Value::from(id));
    }
    // absent stays absent: no defaults
    if let Value::Object(mut source) = payload {
        for field in fields {
            if let Some(value) = source.remove(*field) {
                data.insert((*field).to_string(), value);
            }
        }
    }
    Value::Object(data)
}
