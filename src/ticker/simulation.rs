//! One cycle of each simulated document.
//!
//! A step reads the stored document, nudges its numeric fields by a bounded
//! random amount, writes the new values back and broadcasts the merged
//! document. The random source is a parameter so cycles are reproducible.

use rand::Rng;
use serde_json::{Value, json};
use tracing::debug;

use crate::hub::Hub;
use crate::persistence::{Collection, Document, MAIN_ID, timestamp};
use crate::utils::error::StoreError;

pub const LEVEL_CHANNEL: &str = "level";
pub const WATER_CHANNEL: &str = "water";

pub const LEVEL_BOUNDS: (f64, f64) = (-15.0, 15.0);
pub const WATER_BOUNDS: (f64, f64) = (0.0, 100.0);

/// Result of a single cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// No connections; nothing read or written.
    Idle,
    /// The document does not exist.
    Missing,
    /// Written and broadcast to `delivered` clients.
    Updated { doc: Document, delivered: usize },
}

pub fn step_level<R: Rng>(
    collection: &Collection,
    hub: &Hub,
    rng: &mut R,
) -> Result<Step, StoreError> {
    step(collection, hub, LEVEL_CHANNEL, |doc| {
        let (lo, hi) = LEVEL_BOUNDS;
        let front_back = read(doc, "front_back") + rng.gen_range(-0.1..0.1);
        let side_to_side = read(doc, "side_to_side") + rng.gen_range(-0.1..0.1);
        [
            ("front_back", round1(front_back.clamp(lo, hi))),
            ("side_to_side", round1(side_to_side.clamp(lo, hi))),
        ]
        .into_iter()
        .collect()
    })
}

pub fn step_water<R: Rng>(
    collection: &Collection,
    hub: &Hub,
    rng: &mut R,
) -> Result<Step, StoreError> {
    step(collection, hub, WATER_CHANNEL, |doc| {
        let (lo, hi) = WATER_BOUNDS;
        let fresh = read(doc, "fresh") - rng.gen_range(0.0..0.3);
        let grey = read(doc, "grey") + rng.gen_range(0.0..0.2);
        let black = read(doc, "black") + rng.gen_range(0.0..0.05);
        [
            ("fresh", round1(fresh.clamp(lo, hi))),
            ("grey", round1(grey.clamp(lo, hi))),
            ("black", round1(black.clamp(lo, hi))),
        ]
        .into_iter()
        .collect()
    })
}

fn step<F>(collection: &Collection, hub: &Hub, channel: &str, perturb: F) -> Result<Step, StoreError>
where
    F: FnOnce(&Document) -> Vec<(&'static str, f64)>,
{
    if hub.is_empty() {
        return Ok(Step::Idle);
    }

    let Some(current) = collection.find_one(MAIN_ID)? else {
        debug!(collection = collection.name(), "no document to simulate");
        return Ok(Step::Missing);
    };

    let mut fields = Document::new();
    for (name, value) in perturb(&current) {
        fields.insert(name.to_string(), json!(value));
    }
    fields.insert("updated_at".to_string(), json!(timestamp()));

    // last writer wins against concurrent REST reads
    let merged = match collection.update_set(MAIN_ID, fields)? {
        Some(doc) => doc,
        None => return Ok(Step::Missing),
    };

    let delivered = hub.broadcast(channel, Value::Object(merged.clone()));
    Ok(Step::Updated {
        doc: merged,
        delivered,
    })
}

/// Numeric field value; anything else counts as zero.
fn read(doc: &Document, field: &str) -> f64 {
    doc.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
