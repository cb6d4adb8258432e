use serde_json::json;
use tracing::info;

use super::{Document, LIGHTS, MAIN_ID, SETTINGS, Store, TRAILER_LEVEL, WATER, timestamp};
use crate::utils::error::StoreError;

pub const LIGHT_NAMES: [&str; 8] = [
    "Living Room",
    "Kitchen",
    "Bedroom",
    "Bathroom",
    "Exterior",
    "Awning",
    "Porch",
    "Storage",
];

/// Create the rows the dashboard expects when they are missing. Existing
/// rows are never touched.
pub fn seed(store: &Store) -> Result<(), StoreError> {
    let lights = store.collection(LIGHTS)?;
    if lights.is_empty() {
        for (index, name) in LIGHT_NAMES.iter().enumerate() {
            let id = index + 1;
            lights.insert_one(
                &id.to_string(),
                &object(json!({ "_id": id, "name": name, "updated_at": timestamp() })),
            )?;
        }
        info!("Seeded lights");
    }

    seed_main(
        store,
        TRAILER_LEVEL,
        json!({ "front_back": 0.0, "side_to_side": 0.0 }),
    )?;
    seed_main(
        store,
        SETTINGS,
        json!({ "theme": "dark", "timezone": "America/New_York", "clock_format": "12h" }),
    )?;
    seed_main(
        store,
        WATER,
        json!({ "fresh": 75.0, "grey": 30.0, "black": 15.0 }),
    )?;

    info!("Database seeding complete");
    Ok(())
}

fn seed_main(store: &Store, name: &str, fields: serde_json::Value) -> Result<(), StoreError> {
    let collection = store.collection(name)?;
    if collection.find_one(MAIN_ID)?.is_some() {
        return Ok(());
    }

    let mut doc = object(json!({ "_id": MAIN_ID }));
    doc.extend(object(fields));
    doc.insert("updated_at".to_string(), json!(timestamp()));
    collection.insert_one(MAIN_ID, &doc)?;
    info!(collection = name, "Seeded document");
    Ok(())
}

fn object(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Document::new(),
    }
}
