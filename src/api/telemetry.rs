use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use super::AppState;
use crate::persistence::{AIR_QUALITY, ENERGY, MAIN_ID, THERMOSTAT, TRAILER_LEVEL, WATER};
use crate::utils::error::ApiError;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "mqtt_connected": state.bridge.is_connected(),
    }))
}

pub async fn level(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    main_document(&state, TRAILER_LEVEL, "Trailer level not found")
}

pub async fn water(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    main_document(&state, WATER, "Water tanks not found")
}

fn main_document(state: &AppState, collection: &str, missing: &str) -> Result<Json<Value>, ApiError> {
    state
        .store
        .collection(collection)?
        .find_one(MAIN_ID)?
        .map(|doc| Json(Value::Object(doc)))
        .ok_or_else(|| ApiError::NotFound(missing.to_string()))
}

pub async fn thermostat(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    snapshot(&state, THERMOSTAT)
}

pub async fn energy(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    snapshot(&state, ENERGY)
}

pub async fn air_quality(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    snapshot(&state, AIR_QUALITY)
}

/// The `main` row, or `null` when it was never written.
fn snapshot(state: &AppState, collection: &str) -> Result<Json<Value>, ApiError> {
    let doc = state.store.collection(collection)?.find_one(MAIN_ID)?;
    Ok(Json(doc.map(Value::Object).unwrap_or(Value::Null)))
}
