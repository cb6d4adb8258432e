use axum::Json;
use axum::extract::State;
use serde_json::{Map, Value, json};
use tracing::info;

use super::AppState;
use crate::persistence::{Document, MAIN_ID, SETTINGS, timestamp};
use crate::utils::error::ApiError;

pub const THEMES: [&str; 2] = ["dark", "light"];
pub const CLOCK_FORMATS: [&str; 2] = ["12h", "24h"];
pub const AVAILABLE_TIMEZONES: [&str; 8] = [
    "America/New_York",
    "America/Chicago",
    "America/Denver",
    "America/Phoenix",
    "America/Los_Angeles",
    "America/Anchorage",
    "Pacific/Honolulu",
    "UTC",
];

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let mut doc = state
        .store
        .collection(SETTINGS)?
        .find_one(MAIN_ID)?
        .ok_or_else(|| ApiError::NotFound("Settings not found".into()))?;
    doc.insert("available_timezones".into(), json!(AVAILABLE_TIMEZONES));
    Ok(Json(Value::Object(doc)))
}

/// Apply any of `theme`, `timezone` and `clock_format`. Unknown keys are
/// ignored; one invalid value rejects the whole update.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let mut fields = Document::new();
    let allowed: [(&str, &[&str]); 3] = [
        ("theme", &THEMES),
        ("timezone", &AVAILABLE_TIMEZONES),
        ("clock_format", &CLOCK_FORMATS),
    ];

    for (key, values) in allowed {
        let Some(value) = body.get(key) else {
            continue;
        };
        match value.as_str() {
            Some(v) if values.contains(&v) => {
                fields.insert(key.to_string(), json!(v));
            }
            _ => return Err(ApiError::BadRequest(format!("Invalid {key}"))),
        }
    }

    if fields.is_empty() {
        return Err(ApiError::BadRequest("No valid fields to update".into()));
    }
    fields.insert("updated_at".into(), json!(timestamp()));

    let doc = state
        .store
        .collection(SETTINGS)?
        .update_set(MAIN_ID, fields)?
        .ok_or_else(|| ApiError::NotFound("Settings not found".into()))?;
    info!("Settings updated");
    Ok(Json(Value::Object(doc)))
}
