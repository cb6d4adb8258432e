use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Number, Value, json};

use super::AppState;
use crate::utils::error::ApiError;

pub const MIN_TARGET_TEMP: f64 = 50.0;
pub const MAX_TARGET_TEMP: f64 = 90.0;
pub const MODES: [&str; 4] = ["heat", "cool", "auto", "off"];

#[derive(Debug, Deserialize)]
pub struct ThermostatUpdate {
    pub target_temp: Option<Value>,
    pub mode: Option<Value>,
}

pub async fn command(
    State(state): State<AppState>,
    Json(body): Json<ThermostatUpdate>,
) -> Result<Json<Value>, ApiError> {
    let target_temp = match body.target_temp {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) if in_range(&n) => Some(n),
        Some(_) => {
            return Err(ApiError::BadRequest(
                "Temperature must be between 50 and 90°F".into(),
            ));
        }
    };

    let mode = match body.mode {
        None | Some(Value::Null) => None,
        Some(Value::String(m)) if MODES.contains(&m.as_str()) => Some(m),
        Some(_) => return Err(ApiError::BadRequest("Invalid mode".into())),
    };

    if target_temp.is_none() && mode.is_none() {
        return Err(ApiError::BadRequest("No valid fields to update".into()));
    }

    let success = state
        .bridge
        .publish_thermostat_command(target_temp.clone(), mode.as_deref());
    Ok(Json(json!({
        "success": success,
        "target_temp": target_temp,
        "mode": mode,
    })))
}

fn in_range(n: &Number) -> bool {
    n.as_f64()
        .is_some_and(|t| (MIN_TARGET_TEMP..=MAX_TARGET_TEMP).contains(&t))
}
