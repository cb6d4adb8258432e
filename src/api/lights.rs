use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use crate::persistence::LIGHTS;
use crate::utils::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LightUpdate {
    pub state: Option<Value>,
    pub brightness: Option<Value>,
}

/// Light metadata ordered by id. Live on/off state only exists on `/ws`.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Value>>, ApiError> {
    let mut lights = state.store.collection(LIGHTS)?.find_all()?;
    lights.sort_by_key(|doc| doc.get("_id").and_then(Value::as_u64).unwrap_or(u64::MAX));
    Ok(Json(lights.into_iter().map(Value::Object).collect()))
}

/// Send a light command. The response only says whether the command went
/// out; the new state comes back through `/ws`.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(body): Json<LightUpdate>,
) -> Result<Json<Value>, ApiError> {
    if state.store.collection(LIGHTS)?.find_one(&id.to_string())?.is_none() {
        return Err(ApiError::NotFound("Light not found".into()));
    }

    let light_state = match body.state.as_ref().and_then(Value::as_str) {
        Some(s @ ("on" | "off")) => s,
        _ => return Err(ApiError::BadRequest("State must be 'on' or 'off'".into())),
    };

    let brightness = match &body.brightness {
        None | Some(Value::Null) => None,
        Some(value) => match value.as_u64() {
            Some(b) if b <= 100 => Some(b as u8),
            _ => {
                return Err(ApiError::BadRequest(
                    "Brightness must be between 0 and 100".into(),
                ));
            }
        },
    };

    let success = state
        .bridge
        .publish_light_command(id, light_state, brightness);
    Ok(Json(json!({
        "success": success,
        "id": id,
        "state": light_state,
        "brightness": brightness,
    })))
}
