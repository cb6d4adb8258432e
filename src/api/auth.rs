//! Login sessions
//!
//! A login issues a signed JWT whose `sid` claim names a row in the
//! `sessions` collection. A request is authenticated only while the token
//! verifies, the session row exists and has not expired, and its user still
//! exists; logout deletes the row, which revokes the token early.
//!
//! Passwords are stored as bcrypt hashes (`$2b$10$...`).

use axum::Json;
use axum::extract::{Request, State};
use axum::http::header::{ACCEPT, AUTHORIZATION, LOCATION};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use super::AppState;
use crate::persistence::{Document, SESSIONS, Store, USERS, timestamp};
use crate::utils::error::{ApiError, ServerError, StoreError};

pub const ADMIN_USERNAME: &str = "admin";
pub const MIN_PASSWORD_LEN: usize = 6;
#[cfg(not(test))]
const HASH_COST: u32 = 10;
// bcrypt's minimum; keeps unit tests quick
#[cfg(test)]
const HASH_COST: u32 = 4;
const LOGIN_REDIRECT: &str = "/#login";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub sid: String,
    pub exp: usize,
}

/// The user a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

// --- passwords ---

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, HASH_COST)
}

/// Unknown or malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}

// --- users ---

/// Create the `admin` user on first start. Without a configured password no
/// user is created and every login fails until one is set.
pub fn ensure_admin(store: &Store, password: Option<&str>) -> Result<(), ServerError> {
    let users = store.collection(USERS)?;
    if users.find_one(ADMIN_USERNAME)?.is_some() {
        return Ok(());
    }

    let Some(password) = password.filter(|p| !p.is_empty()) else {
        warn!("ADMIN_PASSWORD is not set; no admin user created");
        return Ok(());
    };

    let user = json!({
        "_id": Uuid::new_v4().to_string(),
        "username": ADMIN_USERNAME,
        "password_hash": hash_password(password)?,
        "display_name": "Administrator",
        "created_at": timestamp(),
    });
    if let Value::Object(doc) = user {
        users.insert_one(ADMIN_USERNAME, &doc)?;
    }
    info!("Default admin user created");
    Ok(())
}

fn auth_user(doc: &Document) -> AuthUser {
    let field = |name: &str| {
        doc.get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    AuthUser {
        id: field("_id"),
        username: field("username"),
        display_name: field("display_name"),
    }
}

// --- tokens and sessions ---

fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time(doc: &Document, field: &str) -> Option<DateTime<Utc>> {
    let raw = doc.get(field)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn decode_claims(secret: &str, token: &str, validate_exp: bool) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = validate_exp;
    if !validate_exp {
        validation.required_spec_claims.clear();
    }
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()
    .map(|data| data.claims)
}

/// Fails when `hours` is not positive or overflows a timestamp.
pub fn session_expiry(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>, ApiError> {
    TimeDelta::try_hours(hours)
        .filter(|lifetime| *lifetime > TimeDelta::zero())
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| ApiError::Internal(format!("Invalid session lifetime: {hours}h")))
}

/// Resolve the bearer token on `headers` to a live session and its user.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<(AuthUser, Session), ApiError> {
    let token =
        bearer_token(headers).ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;
    let invalid = || ApiError::Unauthorized("Invalid or expired session".into());

    let claims = decode_claims(&state.settings.server.jwt_secret, token, true).ok_or_else(invalid)?;

    let sessions = state.store.collection(SESSIONS)?;
    let row = sessions.find_one(&claims.sid)?.ok_or_else(invalid)?;
    let expires_at = parse_time(&row, "expires_at").ok_or_else(invalid)?;
    if expires_at <= Utc::now() {
        return Err(invalid());
    }

    let user = state
        .store
        .collection(USERS)?
        .find_one(&claims.sub)?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    Ok((
        auth_user(&user),
        Session {
            id: claims.sid,
            expires_at,
        },
    ))
}

/// Delete this user's sessions that have already expired.
fn prune_expired(store: &Store, username: &str) -> Result<usize, StoreError> {
    let sessions = store.collection(SESSIONS)?;
    let now = Utc::now();
    let mut pruned = 0;
    for row in sessions.find_all()? {
        let owned = row.get("username").and_then(Value::as_str) == Some(username);
        let expired = parse_time(&row, "expires_at").is_none_or(|at| at < now);
        if owned && expired {
            if let Some(id) = row.get("_id").and_then(Value::as_str) {
                if sessions.delete_one(id)? {
                    pruned += 1;
                }
            }
        }
    }
    Ok(pruned)
}

// --- middleware ---

/// Plain page loads get sent to the login screen instead of a JSON 401.
fn is_browser_navigation(headers: &HeaderMap) -> bool {
    let accepts_html = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/html"));
    let xhr = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));
    accepts_html && !xhr
}

pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match authenticate(&state, req.headers()) {
        Ok((user, _)) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(ApiError::Unauthorized(_)) if is_browser_navigation(req.headers()) => {
            (StatusCode::FOUND, [(LOCATION, LOGIN_REDIRECT)]).into_response()
        }
        Err(e) => e.into_response(),
    }
}

// --- handlers ---

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let (Some(username), Some(password)) = (
        body.username.filter(|u| !u.is_empty()),
        body.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Username and password are required".into(),
        ));
    };

    let invalid = || ApiError::Unauthorized("Invalid credentials".into());
    let user = state
        .store
        .collection(USERS)?
        .find_one(&username)?
        .ok_or_else(invalid)?;
    let hash = user
        .get("password_hash")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !verify_password(&password, hash) {
        warn!(username = %username, "Failed login");
        return Err(invalid());
    }

    let session_id = Uuid::new_v4().to_string();
    let expires_at = session_expiry(Utc::now(), state.settings.server.session_hours)?;
    let claims = Claims {
        sub: username.clone(),
        sid: session_id.clone(),
        exp: expires_at.timestamp().max(0) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.settings.server.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Login failed: {e}")))?;

    let session = json!({
        "_id": session_id,
        "user_id": user.get("_id").cloned().unwrap_or(Value::Null),
        "username": username,
        "expires_at": format_time(expires_at),
        "created_at": timestamp(),
    });
    if let Value::Object(doc) = session {
        state.store.collection(SESSIONS)?.insert_one(&session_id, &doc)?;
    }
    prune_expired(&state.store, &username)?;

    info!(username = %username, "User logged in");
    Ok(Json(json!({
        "token": token,
        "user": auth_user(&user),
        "expires_at": format_time(expires_at),
    })))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    // expired tokens still name a row worth deleting
    if let Some(claims) = bearer_token(&headers)
        .and_then(|token| decode_claims(&state.settings.server.jwt_secret, token, false))
    {
        state.store.collection(SESSIONS)?.delete_one(&claims.sid)?;
    }
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

pub async fn check(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match authenticate(&state, &headers) {
        Ok((user, session)) => Json(json!({
            "authenticated": true,
            "user": user,
            "expires_at": format_time(session.expires_at),
        }))
        .into_response(),
        Err(ApiError::Unauthorized(_)) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "authenticated": false })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let (user, _) = authenticate(&state, &headers)?;

    let (Some(current), Some(new)) = (
        body.current_password.filter(|p| !p.is_empty()),
        body.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Current password and new password are required".into(),
        ));
    };
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "New password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let users = state.store.collection(USERS)?;
    let stored = users
        .find_one(&user.username)?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    let hash = stored
        .get("password_hash")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !verify_password(&current, hash) {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".into(),
        ));
    }

    let mut fields = Document::new();
    fields.insert("password_hash".into(), json!(hash_password(&new)?));
    users.update_set(&user.username, fields)?;

    info!(username = %user.username, "Password changed");
    Ok(Json(json!({ "message": "Password changed successfully" })))
}
