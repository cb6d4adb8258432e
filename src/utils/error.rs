//! Error types shared across `rvdash`.
//!
//! Each layer owns one enum: configuration, the document store, the MQTT
//! bridge and the HTTP API. `ApiError` is the only one that reaches a client;
//! it renders as `{"error": "..."}` with a matching status code.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error("invalid broker url '{url}': {reason}")]
    BrokerUrl { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("document encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt document: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("broker client rejected request: {0}")]
    Rejected(String),

    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<rumqttc::ClientError> for BridgeError {
    fn from(err: rumqttc::ClientError) -> Self {
        BridgeError::Rejected(err.to_string())
    }
}

impl From<rustls::Error> for BridgeError {
    fn from(err: rustls::Error) -> Self {
        BridgeError::Tls(err.to_string())
    }
}

/// Anything that stops `rvdash server` from coming up.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("password hashing failed: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("requested range not satisfiable")]
    RangeNotSatisfiable { size: u64 },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "document store failure");
        ApiError::Internal("Storage failure".to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!(error = %err, "file system failure");
        ApiError::Internal("File system failure".to_string())
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!(error = %err, "password hashing failure");
        ApiError::Internal("Password hashing failure".to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::RangeNotSatisfiable { size } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{size}"))],
            )
                .into_response(),
            other => {
                let status = other.status();
                (status, Json(json!({ "error": other.to_string() }))).into_response()
            }
        }
    }
}
