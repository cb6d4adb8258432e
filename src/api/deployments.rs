//! Firmware deployments
//!
//! Uploaded packages are streamed to `storage.deployment_dir` while being
//! hashed, recorded in the `deployments` collection and announced on the
//! retained `rv/deployment/available` topic. Devices download them through
//! the range-capable download route.

use std::io::SeekFrom;
use std::path::{Path as FsPath, PathBuf};

use axum::Json;
use axum::body::Body;
use axum::extract::{Extension, Multipart, Path, State};
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, RANGE,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::AppState;
use super::auth::AuthUser;
use crate::bridge::DeploymentNotice;
use crate::persistence::{DEPLOYMENTS, timestamp};
use crate::utils::error::ApiError;

pub const DOWNLOAD_PREFIX: &str = "/api/deployment-download";
const UNKNOWN: &str = "unknown";

/// One stored deployment row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    #[serde(rename = "_id")]
    pub id: String,
    pub version: String,
    /// Name on disk inside the deployment directory.
    pub filename: String,
    /// Name the file was uploaded with.
    pub original_name: String,
    pub size: u64,
    pub sha256: String,
    pub uploaded_by: String,
    pub uploaded_at: String,
}

impl Deployment {
    pub fn download_url(&self) -> String {
        format!("{DOWNLOAD_PREFIX}/{}", self.id)
    }

    fn info(&self) -> Value {
        json!({
            "id": self.id,
            "version": self.version,
            "filename": self.original_name,
            "size": self.size,
            "sha256": self.sha256,
            "downloadUrl": self.download_url(),
            "uploadedAt": self.uploaded_at,
        })
    }

    fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "version": self.version,
            "filename": self.original_name,
            "size": self.size,
            "sha256": self.sha256,
            "uploadedBy": self.uploaded_by,
            "uploadedAt": self.uploaded_at,
        })
    }
}

/// Newest first.
fn all_deployments(state: &AppState) -> Result<Vec<Deployment>, ApiError> {
    let mut records = Vec::new();
    for doc in state.store.collection(DEPLOYMENTS)?.find_all()? {
        match serde_json::from_value::<Deployment>(Value::Object(doc)) {
            Ok(record) => records.push(record),
            Err(e) => warn!(error = %e, "Skipping unreadable deployment record"),
        }
    }
    records.sort_by(|a, b| {
        b.uploaded_at
            .cmp(&a.uploaded_at)
            .then_with(|| b.filename.cmp(&a.filename))
    });
    Ok(records)
}

fn find_deployment(state: &AppState, id: &str) -> Result<Deployment, ApiError> {
    state
        .store
        .collection(DEPLOYMENTS)?
        .find_as::<Deployment>(id)?
        .ok_or_else(|| ApiError::NotFound("Deployment not found".into()))
}

/// Last path component of a client supplied name; never empty.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => "upload.bin".to_string(),
        name => name.to_string(),
    }
}

// --- upload ---

struct StoredFile {
    path: PathBuf,
    saved_name: String,
    original_name: String,
    size: u64,
    sha256: String,
}

pub async fn upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let dir = state.deployment_dir();
    fs::create_dir_all(&dir).await?;

    let mut version: Option<String> = None;
    let mut stored: Option<StoredFile> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                discard(stored.as_ref()).await;
                return Err(e.into());
            }
        };

        if field.name() == Some("version") {
            match field.text().await {
                Ok(text) => version = Some(text),
                Err(e) => {
                    discard(stored.as_ref()).await;
                    return Err(e.into());
                }
            }
            continue;
        }

        // only the first file part is kept
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if stored.is_some() {
            continue;
        }

        let original_name = sanitize_filename(&file_name);
        let saved_name = format!(
            "deployment-{}-{}",
            Utc::now().timestamp_millis(),
            original_name
        );
        let path = dir.join(&saved_name);

        match write_field(field, &path).await {
            Ok((size, sha256)) => {
                stored = Some(StoredFile {
                    path,
                    saved_name,
                    original_name,
                    size,
                    sha256,
                })
            }
            Err(e) => {
                let _ = fs::remove_file(&path).await;
                return Err(e);
            }
        }
    }

    let Some(file) = stored else {
        return Err(ApiError::BadRequest("No file uploaded".into()));
    };

    let record = Deployment {
        id: Uuid::new_v4().to_string(),
        version: version
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        filename: file.saved_name.clone(),
        original_name: file.original_name.clone(),
        size: file.size,
        sha256: file.sha256.clone(),
        uploaded_by: user.username,
        uploaded_at: timestamp(),
    };

    let doc = match serde_json::to_value(&record) {
        Ok(Value::Object(doc)) => doc,
        _ => {
            discard(Some(&file)).await;
            return Err(ApiError::Internal("Failed to save deployment".into()));
        }
    };
    if let Err(e) = state
        .store
        .collection(DEPLOYMENTS)
        .and_then(|c| c.insert_one(&record.id, &doc))
    {
        discard(Some(&file)).await;
        return Err(e.into());
    }

    info!(
        id = %record.id,
        version = %record.version,
        size = record.size,
        "Deployment uploaded"
    );

    let notice = DeploymentNotice {
        id: record.id.clone(),
        version: record.version.clone(),
        filename: record.original_name.clone(),
        size: record.size,
        sha256: record.sha256.clone(),
        download_url: record.download_url(),
        timestamp: record.uploaded_at.clone(),
    };
    if !state.bridge.publish_deployment_available(&notice) {
        warn!(id = %record.id, "Deployment stored but not announced over MQTT");
    }

    Ok(Json(record.info()))
}

/// Stream one multipart field to `path`, returning its size and SHA-256.
async fn write_field(
    mut field: axum::extract::multipart::Field<'_>,
    path: &FsPath,
) -> Result<(u64, String), ApiError> {
    let mut out = File::create(path).await?;
    let mut hasher = Sha256::new();
    let mut size = 0u64;

    while let Some(chunk) = field.chunk().await? {
        hasher.update(&chunk);
        size += chunk.len() as u64;
        out.write_all(&chunk).await?;
    }
    out.flush().await?;

    Ok((size, hex::encode(hasher.finalize())))
}

async fn discard(file: Option<&StoredFile>) {
    if let Some(file) = file {
        if let Err(e) = fs::remove_file(&file.path).await {
            error!(path = %file.path.display(), error = %e, "Failed to remove partial upload");
        }
    }
}

// --- listing ---

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Value>>, ApiError> {
    Ok(Json(
        all_deployments(&state)?
            .iter()
            .map(Deployment::summary)
            .collect(),
    ))
}

pub async fn latest_info(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    all_deployments(&state)?
        .first()
        .map(|record| Json(record.info()))
        .ok_or_else(|| ApiError::NotFound("No deployments available".into()))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = find_deployment(&state, &id)?;

    let path = state.deployment_dir().join(&record.filename);
    match fs::remove_file(&path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => error!(path = %path.display(), error = %e, "Failed to delete deployment file"),
    }

    state.store.collection(DEPLOYMENTS)?.delete_one(&id)?;
    info!(id = %id, "Deployment deleted");
    Ok(Json(json!({ "message": "Deployment deleted" })))
}

// --- download ---

/// Parse `bytes=start-[end]` against a file of `size` bytes. `None` means
/// serve the whole file; `Some(Err)` means the start lies past the end.
pub fn parse_range(header: &str, size: u64) -> Option<Result<(u64, u64), ()>> {
    let spec = header.trim().strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let start: u64 = start.trim().parse().ok()?;

    if start >= size {
        return Some(Err(()));
    }

    let last = size - 1;
    let end = match end.trim() {
        "" => last,
        raw => raw.parse::<u64>().ok()?.min(last),
    };
    if end < start {
        return None;
    }
    Some(Ok((start, end)))
}

pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let record = find_deployment(&state, &id)?;
    let path = state.deployment_dir().join(&record.filename);

    let mut file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("File not found on disk".into()));
        }
        Err(e) => return Err(e.into()),
    };
    let size = file.metadata().await?.len();

    let range = headers
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_range(v, size));

    let mut response_headers = HeaderMap::new();
    response_headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    for (name, value) in [
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", record.original_name),
        ),
        (ETAG, format!("\"{}\"", record.sha256)),
    ] {
        if let Ok(value) = HeaderValue::from_str(&value) {
            response_headers.insert(name, value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(&record.sha256) {
        response_headers.insert("x-checksum-sha256", value);
    }

    match range {
        Some(Err(())) => Err(ApiError::RangeNotSatisfiable { size }),
        Some(Ok((start, end))) => {
            let len = end - start + 1;
            file.seek(SeekFrom::Start(start)).await?;
            response_headers.insert(
                CONTENT_RANGE,
                HeaderValue::from_str(&format!("bytes {start}-{end}/{size}"))
                    .map_err(|e| ApiError::Internal(e.to_string()))?,
            );
            response_headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
            let body = Body::from_stream(ReaderStream::new(file.take(len)));
            Ok((StatusCode::PARTIAL_CONTENT, response_headers, body).into_response())
        }
        None => {
            response_headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
            let body = Body::from_stream(ReaderStream::new(file));
            Ok((StatusCode::OK, response_headers, body).into_response())
        }
    }
}
