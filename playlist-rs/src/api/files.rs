//! API endpoints for the caller's audio files and credential-based downloads

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::auth::Claims;
use crate::api::handlers::{ApiResult, AppState, RequestResult};
use crate::error::PlaylistError;
use crate::security::AccessCredential;
use crate::storage::{file_pages, FileShareStore, StorageEntry, StorageNamespace};
use crate::usage::types::BYTES_PER_MEGABYTE;

/// Stored upload
#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub name: String,
    pub size_in_bytes: u64,
}

/// GET /api/files - List the caller's audio directory
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    claims: Claims,
) -> ApiResult<Vec<StorageEntry>> {
    let user = state.current_user(&claims).await?;
    let namespace = &user.file_folder;
    let directory = state.audio_directory.as_str();

    let store: &dyn FileShareStore = state.storage.as_ref();
    if !store.share_exists(namespace).await? || !store.directory_exists(namespace, directory).await? {
        return Ok(RequestResult::success(Vec::new()));
    }

    let entries: Vec<StorageEntry> = file_pages(store, namespace, directory)
        .try_concat()
        .await?;

    Ok(RequestResult::success(entries))
}

/// PUT /api/files/:name - Upload an audio file, subject to the storage quota
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let user = match state.current_user(&claims).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    let report = state.reporter.compute_usage(&user.file_folder).await;
    let usage = report.summary();
    let quota_bytes = usage.quota_megabytes() * BYTES_PER_MEGABYTE;
    if usage.total_bytes.saturating_add(body.len() as u64) > quota_bytes {
        warn!(
            "Upload of {} by {} rejected: {} of {} bytes used",
            name, user.username, usage.total_bytes, quota_bytes
        );
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            RequestResult::failed("Storage quota exceeded."),
        )
            .into_response();
    }

    match state
        .storage
        .store_file(&user.file_folder, &state.audio_directory, &name, &body)
        .await
    {
        Ok(size_in_bytes) => {
            info!("User {} uploaded {} ({} bytes)", user.username, name, size_in_bytes);
            (
                StatusCode::CREATED,
                RequestResult::success(UploadedFile {
                    name,
                    size_in_bytes,
                }),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// DELETE /api/files/:name - Remove an audio file.
///
/// `data` is `false` when the caller's share or audio directory is missing.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    claims: Claims,
    Path(name): Path<String>,
) -> ApiResult<bool> {
    let user = state.current_user(&claims).await?;
    let removed = state
        .storage
        .remove_file(&user.file_folder, &state.audio_directory, &name)
        .await?;

    Ok(RequestResult::success(removed))
}

/// GET /files/:namespace/*name - Read a blob with an access credential
pub async fn download_blob(
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
    Query(credential): Query<AccessCredential>,
) -> Response {
    let namespace = match StorageNamespace::new(namespace) {
        Ok(namespace) => namespace,
        Err(e) => return e.into_response(),
    };

    if let Err(e) = state.access.verify(&namespace, &credential) {
        warn!("Rejected blob download from {}: {}", namespace, e);
        return (StatusCode::FORBIDDEN, RequestResult::failed("Access denied.")).into_response();
    }

    match state.storage.read_blob(&namespace, &name).await {
        Ok(data) => ([(header::CONTENT_TYPE, content_type(&name))], data).into_response(),
        Err(PlaylistError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, RequestResult::failed("File not found.")).into_response()
        }
        Err(e) => e.into_response(),
    }
}

fn content_type(name: &str) -> &'static str {
    let extension = name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match extension.as_str() {
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        _ => "application/octet-stream",
    }
}
