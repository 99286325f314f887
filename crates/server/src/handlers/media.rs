//! Media serving endpoint.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use wisp_storage::{MediaStore, StorageError};

/// Content type for a stored media key, by extension.
fn content_type_for(key: &str) -> &'static str {
    match key.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// GET /media/{*path} - Serve a stored blob.
pub async fn get_media(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    match state.storage.get(&path).await {
        Ok(data) => Ok(([(CONTENT_TYPE, content_type_for(&path))], data).into_response()),
        // Bad keys answer like misses so probing reveals nothing about the
        // storage layout.
        Err(StorageError::NotFound(_)) | Err(StorageError::InvalidKey(_)) => {
            tracing::debug!(path = %path, "Media object not found");
            Err(ApiError::NotFound("media object".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
