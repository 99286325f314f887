//! Image upload endpoint.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{media_url, parse_slug};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;
use wisp_core::evaluate_expiry;
use wisp_metadata::repos::WishRepo;
use wisp_storage::{MediaStore, wish_media_prefix};

/// Image upload response.
#[derive(Debug, Serialize)]
pub struct UploadImageResponse {
    pub url: String,
}

/// Map an image content type to the stored file extension.
fn extension_for(content_type: Option<&str>) -> Option<&'static str> {
    match content_type? {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// POST /api/wishes/{slug}/images - Attach an image to a live wish.
///
/// Multipart with a single `file` field. Uploads to tombstoned or expired
/// wishes are refused; the expiry check here is evaluation-only and leaves
/// tombstoning to the view path and the sweep.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadImageResponse>)> {
    let slug = parse_slug(&slug)?;
    let now = OffsetDateTime::now_utc();

    let wish = state
        .metadata
        .get_wish(slug.as_str())
        .await?
        .ok_or_else(|| ApiError::NotFound(slug.as_str().to_string()))?;
    if wish.is_deleted {
        return Err(ApiError::Gone { cause: None });
    }
    if let Some(cause) = evaluate_expiry(wish.expires_at, wish.max_views, wish.current_views, now)
    {
        return Err(ApiError::Gone { cause: Some(cause) });
    }

    let limits = &state.config.limits;
    let existing = state.metadata.images_for_wish(wish.wish_id).await?;
    if existing.len() >= limits.max_images_per_wish as usize {
        return Err(ApiError::BadRequest(format!(
            "wish already has the maximum of {} images",
            limits.max_images_per_wish
        )));
    }

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let Some(extension) = extension_for(content_type.as_deref()) else {
            return Err(ApiError::BadRequest(
                "unsupported image type (png, jpeg, webp, gif)".to_string(),
            ));
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("empty upload".to_string()));
        }
        if data.len() > limits.max_image_bytes {
            return Err(ApiError::BadRequest(format!(
                "image too large: {} bytes (max {})",
                data.len(),
                limits.max_image_bytes
            )));
        }

        let key = format!(
            "{}/{}.{extension}",
            wish_media_prefix(wish.wish_id),
            Uuid::new_v4()
        );
        state.storage.put(&key, data).await?;

        // The blob is in place; if the record fails, take the blob back out
        // rather than leaving an orphan from day one.
        let image = match state.metadata.add_image(wish.wish_id, &key, now).await {
            Ok(image) => image,
            Err(e) => {
                let _ = state.storage.delete(&key).await;
                return Err(e.into());
            }
        };

        tracing::info!(
            slug = %slug,
            image_id = image.image_id,
            key = %key,
            "Image uploaded"
        );
        return Ok((
            StatusCode::CREATED,
            Json(UploadImageResponse {
                url: media_url(&state, &key),
            }),
        ));
    }

    Err(ApiError::BadRequest(
        "multipart field 'file' is required".to_string(),
    ))
}
