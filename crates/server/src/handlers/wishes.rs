//! Wish lifecycle endpoints: create, view, delete, status.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{media_url, parse_slug, share_url};
use crate::ratelimit::ClientIp;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use time::OffsetDateTime;
use wisp_core::{ExpiryCause, NewWish, Slug, evaluate_expiry, remaining_views};
use wisp_metadata::MetadataError;
use wisp_metadata::models::NewWishRecord;
use wisp_metadata::repos::{ViewOutcome, WishRepo};

/// Attempts at a unique slug before giving up. Collisions are rare enough
/// that hitting this limit means the slug space is effectively full.
const MAX_SLUG_ATTEMPTS: u32 = 5;

/// Wish creation response.
#[derive(Debug, Serialize)]
pub struct CreateWishResponse {
    pub slug: String,
    pub public_url: String,
}

/// Wish view response.
#[derive(Debug, Serialize)]
pub struct ViewWishResponse {
    pub title: Option<String>,
    pub message: String,
    pub theme: String,
    pub images: Vec<String>,
    /// Views left after this one; absent when the wish has no view limit.
    pub remaining_views: Option<i64>,
}

/// Wish status response (read-only, no view accounting).
#[derive(Debug, Serialize)]
pub struct WishStatusResponse {
    pub exists: bool,
    /// "active", "expired", or "deleted".
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_cause: Option<ExpiryCause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_views: Option<i64>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_at: Option<OffsetDateTime>,
}

/// POST /api/wishes - Create a wish.
///
/// The `ClientIp` extension is set by the creation middleware on this route.
pub async fn create_wish(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    Json(new_wish): Json<NewWish>,
) -> ApiResult<(StatusCode, Json<CreateWishResponse>)> {
    new_wish.validate(&state.config.limits)?;

    let now = OffsetDateTime::now_utc();

    let mut attempts = 0;
    let wish = loop {
        attempts += 1;
        let record = NewWishRecord {
            slug: Slug::generate().as_str().to_string(),
            title: new_wish.title.clone(),
            message: new_wish.message.clone(),
            theme: new_wish.theme.clone(),
            expires_at: new_wish.expires_at,
            max_views: new_wish.max_views,
            ip_hash: hash_ip(&ip),
            created_at: now,
        };
        match state.metadata.create_wish(&record).await {
            Ok(wish) => break wish,
            Err(MetadataError::AlreadyExists(_)) if attempts < MAX_SLUG_ATTEMPTS => {
                tracing::debug!(attempt = attempts, "Slug collision, retrying");
            }
            Err(MetadataError::AlreadyExists(_)) => {
                return Err(ApiError::Internal(
                    "failed to generate a unique slug".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }
    };

    tracing::info!(slug = %wish.slug, wish_id = wish.wish_id, "Created wish");

    let public_url = share_url(&state, &wish.slug);
    Ok((
        StatusCode::CREATED,
        Json(CreateWishResponse {
            slug: wish.slug,
            public_url,
        }),
    ))
}

/// GET /api/wishes/{slug} - View a wish, counting the view.
pub async fn view_wish(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<ViewWishResponse>> {
    let slug = parse_slug(&slug)?;
    let outcome = state
        .metadata
        .record_view(slug.as_str(), OffsetDateTime::now_utc())
        .await?;

    match outcome {
        ViewOutcome::Missing => {
            tracing::debug!(slug = %slug, "Wish not found");
            Err(ApiError::NotFound(slug.as_str().to_string()))
        }
        ViewOutcome::Tombstoned => {
            tracing::debug!(slug = %slug, "Wish already gone");
            Err(ApiError::Gone { cause: None })
        }
        ViewOutcome::Expired(cause) => {
            tracing::info!(slug = %slug, cause = %cause, "Wish expired");
            Err(ApiError::Gone { cause: Some(cause) })
        }
        ViewOutcome::Viewed { wish, images } => {
            tracing::info!(slug = %wish.slug, views = wish.current_views, "Wish viewed");
            Ok(Json(ViewWishResponse {
                title: wish.title,
                message: wish.message,
                theme: wish.theme,
                images: images
                    .iter()
                    .map(|image| media_url(&state, &image.path))
                    .collect(),
                remaining_views: remaining_views(wish.max_views, wish.current_views),
            }))
        }
    }
}

/// DELETE /api/wishes/{slug} - Explicitly tombstone a wish.
///
/// Absent and already-tombstoned slugs both answer `not_found`; the response
/// never confirms that a tombstone exists.
pub async fn delete_wish(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    let slug = parse_slug(&slug)?;
    let transitioned = state
        .metadata
        .tombstone_wish(slug.as_str(), OffsetDateTime::now_utc())
        .await?;
    if transitioned {
        tracing::info!(slug = %slug, "Wish manually deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        tracing::debug!(slug = %slug, "Delete target not found");
        Err(ApiError::NotFound(slug.as_str().to_string()))
    }
}

/// GET /api/wishes/{slug}/status - Inspect a wish without counting a view.
pub async fn wish_status(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<WishStatusResponse>> {
    let slug = parse_slug(&slug)?;
    let wish = state
        .metadata
        .get_wish(slug.as_str())
        .await?
        .ok_or_else(|| ApiError::NotFound(slug.as_str().to_string()))?;

    if wish.is_deleted {
        return Ok(Json(WishStatusResponse {
            exists: true,
            status: "deleted",
            expiry_cause: None,
            remaining_views: None,
            expires_at: None,
            deleted_at: wish.deleted_at,
        }));
    }

    // Evaluation only; an expired-but-not-yet-tombstoned wish stays untouched
    // until a view or the sweep gets to it.
    let cause = evaluate_expiry(
        wish.expires_at,
        wish.max_views,
        wish.current_views,
        OffsetDateTime::now_utc(),
    );
    Ok(Json(WishStatusResponse {
        exists: true,
        status: if cause.is_some() { "expired" } else { "active" },
        expiry_cause: cause,
        remaining_views: remaining_views(wish.max_views, wish.current_views),
        expires_at: wish.expires_at,
        deleted_at: None,
    }))
}

/// SHA-256 of a client IP; only the hash is ever stored.
fn hash_ip(ip: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(ip.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}
