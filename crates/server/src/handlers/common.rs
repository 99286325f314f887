//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use wisp_core::Slug;

/// Parse a slug path parameter.
///
/// Malformed slugs cannot name a wish, so they surface as `not_found` (the
/// `ApiError::Core` mapping) rather than a validation error.
pub fn parse_slug(raw: &str) -> ApiResult<Slug> {
    Slug::parse(raw).map_err(ApiError::Core)
}

/// Public URL for a stored media key.
pub fn media_url(state: &AppState, key: &str) -> String {
    format!(
        "{}/media/{}",
        state.config.server.base_url.trim_end_matches('/'),
        key
    )
}

/// Public share URL for a wish.
pub fn share_url(state: &AppState, slug: &str) -> String {
    format!(
        "{}/w/{}",
        state.config.server.base_url.trim_end_matches('/'),
        slug
    )
}
