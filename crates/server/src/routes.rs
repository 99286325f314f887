//! Route configuration.

use crate::handlers;
use crate::ratelimit::creation_rate_limit_middleware;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    // Multipart bodies carry headers and boundaries on top of the image
    // itself; leave headroom above the configured image cap.
    let upload_body_limit = state.config.limits.max_image_bytes + 64 * 1024;

    // Creation is the only rate-limited route.
    let create_routes = Router::new()
        .route("/api/wishes", post(handlers::create_wish))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            creation_rate_limit_middleware,
        ));

    let api_routes = Router::new()
        .route(
            "/api/wishes/{slug}",
            get(handlers::view_wish).delete(handlers::delete_wish),
        )
        .route("/api/wishes/{slug}/status", get(handlers::wish_status))
        .route(
            "/api/wishes/{slug}/images",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/media/{*path}", get(handlers::get_media))
        // Health check (intentionally unauthenticated for load balancer probes)
        .route("/health", get(handlers::health_check))
        .route("/admin/cleanup", post(handlers::trigger_cleanup))
        .route("/admin/cleanup/orphans", post(handlers::reclaim_orphans))
        .route("/admin/status", get(handlers::admin_status));

    Router::new()
        .merge(create_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
