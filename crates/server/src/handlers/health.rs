//! Health check endpoint.

use crate::state::AppState;
use crate::sweep::CleanupSummary;
use axum::Json;
use axum::extract::State;
use serde::Serialize;
use wisp_metadata::WishStore;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupSummary>,
}

/// GET /health - Liveness plus a cleanup summary.
///
/// Intentionally unauthenticated for load balancer probes. Reports degraded
/// (still 200) when the database is unreachable, so probes can tell "up but
/// unhappy" from "down".
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    match state.metadata.health_check().await {
        Ok(()) => {
            let cleanup = match state.sweeper.summary().await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to build cleanup summary");
                    None
                }
            };
            Json(HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                database: "ok".to_string(),
                cleanup,
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            Json(HealthResponse {
                status: "degraded",
                version: env!("CARGO_PKG_VERSION"),
                database: format!("unhealthy: {e}"),
                cleanup: None,
            })
        }
    }
}
