//! Admin endpoints: manual sweep trigger, orphan reconciliation, status.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::sweep::{CleanupSummary, SweepOutcome, SweepReport};
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Manual sweep response.
#[derive(Debug, Serialize)]
pub struct CleanupRunResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub report: SweepReport,
}

/// Orphan reconciliation response.
#[derive(Debug, Serialize)]
pub struct OrphanReclaimResponse {
    pub orphaned_images_deleted: u64,
}

/// Admin status response.
#[derive(Debug, Serialize)]
pub struct AdminStatusResponse {
    pub version: &'static str,
    pub cleanup: CleanupSummary,
}

/// POST /admin/cleanup - Run a reclamation sweep now.
pub async fn trigger_cleanup(State(state): State<AppState>) -> ApiResult<Json<CleanupRunResponse>> {
    match state.sweeper.run().await? {
        SweepOutcome::Completed(report) => Ok(Json(CleanupRunResponse {
            status: "completed",
            report,
        })),
        SweepOutcome::Skipped => Err(ApiError::SweepRunning),
    }
}

/// POST /admin/cleanup/orphans - Drop image records whose files are gone.
pub async fn reclaim_orphans(
    State(state): State<AppState>,
) -> ApiResult<Json<OrphanReclaimResponse>> {
    let orphaned_images_deleted = state.sweeper.reclaim_orphan_images().await?;
    Ok(Json(OrphanReclaimResponse {
        orphaned_images_deleted,
    }))
}

/// GET /admin/status - Cleanup summary and settings.
pub async fn admin_status(State(state): State<AppState>) -> ApiResult<Json<AdminStatusResponse>> {
    let cleanup = state.sweeper.summary().await?;
    Ok(Json(AdminStatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        cleanup,
    }))
}
