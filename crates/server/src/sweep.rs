//! Reclamation sweep: permanent removal of tombstoned wishes.
//!
//! A tombstoned wish sits untouched for the configured grace period, then a
//! sweep run deletes its media directory and its database row (images
//! cascade). Each run works through candidates batch by batch; a failure on
//! one wish is logged and counted, never fatal to the batch.

use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use uuid::Uuid;
use wisp_core::config::CleanupConfig;
use wisp_metadata::repos::WishRepo;
use wisp_metadata::{MetadataResult, WishStore};
use wisp_storage::{MediaStore, wish_media_prefix};

/// Counters from one completed sweep run.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub sweep_id: Uuid,
    pub wishes_deleted: u64,
    pub images_deleted: u64,
    pub errors: u64,
}

/// Result of asking for a sweep run.
#[derive(Debug)]
pub enum SweepOutcome {
    /// The run executed to completion (possibly with per-item errors).
    Completed(SweepReport),
    /// Another run already held the guard; nothing was done.
    Skipped,
}

/// Read-only counters for operational visibility.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupSummary {
    /// Tombstoned past the grace period; the next sweep may purge these.
    pub purge_eligible: i64,
    /// Tombstoned but still within the grace period.
    pub in_grace_period: i64,
    pub total_wishes: i64,
    pub total_images: i64,
    pub grace_period_minutes: u64,
    pub sweep_interval_minutes: u64,
}

/// Owns the sweep: candidates query, media deletion, row deletion.
pub struct Sweeper {
    metadata: Arc<dyn WishStore>,
    storage: Arc<dyn MediaStore>,
    config: CleanupConfig,
    /// Held for the duration of a run; `try_lock` keeps runs from
    /// overlapping without ever queueing a second one behind the first.
    running: tokio::sync::Mutex<()>,
}

impl Sweeper {
    /// Create a new sweeper.
    pub fn new(
        metadata: Arc<dyn WishStore>,
        storage: Arc<dyn MediaStore>,
        config: CleanupConfig,
    ) -> Self {
        Self {
            metadata,
            storage,
            config,
            running: tokio::sync::Mutex::new(()),
        }
    }

    /// Run one sweep to completion.
    ///
    /// Returns `Skipped` when a run is already in progress. Per-wish failures
    /// are counted in the report; only a failure of the candidates query
    /// itself aborts the run.
    pub async fn run(&self) -> MetadataResult<SweepOutcome> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::info!("Reclamation sweep already running, skipping");
            return Ok(SweepOutcome::Skipped);
        };

        let sweep_id = Uuid::new_v4();
        let cutoff = OffsetDateTime::now_utc() - self.config.grace_period();
        let mut report = SweepReport {
            sweep_id,
            wishes_deleted: 0,
            images_deleted: 0,
            errors: 0,
        };

        tracing::info!(sweep_id = %sweep_id, cutoff = %cutoff, "Reclamation sweep started");

        let mut iterations = 0u32;
        loop {
            iterations += 1;
            if iterations > self.config.max_sweep_iterations {
                tracing::warn!(
                    sweep_id = %sweep_id,
                    iterations = iterations,
                    max_iterations = self.config.max_sweep_iterations,
                    "Sweep exceeded max iterations, stopping to prevent infinite loop"
                );
                break;
            }

            let batch = self
                .metadata
                .find_reclaimable(cutoff, self.config.batch_size)
                .await?;
            if batch.is_empty() {
                break;
            }

            let mut deleted_this_batch = 0u64;
            for wish in batch {
                // Count images from the record before the row goes away.
                let images = match self.metadata.images_for_wish(wish.wish_id).await {
                    Ok(images) => images,
                    Err(e) => {
                        tracing::warn!(
                            sweep_id = %sweep_id,
                            slug = %wish.slug,
                            error = %e,
                            "Failed to load images for wish, skipping"
                        );
                        report.errors += 1;
                        continue;
                    }
                };

                // Media first. Leftover files from a failed delete become
                // orphans for reclaim_orphan_images; the row delete below
                // proceeds regardless.
                let prefix = wish_media_prefix(wish.wish_id);
                if let Err(e) = self.storage.delete_prefix(&prefix).await {
                    tracing::warn!(
                        sweep_id = %sweep_id,
                        slug = %wish.slug,
                        prefix = %prefix,
                        error = %e,
                        "Failed to delete media directory"
                    );
                    report.errors += 1;
                }

                match self.metadata.delete_wish(wish.wish_id).await {
                    Ok(true) => {
                        report.wishes_deleted += 1;
                        report.images_deleted += images.len() as u64;
                        deleted_this_batch += 1;
                        tracing::info!(
                            sweep_id = %sweep_id,
                            slug = %wish.slug,
                            wish_id = wish.wish_id,
                            images = images.len(),
                            "Purged wish"
                        );
                    }
                    Ok(false) => {
                        tracing::debug!(
                            sweep_id = %sweep_id,
                            slug = %wish.slug,
                            "Wish row already gone"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            sweep_id = %sweep_id,
                            slug = %wish.slug,
                            error = %e,
                            "Failed to delete wish row"
                        );
                        report.errors += 1;
                    }
                }
            }

            // A batch where nothing was deleted would be refetched verbatim.
            if deleted_this_batch == 0 {
                break;
            }
        }

        tracing::info!(
            sweep_id = %sweep_id,
            wishes_deleted = report.wishes_deleted,
            images_deleted = report.images_deleted,
            errors = report.errors,
            "Reclamation sweep finished"
        );
        Ok(SweepOutcome::Completed(report))
    }

    /// Read-only counters; safe to call at any time, mutates nothing.
    pub async fn summary(&self) -> MetadataResult<CleanupSummary> {
        let cutoff = OffsetDateTime::now_utc() - self.config.grace_period();
        let tombstoned = self.metadata.count_tombstoned(cutoff).await?;
        let total_wishes = self.metadata.count_wishes().await?;
        let total_images = self.metadata.count_images().await?;
        Ok(CleanupSummary {
            purge_eligible: tombstoned.purge_eligible,
            in_grace_period: tombstoned.in_grace_period,
            total_wishes,
            total_images,
            grace_period_minutes: self.config.grace_period_minutes,
            sweep_interval_minutes: self.config.sweep_interval_minutes,
        })
    }

    /// Delete image records whose file no longer exists on disk.
    ///
    /// Best-effort reconciliation, independent of the main sweep. Returns the
    /// number of records removed.
    pub async fn reclaim_orphan_images(&self) -> MetadataResult<u64> {
        let images = self.metadata.list_images().await?;
        let mut removed = 0u64;
        for image in images {
            match self.storage.exists(&image.path).await {
                Ok(true) => {}
                Ok(false) => match self.metadata.delete_image(image.image_id).await {
                    Ok(true) => {
                        removed += 1;
                        tracing::info!(
                            image_id = image.image_id,
                            path = %image.path,
                            "Deleted orphaned image record"
                        );
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(
                            image_id = image.image_id,
                            error = %e,
                            "Failed to delete orphaned image record"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        image_id = image.image_id,
                        path = %image.path,
                        error = %e,
                        "Failed to stat image file"
                    );
                }
            }
        }
        Ok(removed)
    }

    /// Spawn the periodic scheduler, or return None when disabled.
    pub fn spawn_scheduler(self: Arc<Self>) -> Option<JoinHandle<()>> {
        let interval = self.config.sweep_interval()?;
        Some(tokio::spawn(async move {
            tracing::info!(
                interval_secs = interval.as_secs(),
                "Reclamation sweep scheduler enabled"
            );
            loop {
                tokio::time::sleep(interval).await;
                match self.run().await {
                    Ok(SweepOutcome::Completed(report)) => {
                        if report.errors > 0 {
                            tracing::warn!(
                                sweep_id = %report.sweep_id,
                                errors = report.errors,
                                "Scheduled sweep finished with errors"
                            );
                        }
                    }
                    Ok(SweepOutcome::Skipped) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Scheduled sweep failed");
                    }
                }
            }
        }))
    }
}
