//! Wish repository trait: the persistence surface the rest of Wisp sees.

use crate::error::MetadataResult;
use crate::models::{NewWishRecord, TombstoneCounts, WishImageRow, WishRow};
use async_trait::async_trait;
use time::OffsetDateTime;
use wisp_core::ExpiryCause;

/// Result of one pass through the view-accounting transaction.
#[derive(Debug)]
pub enum ViewOutcome {
    /// No row for the slug.
    Missing,
    /// The row exists but was tombstoned by an earlier read, an explicit
    /// delete, or an earlier expiry. Callers surface this as "gone" without
    /// saying when or why, matching the share-link behavior of the original
    /// service.
    Tombstoned,
    /// The wish was found expired before the view could be counted. The
    /// transaction tombstoned it; the counter was NOT incremented.
    Expired(ExpiryCause),
    /// The view was counted. `wish` carries post-increment counters, and the
    /// tombstone flag is already set if this view exhausted the limit.
    Viewed {
        wish: WishRow,
        images: Vec<WishImageRow>,
    },
}

/// Repository for wish records and their images.
#[async_trait]
pub trait WishRepo: Send + Sync {
    /// Insert a new wish. Fails with `AlreadyExists` on a slug collision.
    async fn create_wish(&self, record: &NewWishRecord) -> MetadataResult<WishRow>;

    /// Fetch a wish by slug, tombstoned or not.
    async fn get_wish(&self, slug: &str) -> MetadataResult<Option<WishRow>>;

    /// Run the view-accounting transaction for a public read.
    ///
    /// In one unit of work against the backing store: load the row, reject
    /// absent/tombstoned slugs, tombstone-and-refuse if already expired,
    /// otherwise count the view and tombstone when the view limit is now
    /// exhausted. Concurrent calls on the same wish serialize on the row, so
    /// a wish with `max_views = N` produces exactly N `Viewed` outcomes.
    async fn record_view(&self, slug: &str, now: OffsetDateTime) -> MetadataResult<ViewOutcome>;

    /// Explicitly tombstone a wish. Returns true if a live row transitioned;
    /// false when the slug is absent or already tombstoned.
    async fn tombstone_wish(&self, slug: &str, now: OffsetDateTime) -> MetadataResult<bool>;

    /// Record an uploaded image for a wish.
    async fn add_image(
        &self,
        wish_id: i64,
        path: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<WishImageRow>;

    /// Images belonging to a wish, oldest first.
    async fn images_for_wish(&self, wish_id: i64) -> MetadataResult<Vec<WishImageRow>>;

    /// All image records (orphan reconciliation).
    async fn list_images(&self) -> MetadataResult<Vec<WishImageRow>>;

    /// Delete a single image record. Returns true if a row went away.
    async fn delete_image(&self, image_id: i64) -> MetadataResult<bool>;

    /// Tombstoned wishes whose `deleted_at` is at or before `cutoff`.
    async fn find_reclaimable(
        &self,
        cutoff: OffsetDateTime,
        limit: u32,
    ) -> MetadataResult<Vec<WishRow>>;

    /// Permanently delete a wish row (cascades to its image rows). Returns
    /// true if a row went away.
    async fn delete_wish(&self, wish_id: i64) -> MetadataResult<bool>;

    /// Total wish rows, tombstoned included.
    async fn count_wishes(&self) -> MetadataResult<i64>;

    /// Total image rows.
    async fn count_images(&self) -> MetadataResult<i64>;

    /// Tombstone counts split at the grace-period cutoff.
    async fn count_tombstoned(&self, cutoff: OffsetDateTime) -> MetadataResult<TombstoneCounts>;
}
