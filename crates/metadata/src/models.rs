//! Database models mapping to the wish schema.

use sqlx::FromRow;
use time::OffsetDateTime;

/// Wish record.
///
/// `is_deleted`/`deleted_at` together form the tombstone: once set, the row
/// is inert and only the reclamation sweep touches it again. `deleted_at` is
/// non-null exactly when `is_deleted` is true.
#[derive(Debug, Clone, FromRow)]
pub struct WishRow {
    pub wish_id: i64,
    /// Public share identifier, distinct from the row id.
    pub slug: String,
    pub title: Option<String>,
    pub message: String,
    pub theme: String,
    pub expires_at: Option<OffsetDateTime>,
    pub max_views: Option<i64>,
    pub current_views: i64,
    pub is_deleted: bool,
    pub created_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
    /// SHA-256 of the creator's IP, for abuse follow-up.
    pub ip_hash: String,
}

/// Image record attached to a wish.
///
/// `path` is relative to the media store root; the blob itself lives there.
/// Rows cascade-delete with their owning wish.
#[derive(Debug, Clone, FromRow)]
pub struct WishImageRow {
    pub image_id: i64,
    pub wish_id: i64,
    pub path: String,
    pub created_at: OffsetDateTime,
}

/// Fields for inserting a new wish. Ids and counters are store-assigned.
#[derive(Debug, Clone)]
pub struct NewWishRecord {
    pub slug: String,
    pub title: Option<String>,
    pub message: String,
    pub theme: String,
    pub expires_at: Option<OffsetDateTime>,
    pub max_views: Option<i64>,
    pub ip_hash: String,
    pub created_at: OffsetDateTime,
}

/// Tombstone counts split at the grace-period cutoff.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct TombstoneCounts {
    /// Tombstoned past the grace period; next sweep may purge these.
    pub purge_eligible: i64,
    /// Tombstoned but still within the grace period.
    pub in_grace_period: i64,
}
