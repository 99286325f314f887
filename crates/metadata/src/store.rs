//! Wish store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{NewWishRecord, TombstoneCounts, WishImageRow, WishRow};
use crate::repos::{ViewOutcome, WishRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;
use wisp_core::evaluate_expiry;

/// SQLite schema (embedded).
const SQLITE_SCHEMA: &str = include_str!("sqlite_schema.sql");

/// Combined wish store trait.
#[async_trait]
pub trait WishStore: WishRepo + Send + Sync {
    /// Apply the schema.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// Split an embedded schema into individual statements.
///
/// Both backends prepare statements one at a time, so multi-statement schema
/// files have to be executed piecewise.
pub(crate) fn schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// Map a slug-collision insert failure to `AlreadyExists`.
pub(crate) fn map_unique_violation(slug: &str, err: sqlx::Error) -> MetadataError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return MetadataError::AlreadyExists(format!("slug '{slug}'"));
        }
    }
    MetadataError::Database(err)
}

/// SQLite-based wish store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // also serializes the view-accounting transaction, which is what
            // keeps concurrent reads of a near-exhausted wish honest.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl WishStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        for statement in schema_statements(SQLITE_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl WishRepo for SqliteStore {
    async fn create_wish(&self, record: &NewWishRecord) -> MetadataResult<WishRow> {
        let row = sqlx::query_as::<_, WishRow>(
            r#"
            INSERT INTO wishes (slug, title, message, theme, expires_at, max_views,
                                current_views, is_deleted, created_at, ip_hash)
            VALUES (?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&record.slug)
        .bind(&record.title)
        .bind(&record.message)
        .bind(&record.theme)
        .bind(record.expires_at)
        .bind(record.max_views)
        .bind(record.created_at)
        .bind(&record.ip_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(&record.slug, e))?;
        Ok(row)
    }

    async fn get_wish(&self, slug: &str) -> MetadataResult<Option<WishRow>> {
        let row = sqlx::query_as::<_, WishRow>("SELECT * FROM wishes WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn record_view(&self, slug: &str, now: OffsetDateTime) -> MetadataResult<ViewOutcome> {
        // One transaction covers the load, the expiry check, the increment,
        // and any tombstone write. The single-connection pool serializes
        // concurrent callers, so the read-check-write below cannot interleave.
        let mut tx = self.pool.begin().await?;

        let wish = sqlx::query_as::<_, WishRow>("SELECT * FROM wishes WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(mut wish) = wish else {
            return Ok(ViewOutcome::Missing);
        };
        if wish.is_deleted {
            return Ok(ViewOutcome::Tombstoned);
        }

        // Pre-increment check: an already-expired wish gets no free view.
        if let Some(cause) =
            evaluate_expiry(wish.expires_at, wish.max_views, wish.current_views, now)
        {
            sqlx::query("UPDATE wishes SET is_deleted = 1, deleted_at = ? WHERE wish_id = ?")
                .bind(now)
                .bind(wish.wish_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(ViewOutcome::Expired(cause));
        }

        wish.current_views += 1;

        // Post-increment check: this view may have been the last one.
        let exhausted = wish.max_views.is_some_and(|max| wish.current_views >= max);
        if exhausted {
            sqlx::query(
                "UPDATE wishes SET current_views = ?, is_deleted = 1, deleted_at = ? WHERE wish_id = ?",
            )
            .bind(wish.current_views)
            .bind(now)
            .bind(wish.wish_id)
            .execute(&mut *tx)
            .await?;
            wish.is_deleted = true;
            wish.deleted_at = Some(now);
        } else {
            sqlx::query("UPDATE wishes SET current_views = ? WHERE wish_id = ?")
                .bind(wish.current_views)
                .bind(wish.wish_id)
                .execute(&mut *tx)
                .await?;
        }

        let images = sqlx::query_as::<_, WishImageRow>(
            "SELECT * FROM wish_images WHERE wish_id = ? ORDER BY image_id",
        )
        .bind(wish.wish_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ViewOutcome::Viewed { wish, images })
    }

    async fn tombstone_wish(&self, slug: &str, now: OffsetDateTime) -> MetadataResult<bool> {
        let result = sqlx::query(
            "UPDATE wishes SET is_deleted = 1, deleted_at = ? WHERE slug = ? AND is_deleted = 0",
        )
        .bind(now)
        .bind(slug)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_image(
        &self,
        wish_id: i64,
        path: &str,
        now: OffsetDateTime,
    ) -> MetadataResult<WishImageRow> {
        let row = sqlx::query_as::<_, WishImageRow>(
            r#"
            INSERT INTO wish_images (wish_id, path, created_at)
            VALUES (?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(wish_id)
        .bind(path)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn images_for_wish(&self, wish_id: i64) -> MetadataResult<Vec<WishImageRow>> {
        let rows = sqlx::query_as::<_, WishImageRow>(
            "SELECT * FROM wish_images WHERE wish_id = ? ORDER BY image_id",
        )
        .bind(wish_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_images(&self) -> MetadataResult<Vec<WishImageRow>> {
        let rows =
            sqlx::query_as::<_, WishImageRow>("SELECT * FROM wish_images ORDER BY image_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn delete_image(&self, image_id: i64) -> MetadataResult<bool> {
        let result = sqlx::query("DELETE FROM wish_images WHERE image_id = ?")
            .bind(image_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_reclaimable(
        &self,
        cutoff: OffsetDateTime,
        limit: u32,
    ) -> MetadataResult<Vec<WishRow>> {
        let rows = sqlx::query_as::<_, WishRow>(
            r#"
            SELECT * FROM wishes
            WHERE is_deleted = 1
              AND deleted_at IS NOT NULL
              AND deleted_at <= ?
            ORDER BY deleted_at
            LIMIT ?
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_wish(&self, wish_id: i64) -> MetadataResult<bool> {
        // Image rows go with the wish via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM wishes WHERE wish_id = ?")
            .bind(wish_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_wishes(&self) -> MetadataResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wishes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_images(&self) -> MetadataResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wish_images")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_tombstoned(&self, cutoff: OffsetDateTime) -> MetadataResult<TombstoneCounts> {
        let purge_eligible: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM wishes WHERE is_deleted = 1 AND deleted_at IS NOT NULL AND deleted_at <= ?",
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;
        let in_grace_period: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM wishes WHERE is_deleted = 1 AND deleted_at IS NOT NULL AND deleted_at > ?",
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;
        Ok(TombstoneCounts {
            purge_eligible,
            in_grace_period,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_statements_skip_comments_and_blanks() {
        let statements = schema_statements("-- comment only\n\nCREATE TABLE t (id INTEGER);\n;");
        assert_eq!(statements.len(), 1);
        assert!(statements[0].starts_with("-- comment only"));
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(temp.path().join("wisp.db")).await.unwrap();
        store.migrate().await.unwrap();
        store.health_check().await.unwrap();
    }
}
