//! PostgreSQL-based wish store implementation.

use crate::error::MetadataResult;
use crate::models::{NewWishRecord, TombstoneCounts, WishImageRow, WishRow};
use crate::repos::{ViewOutcome, WishRepo};
use crate::store::{WishStore, map_unique_violation, schema_statements};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;
use wisp_core::evaluate_expiry;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

/// PostgreSQL-based wish store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::from_str(url)?;

        // Bound hung queries so a stuck sweep cannot pin a connection forever.
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{timeout_ms}ms"))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl WishStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single prepared
        // statement, so the schema is split and executed piecewise.
        for statement in schema_statements(POSTGRES_SCHEMA) {
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
impl WishRepo for PostgresStore {
    async fn create_wish(&self, record: &NewWishRecord) -> MetadataResult<WishRow> {
        let row = sqlx::query_as::<_, WishRow>(
            r#"
            INSERT INTO wishes (slug, title, message, theme, expires_at, max_views,
                                current_views, is_deleted, created_at, ip_hash)
            VALUES ($1, $2, $3, $4, $5, $6, 0, FALSE, $7, $8)
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
        let row = sqlx::query_as::<_, WishRow>("SELECT * FROM wishes WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn record_view(&self, slug: &str, now: OffsetDateTime) -> MetadataResult<ViewOutcome> {
        // FOR UPDATE takes a row lock for the life of the transaction, so two
        // concurrent views of the same near-exhausted wish serialize here and
        // the second one sees the first one's tombstone.
        let mut tx = self.pool.begin().await?;

        let wish = sqlx::query_as::<_, WishRow>("SELECT * FROM wishes WHERE slug = $1 FOR UPDATE")
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
            sqlx::query("UPDATE wishes SET is_deleted = TRUE, deleted_at = $1 WHERE wish_id = $2")
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
                "UPDATE wishes SET current_views = $1, is_deleted = TRUE, deleted_at = $2 WHERE wish_id = $3",
            )
            .bind(wish.current_views)
            .bind(now)
            .bind(wish.wish_id)
            .execute(&mut *tx)
            .await?;
            wish.is_deleted = true;
            wish.deleted_at = Some(now);
        } else {
            sqlx::query("UPDATE wishes SET current_views = $1 WHERE wish_id = $2")
                .bind(wish.current_views)
                .bind(wish.wish_id)
                .execute(&mut *tx)
                .await?;
        }

        let images = sqlx::query_as::<_, WishImageRow>(
            "SELECT * FROM wish_images WHERE wish_id = $1 ORDER BY image_id",
        )
        .bind(wish.wish_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ViewOutcome::Viewed { wish, images })
    }

    async fn tombstone_wish(&self, slug: &str, now: OffsetDateTime) -> MetadataResult<bool> {
        let result = sqlx::query(
            "UPDATE wishes SET is_deleted = TRUE, deleted_at = $1 WHERE slug = $2 AND is_deleted = FALSE",
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
            VALUES ($1, $2, $3)
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
            "SELECT * FROM wish_images WHERE wish_id = $1 ORDER BY image_id",
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
        let result = sqlx::query("DELETE FROM wish_images WHERE image_id = $1")
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
            WHERE is_deleted = TRUE
              AND deleted_at IS NOT NULL
              AND deleted_at <= $1
            ORDER BY deleted_at
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_wish(&self, wish_id: i64) -> MetadataResult<bool> {
        // Image rows go with the wish via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM wishes WHERE wish_id = $1")
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
            "SELECT COUNT(*) FROM wishes WHERE is_deleted = TRUE AND deleted_at IS NOT NULL AND deleted_at <= $1",
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;
        let in_grace_period: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM wishes WHERE is_deleted = TRUE AND deleted_at IS NOT NULL AND deleted_at > $1",
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
