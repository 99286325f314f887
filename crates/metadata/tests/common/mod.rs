//! Shared test fixtures for wish store tests.

use time::OffsetDateTime;
use wisp_metadata::SqliteStore;
use wisp_metadata::models::NewWishRecord;

/// Create a SQLite store backed by a temp directory.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub async fn sqlite_store() -> (tempfile::TempDir, SqliteStore) {
    let temp = tempfile::tempdir().expect("failed to create temp directory");
    let store = SqliteStore::new(temp.path().join("wisp.db"))
        .await
        .expect("failed to create sqlite store");
    (temp, store)
}

/// Build an insertable wish record with the given slug and limits.
#[allow(dead_code)]
pub fn wish_record(
    slug: &str,
    max_views: Option<i64>,
    expires_at: Option<OffsetDateTime>,
) -> NewWishRecord {
    NewWishRecord {
        slug: slug.to_string(),
        title: Some("Happy Birthday".to_string()),
        message: "Have a great day!".to_string(),
        theme: "birthday".to_string(),
        expires_at,
        max_views,
        ip_hash: "a".repeat(64),
        created_at: OffsetDateTime::now_utc(),
    }
}
