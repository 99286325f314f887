//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Media store abstraction for wish image blobs.
///
/// Keys are forward-slash relative paths (e.g. `wishes/42/cover.webp`); every
/// blob belonging to a wish lives under that wish's prefix so the whole set
/// can be reclaimed in one call.
#[async_trait]
pub trait MediaStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Put an object atomically.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete a single object. Absent objects are an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Recursively delete everything under a prefix.
    ///
    /// Succeeds when the prefix does not exist; the reclamation sweep calls
    /// this for wishes whose media may never have been uploaded.
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()>;

    /// List object keys under a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Get the name of this storage backend (for logging).
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is usable.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Prefix under which all of a wish's media lives.
pub fn wish_media_prefix(wish_id: i64) -> String {
    format!("wishes/{wish_id}")
}
