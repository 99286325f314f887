//! Media blob storage for Wisp.
//!
//! Wish images live here, keyed by relative paths under a per-wish prefix.
//! The database only ever stores those keys; the bytes stay in the backend.

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::filesystem::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use traits::{MediaStore, wish_media_prefix};

use std::sync::Arc;
use wisp_core::config::StorageConfig;

/// Create a media store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn MediaStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend) as Arc<dyn MediaStore>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_filesystem() {
        let temp = tempfile::tempdir().unwrap();
        let config = StorageConfig::Filesystem {
            path: temp.path().join("media"),
        };
        let store = from_config(&config).await.unwrap();
        store.health_check().await.unwrap();
        assert_eq!(store.backend_name(), "filesystem");
    }
}
