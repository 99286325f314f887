//! Local filesystem media backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::MediaStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::instrument;
use uuid::Uuid;

/// Local filesystem media store.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Get the full path for a key, with path traversal protection.
    ///
    /// Keys come from database rows and request paths; nothing outside the
    /// storage root may ever be touched through one.
    fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!(
                "path traversal not allowed: {key}"
            )));
        }
        // Every component must be a plain name (no roots, no '.', no '..').
        for component in Path::new(key).components() {
            match component {
                std::path::Component::Normal(_) => {}
                _ => {
                    return Err(StorageError::InvalidKey(format!(
                        "contains unsafe path component: {key}"
                    )));
                }
            }
        }
        Ok(self.root.join(key))
    }

    /// Ensure parent directory exists.
    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MediaStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key)?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", bytes = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let path = self.key_path(key)?;
        self.ensure_parent(&path).await?;

        // Write to a sibling temp file and rename, so readers never observe
        // a half-written blob.
        let temp_name = format!(
            ".tmp-{}-{}",
            Uuid::new_v4(),
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("object")
        );
        let temp_path = path.with_file_name(temp_name);
        fs::write(&temp_path, &data).await?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        let path = self.key_path(prefix)?;
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            // Nothing was ever uploaded under this prefix.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let path = self.key_path(prefix)?;
        let root = self.root.clone();
        let keys = tokio::task::spawn_blocking(move || collect_keys(&root, &path))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })??;
        Ok(keys)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    async fn health_check(&self) -> StorageResult<()> {
        if !self.root.is_dir() {
            return Err(StorageError::Config(format!(
                "storage root is not a directory: {}",
                self.root.display()
            )));
        }
        Ok(())
    }
}

/// Collect keys (paths relative to `root`) for every file under `dir`.
fn collect_keys(root: &Path, dir: &Path) -> StorageResult<Vec<String>> {
    let mut keys = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(StorageError::Io(e)),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else if let Ok(relative) = path.strip_prefix(root) {
                keys.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    keys.sort();
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn backend() -> (tempfile::TempDir, FilesystemBackend) {
        let temp = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(temp.path()).await.unwrap();
        (temp, backend)
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let (_temp, backend) = backend().await;
        backend
            .put("wishes/1/a.webp", Bytes::from_static(b"image data"))
            .await
            .unwrap();
        let data = backend.get("wishes/1/a.webp").await.unwrap();
        assert_eq!(&data[..], b"image data");
        assert!(backend.exists("wishes/1/a.webp").await.unwrap());
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (_temp, backend) = backend().await;
        assert!(matches!(
            backend.get("wishes/1/missing.webp").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let (_temp, backend) = backend().await;
        for key in ["../escape", "/absolute", "wishes/../../etc/passwd", ""] {
            assert!(matches!(
                backend.get(key).await,
                Err(StorageError::InvalidKey(_))
            ));
        }
    }

    #[tokio::test]
    async fn delete_prefix_removes_everything() {
        let (_temp, backend) = backend().await;
        backend
            .put("wishes/7/a.webp", Bytes::from_static(b"a"))
            .await
            .unwrap();
        backend
            .put("wishes/7/b.webp", Bytes::from_static(b"b"))
            .await
            .unwrap();
        backend
            .put("wishes/8/c.webp", Bytes::from_static(b"c"))
            .await
            .unwrap();

        backend.delete_prefix("wishes/7").await.unwrap();
        assert!(!backend.exists("wishes/7/a.webp").await.unwrap());
        assert!(backend.exists("wishes/8/c.webp").await.unwrap());
    }

    #[tokio::test]
    async fn delete_prefix_is_ok_when_absent() {
        let (_temp, backend) = backend().await;
        backend.delete_prefix("wishes/999").await.unwrap();
    }

    #[tokio::test]
    async fn list_returns_relative_keys() {
        let (_temp, backend) = backend().await;
        backend
            .put("wishes/7/b.webp", Bytes::from_static(b"b"))
            .await
            .unwrap();
        backend
            .put("wishes/7/a.webp", Bytes::from_static(b"a"))
            .await
            .unwrap();

        let keys = backend.list("wishes/7").await.unwrap();
        assert_eq!(keys, vec!["wishes/7/a.webp", "wishes/7/b.webp"]);

        assert!(backend.list("wishes/999").await.unwrap().is_empty());
    }
}
