//! Mock media store for sweep failure-path tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::Mutex;
use wisp_storage::{MediaStore, StorageError, StorageResult};

/// A media store whose `delete_prefix` fails for configured prefixes.
///
/// Everything else behaves like an empty store; the sweep tests only care
/// about whether a per-wish file deletion failure derails the batch.
#[allow(dead_code)]
pub struct FailingMediaStore {
    failing_prefixes: HashSet<String>,
    deleted_prefixes: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FailingMediaStore {
    pub fn new(failing_prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            failing_prefixes: failing_prefixes.into_iter().collect(),
            deleted_prefixes: Mutex::new(Vec::new()),
        }
    }

    /// Prefixes successfully deleted so far.
    pub fn deleted_prefixes(&self) -> Vec<String> {
        self.deleted_prefixes.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for FailingMediaStore {
    async fn exists(&self, _key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        Err(StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, _key: &str, _data: Bytes) -> StorageResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        if self.failing_prefixes.contains(prefix) {
            return Err(StorageError::Io(std::io::Error::other(format!(
                "simulated failure deleting {prefix}"
            ))));
        }
        self.deleted_prefixes.lock().unwrap().push(prefix.to_string());
        Ok(())
    }

    async fn list(&self, _prefix: &str) -> StorageResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn backend_name(&self) -> &'static str {
        "failing-mock"
    }
}
