//! Storage test utilities.

use async_trait::async_trait;
use bytes::Bytes;
use rgc_storage::{ObjectStore, StorageError, StorageResult};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

fn injected(key: &str) -> StorageError {
    StorageError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        format!("injected fault for {key}"),
    ))
}

/// Wraps a store and fails selected operations on demand.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct FaultyStore {
    inner: Arc<dyn ObjectStore>,
    fail_list: Mutex<HashSet<String>>,
    fail_delete_containing: Mutex<HashSet<String>>,
    fail_health: Mutex<bool>,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            fail_list: Mutex::new(HashSet::new()),
            fail_delete_containing: Mutex::new(HashSet::new()),
            fail_health: Mutex::new(false),
        }
    }

    /// Fail `list_children` for exactly this prefix.
    pub fn fail_list(&self, prefix: &str) {
        self.fail_list.lock().unwrap().insert(prefix.to_string());
    }

    /// Fail `delete` for keys containing `needle`.
    pub fn fail_delete(&self, needle: &str) {
        self.fail_delete_containing
            .lock()
            .unwrap()
            .insert(needle.to_string());
    }

    pub fn fail_health(&self) {
        *self.fail_health.lock().unwrap() = true;
    }
}

#[async_trait]
impl ObjectStore for FaultyStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.inner.put(key, data).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let fail = self
            .fail_delete_containing
            .lock()
            .unwrap()
            .iter()
            .any(|needle| key.contains(needle.as_str()));
        if fail {
            return Err(injected(key));
        }
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(prefix).await
    }

    async fn list_children(&self, prefix: &str) -> StorageResult<Vec<String>> {
        if self.fail_list.lock().unwrap().contains(prefix) {
            return Err(injected(prefix));
        }
        self.inner.list_children(prefix).await
    }

    fn backend_name(&self) -> &'static str {
        "faulty"
    }

    async fn health_check(&self) -> StorageResult<()> {
        if *self.fail_health.lock().unwrap() {
            return Err(injected("health"));
        }
        self.inner.health_check().await
    }
}
