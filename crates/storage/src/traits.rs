//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Delimiter separating "directories" in object keys.
pub const DELIMITER: char = '/';

/// Object store holding the registry's data.
///
/// Keys are `/`-separated. There are no real directories: a key prefix ending in `/`
/// stands for every object below it.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Put an object atomically.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete an object. Fails with `NotFound` if it does not exist.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List every object key under a prefix, recursively.
    ///
    /// An object whose key equals the prefix (an S3 folder marker) is included.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// List the direct children of a prefix.
    ///
    /// Objects come back as their full key; deeper levels are collapsed into a
    /// single "directory" key ending in `/` (S3 common prefixes). Keys are returned
    /// in lexicographic order.
    async fn list_children(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Get the name of this storage backend, for logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()).
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Delete every object under `prefix`. Returns the number of objects removed.
///
/// Objects that disappear between listing and deletion are not an error.
pub async fn delete_prefix<S: ObjectStore + ?Sized>(store: &S, prefix: &str) -> StorageResult<usize> {
    let mut deleted = 0;
    for key in store.list(prefix).await? {
        match store.delete(&key).await {
            Ok(()) => deleted += 1,
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(deleted)
}
