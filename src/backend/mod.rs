//! Cache backend implementations.

use crate::error::Result;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

pub use inmemory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use redis::{PoolStats, RedisBackend, RedisConfig};

/// Trait for the key-value cache client being observed.
///
/// This is the backend collaborator wrapped by
/// [`StatsTrackingCache`](crate::StatsTrackingCache). Implementations keep
/// their own consistency and eviction policy; the proxy only looks at the
/// values returned.
///
/// **IMPORTANT:** All methods use `&self` instead of `&mut self` to allow concurrent access.
/// Backend implementations should use interior mutability (DashMap, Mutex, or external storage).
///
/// **ASYNC:** Every returned future is `Send`, so a proxy over any backend can be
/// driven from multi-threaded request handlers. Implementations may still be
/// written with `async fn`.
pub trait CacheBackend: Send + Sync + Clone {
    /// Retrieve value from cache by key.
    ///
    /// # Returns
    /// - `Ok(Some(bytes))` - Value found in cache
    /// - `Ok(None)` - Cache miss (key not found)
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs (connection lost, etc.)
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Store value in cache with optional TTL.
    ///
    /// Returns `Ok(true)` if the backend accepted the value.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Store value only if the key holds no value yet.
    ///
    /// Returns `Ok(false)` when the key is already present.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn add(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Remove value from cache.
    ///
    /// Returns `Ok(false)` when there was nothing to remove.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Bulk get operation.
    ///
    /// The result is aligned positionally with `keys`.
    /// Default implementation calls `get()` for each key.
    /// Override for batch efficiency (e.g., Redis MGET).
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn get_many(
        &self,
        keys: &[&str],
    ) -> impl Future<Output = Result<Vec<Option<Vec<u8>>>>> + Send {
        async move {
            let mut results = Vec::with_capacity(keys.len());
            for key in keys {
                results.push(self.get(key).await?);
            }
            Ok(results)
        }
    }

    /// Bulk set operation.
    ///
    /// Success is reported for the batch as a whole.
    /// Default implementation calls `set()` for each entry.
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn set_many(
        &self,
        entries: &[(&str, Vec<u8>)],
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<bool>> + Send {
        async move {
            let mut all_stored = true;
            for (key, value) in entries {
                all_stored &= self.set(key, value.clone(), ttl).await?;
            }
            Ok(all_stored)
        }
    }

    /// Bulk delete operation.
    ///
    /// Every distinct key is attempted; success means every distinct key held
    /// a value. A key listed twice counts once.
    /// Default implementation calls `delete()` for each distinct key.
    /// Override for batch efficiency (e.g., Redis DEL).
    ///
    /// # Errors
    /// Returns `Err` if backend error occurs
    fn delete_many(&self, keys: &[&str]) -> impl Future<Output = Result<bool>> + Send {
        async move {
            let mut all_removed = true;
            for key in distinct_keys(keys) {
                all_removed &= self.delete(key).await?;
            }
            Ok(all_removed)
        }
    }

    /// Health check - verify backend is accessible.
    ///
    /// # Errors
    /// Returns `Err` if backend is not accessible
    fn health_check(&self) -> impl Future<Output = Result<bool>> + Send {
        async { Ok(true) }
    }
}

/// `keys` without repeats, in first-seen order.
pub(crate) fn distinct_keys<'a>(keys: &[&'a str]) -> Vec<&'a str> {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.iter().copied().filter(|key| seen.insert(*key)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Backend relying on every default bulk method.
    #[derive(Clone, Default)]
    struct MinimalBackend {
        store: Arc<Mutex<std::collections::HashMap<String, Vec<u8>>>>,
    }

    impl CacheBackend for MinimalBackend {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.store.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: Vec<u8>, _ttl: Option<Duration>) -> Result<bool> {
            self.store.lock().await.insert(key.to_string(), value);
            Ok(true)
        }

        async fn add(&self, key: &str, value: Vec<u8>, _ttl: Option<Duration>) -> Result<bool> {
            let mut store = self.store.lock().await;
            if store.contains_key(key) {
                return Ok(false);
            }
            store.insert(key.to_string(), value);
            Ok(true)
        }

        async fn delete(&self, key: &str) -> Result<bool> {
            if key == "explode" {
                return Err(Error::BackendError("boom".to_string()));
            }
            Ok(self.store.lock().await.remove(key).is_some())
        }
    }

    #[tokio::test]
    async fn test_default_get_many_aligns_with_keys() {
        let backend = MinimalBackend::default();
        backend.set("b", vec![2], None).await.expect("Failed to set");

        let values = backend
            .get_many(&["a", "b", "c"])
            .await
            .expect("Failed to get_many");
        assert_eq!(values, vec![None, Some(vec![2]), None]);
    }

    #[tokio::test]
    async fn test_default_set_many_and_delete_many() {
        let backend = MinimalBackend::default();
        let stored = backend
            .set_many(&[("a", vec![1]), ("b", vec![2])], None)
            .await
            .expect("Failed to set_many");
        assert!(stored);

        assert!(backend
            .delete_many(&["a", "b"])
            .await
            .expect("Failed to delete_many"));
        assert!(!backend
            .delete_many(&["a"])
            .await
            .expect("Failed to delete_many"));
    }

    #[tokio::test]
    async fn test_default_delete_many_counts_repeated_key_once() {
        let backend = MinimalBackend::default();
        backend.set("a", vec![1], None).await.expect("Failed to set");

        assert!(backend
            .delete_many(&["a", "a"])
            .await
            .expect("Failed to delete_many"));
        assert_eq!(backend.get("a").await.expect("Failed to get"), None);
    }

    #[test]
    fn test_distinct_keys_keeps_first_seen_order() {
        assert_eq!(distinct_keys(&["b", "a", "b", "c", "a"]), vec!["b", "a", "c"]);
        assert!(distinct_keys(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_default_delete_many_propagates_errors() {
        let backend = MinimalBackend::default();
        let result = backend.delete_many(&["a", "explode"]).await;
        assert!(matches!(result, Err(Error::BackendError(_))));
    }

    #[tokio::test]
    async fn test_default_health_check() {
        let backend = MinimalBackend::default();
        assert!(backend.health_check().await.expect("Health check failed"));
    }
}
