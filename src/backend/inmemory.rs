//! In-memory cache backend (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Automatically handles TTL expiration on access.

use super::{distinct_keys, CacheBackend};
use crate::error::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

/// In-memory cache entry with optional expiration.
struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        CacheEntry { data, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// Thread-safe async in-memory cache backend.
///
/// Uses DashMap for lock-free concurrent access with fine-grained per-key sharding.
/// Expired entries behave exactly like absent ones: reads miss, `add` succeeds,
/// and `delete` reports that nothing was removed.
///
/// # Example
///
/// ```no_run
/// use cache_stats::backend::{InMemoryBackend, CacheBackend};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backend = InMemoryBackend::new();
///
///     backend.set("key1", b"value".to_vec(), None).await?;
///     assert!(backend.get("key1").await?.is_some());
///
///     // add() refuses to overwrite a live value
///     assert!(!backend.add("key1", b"other".to_vec(), None).await?);
///
///     backend.set("key2", b"expires".to_vec(), Some(Duration::from_secs(300))).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, CacheEntry>>,
}

impl InMemoryBackend {
    /// Create a new in-memory cache backend.
    pub fn new() -> Self {
        InMemoryBackend {
            store: Arc::new(DashMap::new()),
        }
    }

    /// Get the current number of entries in cache (expired ones included).
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.store.clear();
        warn!("⚠ InMemory CLEAR executed - all cache cleared!");
    }

    /// Remove `key` and report whether a live value was dropped.
    fn remove_live(&self, key: &str) -> bool {
        self.store
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.store.get(key) {
            if !entry.is_expired() {
                debug!("✓ InMemory GET {} -> HIT", key);
                return Ok(Some(entry.data.clone()));
            }
        }

        self.store.remove_if(key, |_, entry| entry.is_expired());
        debug!("✓ InMemory GET {} -> MISS", key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool> {
        self.store
            .insert(key.to_string(), CacheEntry::new(value, ttl));

        if let Some(d) = ttl {
            debug!("✓ InMemory SET {} (TTL: {:?})", key, d);
        } else {
            debug!("✓ InMemory SET {}", key);
        }

        Ok(true)
    }

    async fn add(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool> {
        let added = match self.store.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(CacheEntry::new(value, ttl));
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value, ttl));
                true
            }
        };

        debug!("✓ InMemory ADD {} -> {}", key, if added { "STORED" } else { "EXISTS" });
        Ok(added)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.remove_live(key);
        debug!("✓ InMemory DELETE {} -> {}", key, removed);
        Ok(removed)
    }

    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        let results: Vec<Option<Vec<u8>>> = keys
            .iter()
            .map(|k| match self.store.get(*k) {
                Some(entry) if !entry.is_expired() => Some(entry.data.clone()),
                _ => None,
            })
            .collect();

        debug!("✓ InMemory MGET {} keys", keys.len());
        Ok(results)
    }

    async fn set_many(&self, entries: &[(&str, Vec<u8>)], ttl: Option<Duration>) -> Result<bool> {
        for (key, value) in entries {
            self.store
                .insert(key.to_string(), CacheEntry::new(value.clone(), ttl));
        }

        debug!("✓ InMemory MSET {} keys", entries.len());
        Ok(true)
    }

    async fn delete_many(&self, keys: &[&str]) -> Result<bool> {
        let mut all_removed = true;
        for key in distinct_keys(keys) {
            all_removed &= self.remove_live(key);
        }

        debug!("✓ InMemory MDELETE {} keys -> {}", keys.len(), all_removed);
        Ok(all_removed)
    }
}
