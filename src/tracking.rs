//! Statistics-tracking cache proxy - main entry point for cache operations.

use crate::backend::CacheBackend;
use crate::error::{Error, Result};
use crate::observability::{CacheMetrics, NoOpMetrics};
use crate::stats::{batch_footprint_kib, footprint_kib, Snapshot, StatDelta, StatEntry, StatsTable};
use std::time::Duration;
use tokio::time::Instant;

/// How a bulk read charges payload size to the keys it hits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BulkSizeAccounting {
    /// Every hit key is charged the footprint of the entire result batch.
    #[default]
    Batch,
    /// Every hit key is charged the footprint of its own value.
    PerValue,
}

/// Cache proxy that records per-key usage statistics.
///
/// Wraps a [`CacheBackend`] and exposes the same operations with the same
/// results. Each call is delegated to the backend first; only after the
/// backend answers is the outcome merged into the statistics table. A call
/// that fails in the backend returns the backend's error and records nothing.
///
/// | Operation | Effect on the key's entry |
/// |-----------|---------------------------|
/// | `read` hit | hot, `hit_count + 1`, size of value, latency |
/// | `read` miss | cold, `miss_count + 1`, latency |
/// | `write` / `add_if_absent` success | hot, size of value |
/// | `remove` success | cold |
/// | `read_many` | per key as `read`, no latency, size per [`BulkSizeAccounting`] |
/// | `write_many` success | every key hot, size of its own value |
/// | `remove_many` success | every already-tracked key cold |
///
/// # Example
///
/// ```no_run
/// use cache_stats::{StatsTrackingCache, backend::InMemoryBackend};
///
/// # async fn example() -> cache_stats::Result<()> {
/// let cache = StatsTrackingCache::new(InMemoryBackend::new());
///
/// cache.write("greeting", b"hello".to_vec(), None).await?;
/// cache.read("greeting").await?;
///
/// let entry = cache.entry("greeting").expect("tracked");
/// assert!(entry.is_present);
/// assert_eq!(entry.hit_count, 1);
/// # Ok(())
/// # }
/// ```
pub struct StatsTrackingCache<B: CacheBackend> {
    backend: B,
    table: StatsTable,
    metrics: Box<dyn CacheMetrics>,
    bulk_size_accounting: BulkSizeAccounting,
}

impl<B: CacheBackend> StatsTrackingCache<B> {
    /// Wrap `backend` with an empty statistics table.
    pub fn new(backend: B) -> Self {
        info!("✓ Cache statistics tracking enabled");
        StatsTrackingCache {
            backend,
            table: StatsTable::new(),
            metrics: Box::new(NoOpMetrics),
            bulk_size_accounting: BulkSizeAccounting::default(),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Set how bulk reads attribute payload size.
    pub fn with_bulk_size_accounting(mut self, accounting: BulkSizeAccounting) -> Self {
        self.bulk_size_accounting = accounting;
        self
    }

    /// Read a single key.
    ///
    /// Backend latency is measured around the `get` call only and stored
    /// in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged; no statistics are recorded.
    pub async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let timer = Instant::now();
        let value = self
            .backend
            .get(key)
            .await
            .map_err(|e| self.failed("read", e))?;
        let elapsed = timer.elapsed();
        let latency_ms = elapsed.as_nanos() as f64 / 1_000_000.0;

        match &value {
            Some(bytes) => {
                self.table
                    .update(key, StatDelta::hit(footprint_kib(bytes)).with_latency(latency_ms));
                self.metrics.record_hit(key, elapsed);
                debug!("» read {} -> HIT ({:.5} ms)", key, latency_ms);
            }
            None => {
                self.table
                    .update(key, StatDelta::miss().with_latency(latency_ms));
                self.metrics.record_miss(key, elapsed);
                debug!("» read {} -> MISS ({:.5} ms)", key, latency_ms);
            }
        }

        Ok(value)
    }

    /// Store a value.
    ///
    /// Statistics change only when the backend reports success.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged; no statistics are recorded.
    pub async fn write(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool> {
        let size_kib = footprint_kib(&value);
        let stored = self
            .backend
            .set(key, value, ttl)
            .await
            .map_err(|e| self.failed("write", e))?;

        if stored {
            self.table.update(key, StatDelta::stored(size_kib));
            self.metrics.record_write(key);
        }
        debug!("» write {} -> {}", key, stored);

        Ok(stored)
    }

    /// Store a value only if the key holds nothing yet.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged; no statistics are recorded.
    pub async fn add_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let size_kib = footprint_kib(&value);
        let added = self
            .backend
            .add(key, value, ttl)
            .await
            .map_err(|e| self.failed("add_if_absent", e))?;

        if added {
            self.table.update(key, StatDelta::stored(size_kib));
            self.metrics.record_write(key);
        }
        debug!("» add {} -> {}", key, added);

        Ok(added)
    }

    /// Remove a key.
    ///
    /// `Ok(false)` means the backend had nothing to remove; in that case no
    /// entry is created or modified.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged; no statistics are recorded.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let removed = self
            .backend
            .delete(key)
            .await
            .map_err(|e| self.failed("remove", e))?;

        if removed {
            self.table.update(key, StatDelta::removed());
            self.metrics.record_remove(key);
        }
        debug!("» remove {} -> {}", key, removed);

        Ok(removed)
    }

    /// Read several keys in one backend call.
    ///
    /// The result is aligned with `keys`. No latency is attributed to any
    /// single key.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged; no statistics are recorded.
    pub async fn read_many(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        let values = self
            .backend
            .get_many(keys)
            .await
            .map_err(|e| self.failed("read_many", e))?;

        if values.len() != keys.len() {
            warn!(
                "Backend returned {} values for {} keys; extra positions are not tracked",
                values.len(),
                keys.len()
            );
        }

        let batch_kib = batch_footprint_kib(&values);
        for (key, value) in keys.iter().zip(&values) {
            match value {
                Some(bytes) => {
                    let size_kib = match self.bulk_size_accounting {
                        BulkSizeAccounting::Batch => batch_kib,
                        BulkSizeAccounting::PerValue => footprint_kib(bytes),
                    };
                    self.table.update(key, StatDelta::hit(size_kib));
                }
                None => self.table.update(key, StatDelta::miss()),
            }
        }
        debug!("» read_many {} keys", keys.len());

        Ok(values)
    }

    /// Store several values in one backend call.
    ///
    /// On batch success every key becomes hot with the size of its own value.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged; no statistics are recorded.
    pub async fn write_many(
        &self,
        entries: &[(&str, Vec<u8>)],
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let stored = self
            .backend
            .set_many(entries, ttl)
            .await
            .map_err(|e| self.failed("write_many", e))?;

        if stored {
            for (key, value) in entries {
                self.table.update(key, StatDelta::stored(footprint_kib(value)));
                self.metrics.record_write(key);
            }
        }
        debug!("» write_many {} keys -> {}", entries.len(), stored);

        Ok(stored)
    }

    /// Remove several keys in one backend call.
    ///
    /// Success is batch-level. On success every key that already has an entry
    /// is marked cold; keys never seen before get no entry.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged; no statistics are recorded.
    pub async fn remove_many(&self, keys: &[&str]) -> Result<bool> {
        let removed = self
            .backend
            .delete_many(keys)
            .await
            .map_err(|e| self.failed("remove_many", e))?;

        if removed {
            for key in keys {
                if self.table.update_existing(key, StatDelta::removed()) {
                    self.metrics.record_remove(key);
                }
            }
        }
        debug!("» remove_many {} keys -> {}", keys.len(), removed);

        Ok(removed)
    }

    /// Rendered copy of the whole statistics table.
    pub fn snapshot(&self) -> Snapshot {
        self.table.snapshot()
    }

    /// Copy of the raw statistics for one key.
    pub fn entry(&self, key: &str) -> Option<StatEntry> {
        self.table.get(key)
    }

    /// Number of keys ever touched.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Get backend reference (for advanced use).
    ///
    /// Calls made directly on the backend are not tracked.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn failed(&self, operation: &str, error: Error) -> Error {
        warn!("✗ Backend {} failed: {}", operation, error);
        self.metrics.record_error(operation, &error.to_string());
        error
    }
}
