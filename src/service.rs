//! Reporting service for web applications.
//!
//! Provides a convenient wrapper around `StatsTrackingCache` with Arc for easy
//! sharing between the application's cache users and the admin endpoints.

use crate::backend::CacheBackend;
use crate::error::Result;
use crate::stats::{Snapshot, StatView};
use crate::tracking::StatsTrackingCache;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Outcome of an administrative eviction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictOutcome {
    /// The backend held the key and removed it.
    Evicted,
    /// The backend had nothing stored under the key.
    NotFound,
}

/// Current statistics table, ready for display.
///
/// Serializes as a JSON object keyed by cache key. `Display` renders a
/// fixed-width text table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Report {
    entries: Snapshot,
}

impl Report {
    pub fn entries(&self) -> &Snapshot {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&StatView> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_inner(self) -> Snapshot {
        self.entries
    }
}

impl From<Snapshot> for Report {
    fn from(entries: Snapshot) -> Self {
        Report { entries }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key_width = self
            .entries
            .keys()
            .map(|key| key.chars().count())
            .max()
            .unwrap_or(0)
            .max(3);

        writeln!(
            f,
            "{:<kw$}  {:<4}  {:>8}  {:>8}  {:>12}  {:>14}",
            "key",
            "hot",
            "hits",
            "misses",
            "size (KiB)",
            "latency (ms)",
            kw = key_width
        )?;
        for (key, view) in &self.entries {
            writeln!(
                f,
                "{:<kw$}  {:<4}  {:>8}  {:>8}  {:>12}  {:>14}",
                key,
                if view.hot { "hot" } else { "cold" },
                view.hit,
                view.miss,
                view.size,
                view.access_time,
                kw = key_width
            )?;
        }
        Ok(())
    }
}

/// Read/administer surface over a shared [`StatsTrackingCache`].
///
/// Cloning is cheap: every clone shares the same proxy and therefore the same
/// statistics table.
///
/// # Example
///
/// ```ignore
/// use cache_stats::{StatsService, backend::InMemoryBackend};
///
/// let stats = StatsService::new(InMemoryBackend::new());
///
/// // Application code caches through the shared proxy
/// stats.cache().write("user:1", bytes, None).await?;
///
/// // Admin code reads the report
/// println!("{}", stats.render_report());
/// ```
#[derive(Clone)]
pub struct StatsService<B: CacheBackend> {
    cache: Arc<StatsTrackingCache<B>>,
}

impl<B: CacheBackend> StatsService<B> {
    /// Create a new service wrapping `backend` in a fresh proxy.
    pub fn new(backend: B) -> Self {
        StatsService {
            cache: Arc::new(StatsTrackingCache::new(backend)),
        }
    }

    /// Create a service over a proxy the application already shares.
    pub fn from_cache(cache: Arc<StatsTrackingCache<B>>) -> Self {
        StatsService { cache }
    }

    /// Current statistics, without further transformation.
    pub fn render_report(&self) -> Report {
        Report::from(self.cache.snapshot())
    }

    /// Remove `key` through the tracking proxy.
    ///
    /// A key the backend does not hold is reported as
    /// [`EvictOutcome::NotFound`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::BackendError` if the backend call fails.
    pub async fn evict_key(&self, key: &str) -> Result<EvictOutcome> {
        let outcome = if self.cache.remove(key).await? {
            EvictOutcome::Evicted
        } else {
            EvictOutcome::NotFound
        };

        info!("Evict {} -> {:?}", key, outcome);
        Ok(outcome)
    }

    /// Get a reference to the underlying proxy.
    pub fn cache(&self) -> &StatsTrackingCache<B> {
        &self.cache
    }

    /// Shared handle to the underlying proxy.
    pub fn shared_cache(&self) -> Arc<StatsTrackingCache<B>> {
        Arc::clone(&self.cache)
    }
}
