//! Metrics hooks for intercepted cache operations.
//!
//! The per-key statistics table is always maintained by
//! [`StatsTrackingCache`](crate::StatsTrackingCache). The `CacheMetrics` trait is
//! an additional hook for forwarding the same events to an external monitoring
//! system (Prometheus, StatsD, ...):
//!
//! ```ignore
//! use cache_stats::observability::CacheMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _key: &str, _duration: Duration) {
//!         // counter!("cache_hits").inc();
//!         // histogram!("cache_latency").record(duration);
//!     }
//!     // ... implement other methods
//! }
//!
//! // let cache = StatsTrackingCache::new(backend)
//! //     .with_metrics(Box::new(PrometheusMetrics));
//! ```
//!
//! Methods not overridden fall back to `debug!`/`warn!` lines through the `log`
//! crate. The proxy installs [`NoOpMetrics`] unless told otherwise.
//!
//! # Events
//!
//! - `record_hit()` / `record_miss()` - single-key reads, with backend latency
//! - `record_write()` - successful `write`, `add_if_absent` and `write_many` keys
//! - `record_remove()` - successful `remove` and `remove_many` keys
//! - `record_error()` - backend failure, with the operation name

use std::time::Duration;

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a cache hit.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a cache miss.
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a stored value.
    fn record_write(&self, key: &str) {
        debug!("Cache WRITE: {}", key);
    }

    /// Record a removed value.
    fn record_remove(&self, key: &str) {
        debug!("Cache REMOVE: {}", key);
    }

    /// Record a backend failure.
    fn record_error(&self, operation: &str, error: &str) {
        warn!("Cache ERROR during {}: {}", operation, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_write(&self, _key: &str) {}
    fn record_remove(&self, _key: &str) {}
    fn record_error(&self, _operation: &str, _error: &str) {}
}

/// Metrics implementation that only logs, using the trait defaults.
#[derive(Clone, Default)]
pub struct LogMetrics;

impl CacheMetrics for LogMetrics {}
