//! # cache-stats
//!
//! Per-key usage statistics for an existing key-value cache client.
//!
//! ## Features
//!
//! - **Transparent Proxy:** Same operations, same results, same backend side effects
//! - **Per-Key Statistics:** Hot/cold, hits, misses, last payload size, last read latency
//! - **Backend Agnostic:** In-memory, Redis, or any custom [`CacheBackend`]
//! - **Concurrency Safe:** Sharded statistics table with per-key atomic updates
//! - **Admin Surface:** Optional axum routes to view the report and evict keys
//! - **Memoized Views:** Read-through helper whose keys show up in the report
//!
//! ## Quick Start
//!
//! ```ignore
//! use cache_stats::{StatsService, backend::InMemoryBackend};
//! use cache_stats::admin::{router, AdminConfig, BearerTokenGuard};
//! use std::sync::Arc;
//!
//! // 1. Wrap the backend (CacheService-style: Clone shares one proxy)
//! let stats = StatsService::new(InMemoryBackend::new());
//!
//! // 2. Cache through the proxy
//! let cache = stats.cache();
//! cache.write("user:1", b"alice".to_vec(), None).await?;
//! cache.read("user:1").await?;
//! cache.read("user:2").await?;
//!
//! // 3. Inspect
//! let report = stats.render_report();
//! assert!(report.get("user:1").unwrap().hot);
//! assert_eq!(report.get("user:2").unwrap().miss, 1);
//!
//! // 4. Or expose it over HTTP
//! let config = AdminConfig::default().with_clear_api(true);
//! let app = router(stats.clone(), &config, Arc::new(BearerTokenGuard::new("s3cret")))?;
//! ```

#[macro_use]
extern crate log;

#[cfg(feature = "admin")]
pub mod admin;
pub mod backend;
pub mod error;
pub mod key;
pub mod memoize;
pub mod observability;
pub mod serialization;
pub mod service;
pub mod stats;
pub mod tracking;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use error::{Error, Result};
pub use memoize::Memoizer;
pub use service::{EvictOutcome, Report, StatsService};
pub use stats::{Snapshot, StatEntry, StatView};
pub use tracking::{BulkSizeAccounting, StatsTrackingCache};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
