//! Read-through memoization of computed views.
//!
//! A [`Memoizer`] caches the result of an async computation under a key
//! derived from the request path. Reads and writes go through the
//! [`StatsTrackingCache`], so memoized views show up in the statistics report
//! like any other key. If the backend fails, the value is computed directly
//! and the failure is logged, unless the memoizer is told to propagate errors.
//!
//! # Example
//!
//! ```ignore
//! use cache_stats::memoize::Memoizer;
//! use std::time::Duration;
//!
//! let memo = Memoizer::new(stats.shared_cache())
//!     .with_key_prefix("page/%s")
//!     .with_timeout(Duration::from_secs(60));
//!
//! let html: String = memo.get_or_compute("/about", || render_about()).await?;
//! ```

use crate::backend::CacheBackend;
use crate::error::{Error, Result};
use crate::key::KeyPrefix;
use crate::serialization;
use crate::tracking::StatsTrackingCache;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

type BypassFn = dyn Fn() -> bool + Send + Sync;

/// Memoizes computations through a shared tracking proxy.
pub struct Memoizer<B: CacheBackend> {
    cache: Arc<StatsTrackingCache<B>>,
    key_prefix: KeyPrefix,
    timeout: Option<Duration>,
    unless: Option<Arc<BypassFn>>,
    propagate_errors: bool,
}

impl<B: CacheBackend> Clone for Memoizer<B> {
    fn clone(&self) -> Self {
        Memoizer {
            cache: Arc::clone(&self.cache),
            key_prefix: self.key_prefix.clone(),
            timeout: self.timeout,
            unless: self.unless.clone(),
            propagate_errors: self.propagate_errors,
        }
    }
}

impl<B: CacheBackend> Memoizer<B> {
    /// Memoize with the default `view/%s` key template and no timeout.
    pub fn new(cache: Arc<StatsTrackingCache<B>>) -> Self {
        Memoizer {
            cache,
            key_prefix: KeyPrefix::default(),
            timeout: None,
            unless: None,
            propagate_errors: false,
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<KeyPrefix>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// TTL passed to the backend when a computed value is stored.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Skip the cache entirely whenever `predicate` returns `true`.
    pub fn with_unless<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.unless = Some(Arc::new(predicate));
        self
    }

    /// Return backend and encoding errors instead of falling back to the
    /// computation. Useful in development builds.
    pub fn with_propagate_errors(mut self, propagate: bool) -> Self {
        self.propagate_errors = propagate;
        self
    }

    /// Cache key used for a request to `path`.
    pub fn make_cache_key(&self, path: &str) -> String {
        self.key_prefix.resolve(path)
    }

    /// Return the memoized value for `path`, computing and storing it on a miss.
    ///
    /// A stored value that cannot be decoded as `T` is treated as a miss and
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Only when `propagate_errors` is set: the backend's error, or
    /// `Error::SerializationError` if the computed value cannot be encoded.
    pub async fn get_or_compute<T, F, Fut>(&self, path: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if self.unless.as_ref().is_some_and(|unless| unless()) {
            debug!("Memoization bypassed for {}", path);
            return Ok(compute().await);
        }

        let cache_key = self.make_cache_key(path);

        match self.cache.read(&cache_key).await {
            Ok(Some(bytes)) => match serialization::decode::<T>(&bytes) {
                Ok(value) => return Ok(value),
                Err(e) => warn!("Discarding memoized value for {}: {}", cache_key, e),
            },
            Ok(None) => {}
            Err(e) => {
                self.tolerate(&cache_key, e)?;
                return Ok(compute().await);
            }
        }

        let value = compute().await;
        let stored = match serialization::encode(&value) {
            Ok(bytes) => self.cache.write(&cache_key, bytes, self.timeout).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            self.tolerate(&cache_key, e)?;
        }

        Ok(value)
    }

    fn tolerate(&self, cache_key: &str, error: Error) -> Result<()> {
        if self.propagate_errors {
            return Err(error);
        }
        error!(
            "Memoization of {} failed, serving computed value: {}",
            cache_key, error
        );
        Ok(())
    }
}
