//! Redis cache backend implementation.

use super::{distinct_keys, CacheBackend};
use crate::error::{Error, Result};
use deadpool_redis::{
    redis::{self, AsyncCommands},
    Config as PoolConfig, Connection, Pool, Runtime,
};
use std::time::Duration;

/// Pool statistics information.
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub connections: u32,
    pub idle_connections: u32,
}

/// Default Redis connection pool size.
/// Override with REDIS_POOL_SIZE environment variable
const DEFAULT_POOL_SIZE: u32 = 16;

/// Configuration for Redis backend.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: u32,
    pub pool_size: u32,
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            host: "localhost".to_string(),
            port: 6379,
            username: None,
            password: None,
            database: 0,
            pool_size: DEFAULT_POOL_SIZE,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Build Redis connection string.
    pub fn connection_string(&self) -> String {
        if let Some(password) = &self.password {
            if let Some(username) = &self.username {
                format!(
                    "redis://{}:{}@{}:{}/{}",
                    username, password, self.host, self.port, self.database
                )
            } else {
                format!(
                    "redis://default:{}@{}:{}/{}",
                    password, self.host, self.port, self.database
                )
            }
        } else {
            format!("redis://{}:{}/{}", self.host, self.port, self.database)
        }
    }
}

/// Redis expiry is whole seconds; sub-second TTLs round up to one.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// Redis backend with connection pooling and async operations.
///
/// `add` maps to `SET .. NX`, bulk reads to `MGET`, bulk writes to an atomic
/// pipeline and bulk deletes to a single `DEL`.
///
/// # Example
///
/// ```no_run
/// # use cache_stats::backend::{RedisBackend, RedisConfig};
/// # use cache_stats::{Result, StatsTrackingCache};
/// # async fn example() -> Result<()> {
/// let backend = RedisBackend::new(RedisConfig::default()).await?;
/// let cache = StatsTrackingCache::new(backend);
///
/// cache.write("key", b"value".to_vec(), None).await?;
/// let value = cache.read("key").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
}

impl RedisBackend {
    /// Create new Redis backend from configuration.
    ///
    /// # Errors
    /// Returns `Err` if pool creation fails.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let pool = Self::create_pool(&config.connection_string(), config.pool_size)?;

        info!(
            "✓ Redis backend initialized: {}:{}",
            config.host, config.port
        );

        Ok(RedisBackend { pool })
    }

    /// Create from connection string directly.
    ///
    /// Pool size is determined by:
    /// 1. `REDIS_POOL_SIZE` environment variable (if set)
    /// 2. `DEFAULT_POOL_SIZE` constant (16)
    ///
    /// # Errors
    /// Returns `Err` if pool creation fails.
    pub async fn from_connection_string(conn_str: &str) -> Result<Self> {
        let pool_size = std::env::var("REDIS_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_POOL_SIZE);

        let pool = Self::create_pool(conn_str, pool_size)?;

        info!(
            "✓ Redis backend initialized from connection string (pool size: {})",
            pool_size
        );

        Ok(RedisBackend { pool })
    }

    fn create_pool(conn_str: &str, pool_size: u32) -> Result<Pool> {
        let mut cfg = PoolConfig::from_url(conn_str);
        cfg.pool = Some(deadpool_redis::PoolConfig::new(pool_size as usize));

        cfg.create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::BackendError(format!("Failed to create Redis pool: {}", e)))
    }

    /// Get current pool statistics.
    pub fn pool_stats(&self) -> PoolStats {
        let status = self.pool.status();
        PoolStats {
            connections: status.size as u32,
            idle_connections: status.available as u32,
        }
    }

    async fn connection(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::BackendError(format!("Failed to get Redis connection: {}", e)))
    }
}

impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;

        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| Error::BackendError(format!("Redis GET failed for key {}: {}", key, e)))?;

        if value.is_some() {
            debug!("✓ Redis GET {} -> HIT", key);
        } else {
            debug!("✓ Redis GET {} -> MISS", key);
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool> {
        let mut conn = self.connection().await?;

        match ttl {
            Some(duration) => {
                let seconds = ttl_seconds(duration);
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(|e| {
                        Error::BackendError(format!("Redis SET_EX failed for key {}: {}", key, e))
                    })?;
                debug!("✓ Redis SET {} (TTL: {}s)", key, seconds);
            }
            None => {
                conn.set::<_, _, ()>(key, value).await.map_err(|e| {
                    Error::BackendError(format!("Redis SET failed for key {}: {}", key, e))
                })?;
                debug!("✓ Redis SET {}", key);
            }
        }

        Ok(true)
    }

    async fn add(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool> {
        let mut conn = self.connection().await?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX");
        if let Some(duration) = ttl {
            cmd.arg("EX").arg(ttl_seconds(duration));
        }

        // OK when stored, nil when the key already exists
        let reply: Option<String> = cmd.query_async(&mut *conn).await.map_err(|e| {
            Error::BackendError(format!("Redis SET NX failed for key {}: {}", key, e))
        })?;

        let added = reply.is_some();
        debug!("✓ Redis ADD {} -> {}", key, if added { "STORED" } else { "EXISTS" });
        Ok(added)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;

        let removed: usize = conn
            .del(key)
            .await
            .map_err(|e| Error::BackendError(format!("Redis DEL failed for key {}: {}", key, e)))?;

        debug!("✓ Redis DELETE {} ({} removed)", key, removed);
        Ok(removed > 0)
    }

    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection().await?;

        // Explicit MGET: a one-element GET reply would not decode as a list
        let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::BackendError(format!("Redis MGET failed: {}", e)))?;

        debug!("✓ Redis MGET {} keys", keys.len());
        Ok(values)
    }

    async fn set_many(&self, entries: &[(&str, Vec<u8>)], ttl: Option<Duration>) -> Result<bool> {
        if entries.is_empty() {
            return Ok(true);
        }

        let mut conn = self.connection().await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            let queued = match ttl {
                Some(duration) => pipe.set_ex(*key, value.as_slice(), ttl_seconds(duration)),
                None => pipe.set(*key, value.as_slice()),
            };
            queued.ignore();
        }

        pipe.query_async::<()>(&mut *conn)
            .await
            .map_err(|e| Error::BackendError(format!("Redis MSET pipeline failed: {}", e)))?;

        debug!("✓ Redis MSET {} keys", entries.len());
        Ok(true)
    }

    async fn delete_many(&self, keys: &[&str]) -> Result<bool> {
        if keys.is_empty() {
            return Ok(true);
        }

        // DEL counts a repeated key once
        let keys = distinct_keys(keys);
        let mut conn = self.connection().await?;

        let removed: usize = conn
            .del(&keys)
            .await
            .map_err(|e| Error::BackendError(format!("Redis DEL (bulk) failed: {}", e)))?;

        debug!("✓ Redis MDELETE {}/{} keys", removed, keys.len());
        Ok(removed == keys.len())
    }

    async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection().await?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::BackendError(format!("Redis PING failed: {}", e)))?;

        Ok(pong.contains("PONG"))
    }
}
