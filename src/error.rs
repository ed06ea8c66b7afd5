//! Error types for the statistics proxy and its collaborators.

use std::fmt;

/// Result type for cache-stats operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache-stats.
///
/// A missing key is never an error here: reads return `Ok(None)` and
/// deletions return `Ok(false)`. Errors are reserved for failures of the
/// backend itself, of value encoding, and of configuration.
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend storage error (Redis, in-memory test doubles, etc).
    ///
    /// The wrapped cache call failed. The proxy returns this to the caller
    /// unchanged and records no statistics for the attempt.
    /// Common causes:
    /// - Redis connection lost or pool exhausted
    /// - Network timeout
    /// - Backend protocol error
    ///
    /// **Recovery:** Retry at the call site or fall back to computing the value.
    BackendError(String),

    /// Serialization failed when encoding a memoized value.
    SerializationError(String),

    /// Deserialization failed when decoding a memoized value.
    ///
    /// **Recovery:** The memoizer treats the entry as a miss and rewrites it.
    DeserializationError(String),

    /// Memoized entry does not carry the expected magic header.
    InvalidCacheEntry(String),

    /// Memoized entry was written with a different schema version.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from cached entry)
        found: u32,
    },

    /// Configuration error (bad URL prefix, missing Redis host, etc).
    ///
    /// **Recovery:** Fix configuration and restart.
    ConfigError(String),

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// True when the error came from the wrapped cache backend.
    pub fn is_backend(&self) -> bool {
        matches!(self, Error::BackendError(_))
    }
}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::BackendError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::BackendError(format!("Redis error: {}", e))
    }
}
