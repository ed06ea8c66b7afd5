//! Postcard encoding with versioned envelopes for memoized values.
//!
//! Memoized views store their results through the tracking proxy as opaque
//! bytes. Each value is wrapped in an envelope so that a key written by an
//! older build, or by something other than the memoizer, is recognised and
//! recomputed instead of being decoded into the wrong type.
//!
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (u32)    │POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "CSTM"              varint             postcard::to_allocvec(T)
//! ```

use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Magic header for memoized entries: b"CSTM"
pub const MEMO_MAGIC: [u8; 4] = *b"CSTM";

/// Current schema version.
///
/// **CRITICAL:** Increment when the layout of memoized types changes.
/// Entries with another version are treated as misses and rewritten.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Envelope<T> {
    magic: [u8; 4],
    version: u32,
    payload: T,
}

/// Encode a value for storage.
///
/// # Errors
///
/// Returns `Error::SerializationError` if Postcard serialization fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let envelope = Envelope {
        magic: MEMO_MAGIC,
        version: CURRENT_SCHEMA_VERSION,
        payload: value,
    };
    postcard::to_allocvec(&envelope).map_err(|e| {
        error!("Memoized value serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Decode a stored value, validating magic and version first.
///
/// # Errors
///
/// - `Error::InvalidCacheEntry`: wrong magic header
/// - `Error::VersionMismatch`: written by another schema version
/// - `Error::DeserializationError`: corrupted or foreign payload
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let ((magic, version), _) = postcard::take_from_bytes::<([u8; 4], u32)>(bytes)
        .map_err(|e| Error::DeserializationError(e.to_string()))?;

    if magic != MEMO_MAGIC {
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            MEMO_MAGIC, magic
        )));
    }

    if version != CURRENT_SCHEMA_VERSION {
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: version,
        });
    }

    let envelope: Envelope<T> = postcard::from_bytes(bytes)
        .map_err(|e| Error::DeserializationError(e.to_string()))?;
    Ok(envelope.payload)
}
