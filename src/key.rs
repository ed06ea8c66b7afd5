//! Cache key construction for memoized views.

use std::fmt;
use std::sync::Arc;

/// Placeholder replaced by the request path in a [`KeyPrefix::Template`].
pub const PATH_PLACEHOLDER: &str = "%s";

/// Type alias for key generator function.
type KeyGeneratorFn = dyn Fn() -> String + Send + Sync;

/// How a memoized view derives its cache key.
#[derive(Clone)]
pub enum KeyPrefix {
    /// The first `%s` is replaced by the request path, e.g. `view/%s`.
    Template(String),
    /// The same key for every request.
    Fixed(String),
    /// Key computed by the host on every call.
    Generator(Arc<KeyGeneratorFn>),
}

impl KeyPrefix {
    /// Wrap a key generator closure.
    pub fn generator<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        KeyPrefix::Generator(Arc::new(f))
    }

    /// Build the cache key for a request to `path`.
    pub fn resolve(&self, path: &str) -> String {
        match self {
            KeyPrefix::Template(template) => template.replacen(PATH_PLACEHOLDER, path, 1),
            KeyPrefix::Fixed(key) => key.clone(),
            KeyPrefix::Generator(generate) => generate(),
        }
    }
}

impl Default for KeyPrefix {
    fn default() -> Self {
        KeyPrefix::Template("view/%s".to_string())
    }
}

impl From<&str> for KeyPrefix {
    fn from(prefix: &str) -> Self {
        if prefix.contains(PATH_PLACEHOLDER) {
            KeyPrefix::Template(prefix.to_string())
        } else {
            KeyPrefix::Fixed(prefix.to_string())
        }
    }
}

impl From<String> for KeyPrefix {
    fn from(prefix: String) -> Self {
        KeyPrefix::from(prefix.as_str())
    }
}

impl fmt::Debug for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPrefix::Template(t) => f.debug_tuple("Template").field(t).finish(),
            KeyPrefix::Fixed(k) => f.debug_tuple("Fixed").field(k).finish(),
            KeyPrefix::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}
