//! Administrative HTTP surface (axum).
//!
//! Mounts two routes under a configurable prefix:
//!
//! - `GET <prefix>` renders the statistics report, as a text table or, when the
//!   `Accept` header asks for `application/json`, as a JSON object.
//! - `DELETE <prefix>/{*key}` evicts a key, which may itself contain `/`.
//!   Registered only when [`AdminConfig::enable_clear_api`] is set, and
//!   guarded by the host's [`AuthGuard`] when [`AdminConfig::protect_api`]
//!   is set.
//!
//! # Example
//!
//! ```ignore
//! use cache_stats::admin::{router, AdminConfig, BearerTokenGuard};
//! use std::sync::Arc;
//!
//! let config = AdminConfig::default().with_clear_api(true);
//! let admin = router(stats.clone(), &config, Arc::new(BearerTokenGuard::new("s3cret")))?;
//! let app = axum::Router::new().merge(admin);
//! ```

use crate::backend::CacheBackend;
use crate::error::{Error, Result};
use crate::service::{EvictOutcome, StatsService};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Default mount point of the admin routes.
pub const DEFAULT_URL_PREFIX: &str = "/cache_stats";

/// Configuration for the admin routes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminConfig {
    /// Mount point, e.g. `/cache_stats`.
    pub url_prefix: String,
    /// Register `DELETE <prefix>/{*key}`.
    pub enable_clear_api: bool,
    /// Require the [`AuthGuard`] to accept the request before evicting.
    pub protect_api: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        AdminConfig {
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            enable_clear_api: false,
            protect_api: true,
        }
    }
}

impl AdminConfig {
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    pub fn with_clear_api(mut self, enabled: bool) -> Self {
        self.enable_clear_api = enabled;
        self
    }

    pub fn with_protection(mut self, protect: bool) -> Self {
        self.protect_api = protect;
        self
    }

    /// Build from `CACHE_STATS_URL_PREFIX`, `CACHE_STATS_ENABLE_CLEAR_API` and
    /// `CACHE_STATS_PROTECT_API`, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for unparsable booleans or an invalid prefix.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = AdminConfig::default();

        if let Some(prefix) = lookup("CACHE_STATS_URL_PREFIX") {
            config.url_prefix = prefix;
        }
        if let Some(value) = lookup("CACHE_STATS_ENABLE_CLEAR_API") {
            config.enable_clear_api = parse_flag("CACHE_STATS_ENABLE_CLEAR_API", &value)?;
        }
        if let Some(value) = lookup("CACHE_STATS_PROTECT_API") {
            config.protect_api = parse_flag("CACHE_STATS_PROTECT_API", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the prefix can be mounted.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the prefix does not start with `/`,
    /// ends with `/`, or contains route-capture braces.
    pub fn validate(&self) -> Result<()> {
        let prefix = &self.url_prefix;
        if !prefix.starts_with('/') {
            return Err(Error::ConfigError(format!(
                "URL prefix must start with '/': {}",
                prefix
            )));
        }
        if prefix.len() > 1 && prefix.ends_with('/') {
            return Err(Error::ConfigError(format!(
                "URL prefix must not end with '/': {}",
                prefix
            )));
        }
        if prefix.contains(['{', '}']) {
            return Err(Error::ConfigError(format!(
                "URL prefix must not contain route captures: {}",
                prefix
            )));
        }
        Ok(())
    }

    fn clear_route(&self) -> String {
        if self.url_prefix == "/" {
            "/{*key}".to_string()
        } else {
            format!("{}/{{*key}}", self.url_prefix)
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::ConfigError(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

/// Authentication check supplied by the host application.
pub trait AuthGuard: Send + Sync {
    /// Return `true` if the request may evict keys.
    fn is_authenticated(&self, headers: &HeaderMap) -> bool;
}

impl<F> AuthGuard for F
where
    F: Fn(&HeaderMap) -> bool + Send + Sync,
{
    fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        self(headers)
    }
}

/// Accepts requests carrying `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct BearerTokenGuard {
    token: String,
}

impl BearerTokenGuard {
    pub fn new(token: impl Into<String>) -> Self {
        BearerTokenGuard {
            token: token.into(),
        }
    }
}

impl AuthGuard for BearerTokenGuard {
    fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| token == self.token)
    }
}

/// Rejects every request.
#[derive(Clone, Copy, Default)]
pub struct DenyAll;

impl AuthGuard for DenyAll {
    fn is_authenticated(&self, _headers: &HeaderMap) -> bool {
        false
    }
}

struct AdminState<B: CacheBackend> {
    service: StatsService<B>,
    guard: Arc<dyn AuthGuard>,
    protect_api: bool,
}

impl<B: CacheBackend> Clone for AdminState<B> {
    fn clone(&self) -> Self {
        AdminState {
            service: self.service.clone(),
            guard: Arc::clone(&self.guard),
            protect_api: self.protect_api,
        }
    }
}

/// Build the admin routes for `service`.
///
/// The returned router has its state applied and can be merged or nested into
/// the host application's router.
///
/// # Errors
///
/// Returns `Error::ConfigError` if `config` fails [`AdminConfig::validate`].
pub fn router<B>(
    service: StatsService<B>,
    config: &AdminConfig,
    guard: Arc<dyn AuthGuard>,
) -> Result<Router>
where
    B: CacheBackend + 'static,
{
    config.validate()?;

    let state = AdminState {
        service,
        guard,
        protect_api: config.protect_api,
    };

    let mut routes = Router::new().route(&config.url_prefix, get(stats_view::<B>));
    if config.enable_clear_api {
        routes = routes.route(&config.clear_route(), delete(clear_key::<B>));
        info!(
            "✓ Cache stats admin mounted at {} (clear API enabled, protected: {})",
            config.url_prefix, config.protect_api
        );
    } else {
        info!("✓ Cache stats admin mounted at {}", config.url_prefix);
    }

    Ok(routes.with_state(state))
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

async fn stats_view<B: CacheBackend + 'static>(
    State(state): State<AdminState<B>>,
    headers: HeaderMap,
) -> Response {
    let report = state.service.render_report();
    if wants_json(&headers) {
        Json(report).into_response()
    } else {
        report.to_string().into_response()
    }
}

async fn clear_key<B: CacheBackend + 'static>(
    State(state): State<AdminState<B>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    if state.protect_api && !state.guard.is_authenticated(&headers) {
        warn!("Rejected unauthenticated eviction of {}", key);
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"status": "unauthorized"})),
        )
            .into_response();
    }

    match state.service.evict_key(&key).await {
        Ok(EvictOutcome::Evicted) => {
            (StatusCode::OK, Json(json!({"status": "success"}))).into_response()
        }
        Ok(EvictOutcome::NotFound) => {
            (StatusCode::NOT_FOUND, Json(json!({"status": "not_found"}))).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": "error", "message": e.to_string()})),
        )
            .into_response(),
    }
}
