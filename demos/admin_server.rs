use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use cache_stats::admin::{self, AdminConfig, BearerTokenGuard};
use cache_stats::{backend::InMemoryBackend, Memoizer, StatsService};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Article rendered by the memoized view
#[derive(Clone, Serialize, Deserialize, Debug)]
struct Article {
    slug: String,
    title: String,
    body: String,
}

/// Simulate a slow database lookup
async fn load_article(slug: &str) -> Option<Article> {
    tokio::time::sleep(Duration::from_millis(50)).await;

    match slug {
        "hello" => Some(Article {
            slug: slug.to_string(),
            title: "Hello".to_string(),
            body: "First post".to_string(),
        }),
        "caching" => Some(Article {
            slug: slug.to_string(),
            title: "On caching".to_string(),
            body: "Measure before you tune".to_string(),
        }),
        _ => None,
    }
}

/// Application state
#[derive(Clone)]
struct AppState {
    articles: Memoizer<InMemoryBackend>,
}

/// Article view, memoized under `view//articles/<slug>`
async fn get_article(Path(slug): Path<String>, State(state): State<AppState>) -> Response {
    let path = format!("/articles/{}", slug);

    match state
        .articles
        .get_or_compute(&path, || load_article(&slug))
        .await
    {
        Ok(Some(article)) => (StatusCode::OK, Json(article)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Article not found"})),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Cache error: {}", e)})),
        )
            .into_response(),
    }
}

/// Health check endpoint
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "cache-stats-admin-example"
    }))
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .ok();

    let stats = StatsService::new(InMemoryBackend::new());
    let articles = Memoizer::new(stats.shared_cache()).with_timeout(Duration::from_secs(30));

    // CACHE_STATS_* variables override the defaults; eviction is on for the demo
    let config = AdminConfig::from_env()
        .expect("Invalid CACHE_STATS_* configuration")
        .with_clear_api(true);
    let token = std::env::var("CACHE_STATS_TOKEN").unwrap_or_else(|_| "changeme".to_string());

    let admin_routes = admin::router(stats, &config, Arc::new(BearerTokenGuard::new(token)))
        .expect("Failed to build admin routes");

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/articles/{slug}", get(get_article))
        .with_state(AppState { articles })
        .merge(admin_routes);

    // Start server
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .expect("Failed to bind port 3000");

    println!("Server running on http://127.0.0.1:3000");
    println!("Article: http://127.0.0.1:3000/articles/hello");
    println!("Stats report: http://127.0.0.1:3000{}", config.url_prefix);
    println!(
        "Evict: curl -X DELETE -H 'Authorization: Bearer <token>' http://127.0.0.1:3000{}/view//articles/hello",
        config.url_prefix
    );

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
