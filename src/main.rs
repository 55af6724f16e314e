mod config;
mod errors;
mod models;
mod routes;
mod services;

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::{
    cache::CatalogCache,
    catalog::CatalogStore,
    classifier::Curation,
    cleanup::{start_cleanup_task, CleanupConfig},
    enrichment::EnrichmentService,
    source::PlaylistSource,
};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub store: Arc<CatalogStore>,
    pub cache: CatalogCache,
    pub enrichment: EnrichmentService,
    pub start_time: Instant,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "m3u_catalog_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env();
    let port = config.port;

    tracing::info!("Starting M3U Catalog Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.environment);

    // Disk snapshot cache, keyed by the playlist source identity
    let cache = CatalogCache::new(&config.cache_dir, config.cache_ttl_ms, &config.playlist_url)
        .await?;
    tracing::info!("Snapshot cache initialized: {}", config.cache_dir);

    // Playlist source resolution chain
    let source = PlaylistSource::new(&config)?;

    // Curation signals for the deterministic isNew/isFeatured flags
    let curation = Curation::from_config(&config);

    // Catalog store: the query façade owning all derived structures
    let store = Arc::new(CatalogStore::new(
        source,
        cache.clone(),
        curation,
        &config,
    ));
    tracing::info!("Catalog store initialized");

    // Kick off the initial pipeline run in the background; the HTTP surface
    // reports "loading" until the first snapshot commits
    tokio::spawn(store.clone().initial_load());

    // Start cleanup task (runs in background)
    let cleanup_cache = cache.clone();
    tokio::spawn(start_cleanup_task(
        cleanup_cache,
        CleanupConfig {
            interval_secs: config.cleanup_interval_secs,
        },
    ));
    tracing::info!("Cleanup task started");

    // Metadata enrichment client (disabled without an API key)
    let enrichment = EnrichmentService::new(&config)?;
    if enrichment.enabled() {
        tracing::info!("Metadata enrichment enabled: {}", config.enrichment_base_url);
    }

    // Build application state
    let state = Arc::new(AppState {
        config,
        store,
        cache,
        enrichment,
        start_time: Instant::now(),
    });

    // Build router
    let app = Router::new()
        // Health endpoints
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .route("/live", get(routes::health::live))
        // Catalog endpoints
        .route("/api/catalog", get(routes::catalog::get_catalog))
        .route("/api/catalog/items", get(routes::catalog::get_items))
        .route(
            "/api/catalog/categories",
            get(routes::catalog::get_categories),
        )
        .route("/api/catalog/genres", get(routes::catalog::get_genres))
        .route("/api/catalog/featured", get(routes::catalog::get_featured))
        .route("/api/catalog/by-genre", get(routes::catalog::get_by_genre))
        .route("/api/catalog/search", get(routes::catalog::search_items))
        .route("/api/catalog/item/:id", get(routes::catalog::get_item))
        .route(
            "/api/catalog/series/:series_id/episodes",
            get(routes::catalog::get_series_episodes),
        )
        .route(
            "/api/catalog/refresh",
            post(routes::catalog::refresh_catalog),
        )
        .route("/api/catalog/cache", delete(routes::catalog::clear_cache))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
