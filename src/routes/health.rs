use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Root endpoint - basic status
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "M3U Catalog Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "runtime": "rust"
    }))
}

/// Cache stats
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheStats {
    snapshot: bool,
    size_mb: f64,
}

/// Health check response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    environment: String,
    uptime: u64,
    loaded: bool,
    items: usize,
    index_ready: bool,
    cache: CacheStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// GET /health - catalog and cache state
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    let snapshot = state.store.snapshot().await;
    let last_error = state.store.last_error().await;
    let index_ready = state.store.index_ready().await;

    let cache_size = state.cache.cache_size().await.unwrap_or(0);
    let cache_size_mb = cache_size as f64 / 1024.0 / 1024.0;
    let has_snapshot = state.cache.has_snapshot().await;

    // loading until the first snapshot commits; degraded once a load failed
    let status = if snapshot.is_some() {
        "ok"
    } else if last_error.is_some() {
        "degraded"
    } else {
        "loading"
    };

    let health = HealthResponse {
        status: status.to_string(),
        environment: state.config.environment.clone(),
        uptime,
        loaded: snapshot.is_some(),
        items: snapshot.as_ref().map(|s| s.items.len()).unwrap_or(0),
        index_ready,
        cache: CacheStats {
            snapshot: has_snapshot,
            size_mb: (cache_size_mb * 100.0).round() / 100.0,
        },
        error: last_error,
    };

    Json(health)
}

/// GET /metrics - Prometheus metrics
pub async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                b"Internal Server Error".to_vec(),
            )
        }
    }
}

/// Liveness probe
pub async fn live() -> impl IntoResponse {
    (StatusCode::OK, "alive")
}
