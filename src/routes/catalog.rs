use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::CatalogError;
use crate::models::{CategoriesResponse, GenresResponse, ItemsQuery, ItemsResponse, MediaType};
use crate::services::catalog::{self, CatalogSnapshot, SearchOutcome};
use crate::services::series;
use crate::AppState;

type HandlerError = (StatusCode, Json<serde_json::Value>);

/// No committed snapshot yet: loading (retryable) or failed (retryable too)
async fn snapshot_or_unavailable(state: &AppState) -> Result<Arc<CatalogSnapshot>, HandlerError> {
    if let Some(snapshot) = state.store.snapshot().await {
        return Ok(snapshot);
    }

    let message = match state.store.last_error().await {
        Some(error) => error,
        None => CatalogError::NotLoaded.to_string(),
    };
    Err((
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "error": message, "retryable": true })),
    ))
}

/// GET /api/catalog - load state and stats
pub async fn get_catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.snapshot().await {
        Some(snapshot) => Json(serde_json::json!({
            "status": "ok",
            "generation": snapshot.generation,
            "loadedAt": snapshot.loaded_at,
            "indexReady": state.store.index_ready().await,
            "stats": snapshot.stats,
        })),
        None => {
            let error = state.store.last_error().await;
            Json(serde_json::json!({
                "status": if error.is_some() { "error" } else { "loading" },
                "error": error,
            }))
        }
    }
}

/// GET /api/catalog/items - paginated catalog view, filterable by type,
/// group, and genre
pub async fn get_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemsQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let snapshot = snapshot_or_unavailable(&state).await?;

    // the category-consistency pass is authoritative for type filters
    let base: Vec<_> = match query.media_type.as_deref().and_then(MediaType::from_str_opt) {
        Some(MediaType::Movie) => snapshot.content_by_type.movies.clone(),
        Some(MediaType::Series) => snapshot.content_by_type.series.clone(),
        Some(MediaType::Channel) => snapshot.content_by_type.channels.clone(),
        None => snapshot.items.clone(),
    };

    let filtered: Vec<_> = base
        .into_iter()
        .filter(|item| {
            query
                .group
                .as_deref()
                .map(|g| item.group.eq_ignore_ascii_case(g))
                .unwrap_or(true)
                && query
                    .genre
                    .as_deref()
                    .map(|g| item.genre.eq_ignore_ascii_case(g))
                    .unwrap_or(true)
        })
        .collect();

    let per_page = query.per_page.unwrap_or_else(|| state.store.page_size());
    let total = filtered.len();
    let total_pages = catalog::total_pages(total, per_page);
    let items = catalog::paginate(&filtered, query.page, per_page);
    let has_more = query.page < total_pages;

    Ok(Json(ItemsResponse {
        items,
        total,
        page: query.page,
        per_page,
        total_pages,
        has_more,
    }))
}

/// GET /api/catalog/categories
pub async fn get_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let snapshot = snapshot_or_unavailable(&state).await?;
    Ok(Json(CategoriesResponse {
        total: snapshot.categories.len(),
        categories: snapshot.categories.clone(),
    }))
}

/// GET /api/catalog/genres
pub async fn get_genres(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let snapshot = snapshot_or_unavailable(&state).await?;
    Ok(Json(GenresResponse {
        total: snapshot.genres.len(),
        genres: snapshot.genres.clone(),
    }))
}

/// GET /api/catalog/featured - homepage rails
pub async fn get_featured(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let snapshot = snapshot_or_unavailable(&state).await?;
    Ok(Json(snapshot.featured.clone()))
}

/// GET /api/catalog/by-genre - type → genre → items drill-down
pub async fn get_by_genre(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let snapshot = snapshot_or_unavailable(&state).await?;
    Ok(Json(snapshot.content_by_genre.clone()))
}

/// Query params for search
#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// GET /api/catalog/search - debounced search; superseded requests answer
/// 204 so stale results never land
pub async fn search_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, HandlerError> {
    if query.q.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Parâmetro 'q' é obrigatório" })),
        ));
    }

    snapshot_or_unavailable(&state).await?;

    match state.store.search_debounced(&query.q).await {
        SearchOutcome::Results(items) => {
            let total = items.len();
            Ok(Json(serde_json::json!({
                "items": items,
                "total": total,
                "query": query.q,
            }))
            .into_response())
        }
        SearchOutcome::Superseded => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Query params for the detail lookup
#[derive(Deserialize)]
pub struct ItemQuery {
    #[serde(default)]
    pub enrich: bool,
}

/// GET /api/catalog/item/{id} - single-item lookup by id or name, optional
/// external metadata enrichment
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ItemQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let mut item = state.store.find_item(&id).await.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Conteúdo não encontrado" })),
        )
    })?;

    if query.enrich {
        state.enrichment.enrich_item(&mut item).await;
    }

    Ok(Json(item))
}

/// Episodes response for a series detail page
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesEpisodesResponse {
    pub series_name: String,
    pub episodes: Vec<crate::models::MediaItem>,
    pub seasons: serde_json::Map<String, serde_json::Value>,
    pub total: usize,
}

/// GET /api/catalog/series/{id}/episodes - flat list plus season grouping
pub async fn get_series_episodes(
    State(state): State<Arc<AppState>>,
    Path(series_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let snapshot = snapshot_or_unavailable(&state).await?;

    let parent = snapshot
        .all_items
        .iter()
        .find(|i| i.id == series_id && i.is_parent_series())
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "Série não encontrada" })),
            )
        })?;

    let episodes = snapshot
        .episodes_by_series
        .get(&series_id)
        .cloned()
        .unwrap_or_default();

    let mut seasons = serde_json::Map::new();
    for (season, season_episodes) in series::episodes_by_season(&episodes) {
        seasons.insert(
            format!("Temporada {}", season),
            serde_json::to_value(season_episodes).unwrap_or_default(),
        );
    }

    Ok(Json(SeriesEpisodesResponse {
        series_name: parent.name.clone(),
        total: episodes.len(),
        episodes,
        seasons,
    }))
}

/// POST /api/catalog/refresh - re-run the full pipeline
pub async fn refresh_catalog(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    match state.store.clone().refresh().await {
        Ok(snapshot) => Ok(Json(serde_json::json!({
            "status": "ok",
            "generation": snapshot.generation,
            "stats": snapshot.stats,
        }))),
        Err(e) => {
            tracing::error!("refresh failed: {}", e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": e.to_string(), "retryable": true })),
            ))
        }
    }
}

/// DELETE /api/catalog/cache - drop persisted entries and in-memory mirrors
pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    state.store.clear_cache().await.map_err(|e| {
        tracing::error!("cache clear failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "Erro ao limpar cache" })),
        )
    })?;

    Ok(Json(serde_json::json!({ "success": true })))
}
