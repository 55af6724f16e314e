use lazy_static::lazy_static;
use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::errors::CatalogError;
use crate::models::{
    Category, CatalogStats, ContentByType, FeaturedContent, GenreBucket, MediaItem,
};
use crate::services::cache::CatalogCache;
use crate::services::classifier::Curation;
use crate::services::organizer;
use crate::services::parser;
use crate::services::position_index::{self, PositionIndex};
use crate::services::search::{linear_search, SearchIndex};
use crate::services::series::organize_series;
use crate::services::source::PlaylistSource;

lazy_static! {
    static ref CATALOG_LOADS: IntCounter = register_int_counter!(
        "catalog_loads_total",
        "Catalog pipeline runs (cache hits included)"
    )
    .unwrap();
    static ref CATALOG_PARSES: IntCounter = register_int_counter!(
        "catalog_parses_total",
        "Full playlist parses (cache misses)"
    )
    .unwrap();
    static ref SEARCH_REQUESTS: IntCounter =
        register_int_counter!("catalog_search_requests_total", "Search invocations").unwrap();
    static ref SEARCH_DURATION: Histogram = register_histogram!(
        "catalog_search_duration_seconds",
        "Search latency in seconds"
    )
    .unwrap();
}

/// Yield window before the background index build starts, so first queries
/// are not stuck behind a large synchronous indexing pass
const INDEX_BUILD_DELAY: Duration = Duration::from_millis(50);

/// Immutable result of one pipeline run. Readers clone the Arc and never
/// observe a half-rebuilt state.
#[derive(Debug)]
pub struct CatalogSnapshot {
    pub generation: u64,
    pub loaded_at: i64,
    /// Parser output, before series reassembly
    pub raw_items: Vec<MediaItem>,
    /// Catalog view: episodes folded into synthetic parents
    pub items: Vec<MediaItem>,
    /// Superset with parents and episode records, for detail lookups
    pub all_items: Vec<MediaItem>,
    pub categories: Vec<Category>,
    pub content_by_type: ContentByType,
    pub genres: Vec<GenreBucket>,
    pub featured: Vec<FeaturedContent>,
    pub content_by_genre: HashMap<String, HashMap<String, Vec<MediaItem>>>,
    pub episodes_by_series: HashMap<String, Vec<MediaItem>>,
    pub stats: CatalogStats,
}

/// Result of a debounced search: superseded requests never return stale data
#[derive(Debug)]
pub enum SearchOutcome {
    Results(Vec<MediaItem>),
    Superseded,
}

/// Stateful query façade owning every derived structure. All mutable state
/// is rebuilt atomically per pipeline run and committed behind a generation
/// check, so a stale run never overwrites a newer one.
pub struct CatalogStore {
    source: PlaylistSource,
    cache: CatalogCache,
    curation: Curation,
    page_size: usize,
    debounce: Duration,
    snapshot: RwLock<Option<Arc<CatalogSnapshot>>>,
    raw_text: RwLock<Option<Arc<String>>>,
    position_index: RwLock<Option<Arc<PositionIndex>>>,
    search_index: RwLock<Option<Arc<SearchIndex>>>,
    generation: AtomicU64,
    search_seq: AtomicU64,
    last_error: RwLock<Option<String>>,
}

impl CatalogStore {
    pub fn new(
        source: PlaylistSource,
        cache: CatalogCache,
        curation: Curation,
        config: &Config,
    ) -> Self {
        Self {
            source,
            cache,
            curation,
            page_size: config.page_size,
            debounce: Duration::from_millis(config.search_debounce_ms),
            snapshot: RwLock::new(None),
            raw_text: RwLock::new(None),
            position_index: RwLock::new(None),
            search_index: RwLock::new(None),
            generation: AtomicU64::new(0),
            search_seq: AtomicU64::new(0),
            last_error: RwLock::new(None),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Run the full pipeline: snapshot cache → source fetch → parse →
    /// reassemble → organize, then commit behind the generation guard.
    pub async fn load(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        CATALOG_LOADS.inc();
        let started = Instant::now();

        let (raw_items, dropped_channels) = match self.cache.load_items().await {
            Some(items) => {
                if let Some(index) = self.cache.load_position_index().await {
                    *self.position_index.write().await = Some(Arc::new(index));
                }
                (items, 0)
            }
            None => {
                let text = match self.source.fetch_playlist_text().await {
                    Ok(text) => text,
                    Err(e) => {
                        *self.last_error.write().await = Some(e.to_string());
                        return Err(e.into());
                    }
                };

                CATALOG_PARSES.inc();
                let outcome = parser::parse_with_curation(&text, &self.curation);

                if let Err(e) = self.cache.save_items(&outcome.items).await {
                    tracing::warn!("failed to persist snapshot: {}", e);
                }
                let index = PositionIndex::build(&text);
                if let Err(e) = self.cache.save_position_index(&index).await {
                    tracing::warn!("failed to persist position index: {}", e);
                }
                *self.position_index.write().await = Some(Arc::new(index));
                *self.raw_text.write().await = Some(Arc::new(text));

                (outcome.items, outcome.dropped_channels)
            }
        };

        let snapshot = Arc::new(build_snapshot(raw_items, generation, dropped_channels));

        {
            let mut slot = self.snapshot.write().await;
            let newer_in_flight = self.generation.load(Ordering::SeqCst) != generation;
            let newer_committed = slot
                .as_ref()
                .map(|s| s.generation > generation)
                .unwrap_or(false);
            if newer_in_flight || newer_committed {
                tracing::warn!(generation, "discarding stale pipeline result");
            } else {
                *slot = Some(snapshot.clone());
                *self.last_error.write().await = None;
            }
        }

        tracing::info!(
            generation,
            items = snapshot.items.len(),
            all_items = snapshot.all_items.len(),
            categories = snapshot.categories.len(),
            genres = snapshot.genres.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "catalog pipeline completed"
        );

        Ok(snapshot)
    }

    /// Initial load plus the deferred search-index build
    pub async fn initial_load(self: Arc<Self>) {
        match self.load().await {
            Ok(snapshot) => {
                let generation = snapshot.generation;
                self.spawn_index_build(generation);
            }
            Err(e) => {
                tracing::error!("initial catalog load failed: {}", e);
            }
        }
    }

    /// Build the inverted index in the background and install it only while
    /// its generation is still current
    pub fn spawn_index_build(self: Arc<Self>, generation: u64) {
        tokio::spawn(async move {
            tokio::time::sleep(INDEX_BUILD_DELAY).await;

            let snapshot = self.snapshot.read().await.clone();
            let snapshot = match snapshot {
                Some(s) if s.generation == generation => s,
                _ => return,
            };

            let started = Instant::now();
            let index = SearchIndex::build(&snapshot.all_items);
            tracing::info!(
                words = index.word_count(),
                items = index.indexed_items(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "search index ready"
            );

            if self.generation.load(Ordering::SeqCst) == generation {
                *self.search_index.write().await = Some(Arc::new(index));
            }
        });
    }

    /// Invalidate persisted state and re-run the whole pipeline
    pub async fn refresh(self: Arc<Self>) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        if let Err(e) = self.cache.clear().await {
            tracing::warn!("cache clear failed during refresh: {}", e);
        }
        *self.search_index.write().await = None;

        let snapshot = self.load().await?;
        self.clone().spawn_index_build(snapshot.generation);
        Ok(snapshot)
    }

    /// Search over all items. Uses the inverted index when it is ready,
    /// otherwise a synchronous linear substring scan.
    pub async fn search(&self, term: &str) -> Vec<MediaItem> {
        SEARCH_REQUESTS.inc();
        let started = Instant::now();

        let snapshot = match self.snapshot.read().await.clone() {
            Some(snapshot) => snapshot,
            None => return Vec::new(),
        };

        let index = self.search_index.read().await.clone();
        let indexed = index.is_some();
        let results: Vec<MediaItem> = match index {
            Some(index) => {
                let ids = index.query(term);
                snapshot
                    .all_items
                    .iter()
                    .filter(|item| ids.contains(&item.id))
                    .cloned()
                    .collect()
            }
            None => linear_search(&snapshot.all_items, term),
        };

        let elapsed = started.elapsed();
        SEARCH_DURATION.observe(elapsed.as_secs_f64());
        tracing::debug!(
            term,
            matches = results.len(),
            indexed,
            elapsed_ms = elapsed.as_millis() as u64,
            "search executed"
        );

        results
    }

    /// Debounced search: only the latest pending request executes. A request
    /// superseded inside the debounce window reports `Superseded` instead of
    /// returning stale results.
    pub async fn search_debounced(&self, term: &str) -> SearchOutcome {
        let request_id = self.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.debounce).await;

        if self.search_seq.load(Ordering::SeqCst) != request_id {
            return SearchOutcome::Superseded;
        }

        SearchOutcome::Results(self.search(term).await)
    }

    /// Resolve one item by id or name: committed snapshot, then a
    /// position-index fragment parse, then a full parse of the raw text.
    /// `None` is the lookup-miss signal.
    pub async fn find_item(&self, term: &str) -> Option<MediaItem> {
        if let Some(snapshot) = self.snapshot.read().await.clone() {
            if let Some(item) = find_in_items(&snapshot.all_items, term) {
                return Some(item);
            }
        }

        let raw_text = self.raw_text.read().await.clone();
        if let Some(text) = raw_text {
            if let Some(index) = self.position_index.read().await.clone() {
                if let Some(item) = position_index::find_in_text(&text, &index, term, &self.curation)
                {
                    tracing::debug!(term, "item resolved via position index");
                    return Some(item);
                }
            }

            // last resort: full parse + linear scan
            let outcome = parser::parse_with_curation(&text, &self.curation);
            if let Some(item) = find_in_items(&outcome.items, term) {
                return Some(item);
            }
        }

        None
    }

    /// Remove the persisted entries and reset every in-memory mirror; the
    /// next load starts from the source
    pub async fn clear_cache(&self) -> anyhow::Result<()> {
        self.cache.clear().await?;
        *self.snapshot.write().await = None;
        *self.raw_text.write().await = None;
        *self.position_index.write().await = None;
        *self.search_index.write().await = None;
        tracing::info!("catalog caches cleared");
        Ok(())
    }

    pub async fn snapshot(&self) -> Option<Arc<CatalogSnapshot>> {
        self.snapshot.read().await.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub async fn index_ready(&self) -> bool {
        self.search_index.read().await.is_some()
    }
}

/// Fixed-size slice windowing, 1-based pages
pub fn paginate(items: &[MediaItem], page: usize, page_size: usize) -> Vec<MediaItem> {
    if page == 0 || page_size == 0 {
        return Vec::new();
    }
    items
        .iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect()
}

/// `ceil(len / page_size)`
pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    (len + page_size - 1) / page_size
}

fn build_snapshot(
    raw_items: Vec<MediaItem>,
    generation: u64,
    dropped_channels: usize,
) -> CatalogSnapshot {
    let series_content = organize_series(&raw_items);
    let items = series_content.listing_items;
    let all_items = series_content.all_items;

    let categories = organizer::organize_by_categories(&items);
    let content_by_type = organizer::organize_by_content_type(&items);
    let genres = organizer::organize_by_genre(&items);
    let featured = organizer::featured_content(&items);
    let content_by_genre = organizer::organize_by_type_and_genre(&all_items);

    let stats = CatalogStats {
        total_items: raw_items.len(),
        movie_count: content_by_type.movies.len(),
        series_count: content_by_type.series.len(),
        channel_count: content_by_type.channels.len(),
        category_count: categories.len(),
        genre_count: genres.len(),
        dropped_channels,
    };

    CatalogSnapshot {
        generation,
        loaded_at: chrono::Utc::now().timestamp_millis(),
        raw_items,
        items,
        all_items,
        categories,
        content_by_type,
        genres,
        featured,
        content_by_genre,
        episodes_by_series: series_content.episodes_by_series,
        stats,
    }
}

/// Snapshot lookup: exact id, partial id, exact name, then name substring
fn find_in_items(items: &[MediaItem], term: &str) -> Option<MediaItem> {
    let term_lower = term.to_lowercase();

    items
        .iter()
        .find(|i| i.id == term)
        .or_else(|| {
            items
                .iter()
                .find(|i| i.id.contains(term) || term.contains(&i.id))
        })
        .or_else(|| items.iter().find(|i| i.name.to_lowercase() == term_lower))
        .or_else(|| {
            items
                .iter()
                .find(|i| i.name.to_lowercase().contains(&term_lower))
        })
        .cloned()
}
