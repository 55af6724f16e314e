use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::Config;
use crate::models::MediaItem;
use crate::services::classifier::ContentClassifier;

/// Structured record from the OMDb-style provider
#[derive(Debug, Clone, Deserialize)]
pub struct MovieInfo {
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Plot")]
    pub plot: Option<String>,
    #[serde(rename = "Genre")]
    pub genre: Option<String>,
    #[serde(rename = "Country")]
    pub country: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "Response", default)]
    pub response: String,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(rename = "Search", default)]
    search: Vec<SearchHit>,
    #[serde(rename = "Response", default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "imdbID")]
    imdb_id: String,
}

/// Best-effort title → description lookup against an external metadata
/// provider. Failures are swallowed; items keep their original description.
/// Disabled entirely when no API key is configured.
pub struct EnrichmentService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    /// Per-title result cache, avoids repeated lookups within a process
    cache: Mutex<HashMap<String, MovieInfo>>,
}

impl EnrichmentService {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.enrichment_base_url.clone(),
            api_key: config.enrichment_api_key.clone(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch info for a title, trying the direct-title query first and then
    /// the search → details chain
    pub async fn fetch_movie_info(&self, title: &str, year: Option<&str>) -> Option<MovieInfo> {
        let api_key = self.api_key.as_deref()?;

        let cache_key = format!("{}-{}", title.to_lowercase(), year.unwrap_or(""));
        if let Some(cached) = self.cache.lock().unwrap().get(&cache_key) {
            return Some(cached.clone());
        }

        let direct_url = format!(
            "{}?apikey={}&t={}",
            self.base_url,
            api_key,
            urlencoding::encode(title)
        );
        if let Some(info) = self.get_movie(&direct_url).await {
            self.cache.lock().unwrap().insert(cache_key, info.clone());
            return Some(info);
        }

        // Direct lookup missed: search for the title, then fetch details by
        // the first hit's IMDB id
        let search_url = format!(
            "{}?apikey={}&s={}",
            self.base_url,
            api_key,
            urlencoding::encode(title)
        );
        let envelope: SearchEnvelope = self.get_json(&search_url).await?;
        if envelope.response != "True" {
            tracing::debug!(title = %title, "no enrichment results");
            return None;
        }
        let imdb_id = envelope.search.first().map(|hit| hit.imdb_id.clone())?;

        let details_url = format!("{}?apikey={}&i={}", self.base_url, api_key, imdb_id);
        let info = self.get_movie(&details_url).await?;
        self.cache.lock().unwrap().insert(cache_key, info.clone());
        Some(info)
    }

    /// Fill an item's description from the provider when it has none.
    /// Non-fatal: on any failure the item is returned untouched.
    pub async fn enrich_item(&self, item: &mut MediaItem) {
        let has_description = item
            .description
            .as_deref()
            .map(|d| !d.trim().is_empty())
            .unwrap_or(false);
        if has_description || !self.enabled() {
            return;
        }

        // Clean the title for better matches: strip SxxExx and (YYYY)
        let clean_title = ContentClassifier::extract_series_info(&item.name)
            .map(|marker| marker.series_name)
            .unwrap_or_else(|| item.name.clone());
        let (extracted_year, clean_title) = ContentClassifier::extract_year(&clean_title);
        let year = extracted_year.or_else(|| item.year.clone());

        if let Some(info) = self.fetch_movie_info(&clean_title, year.as_deref()).await {
            if let Some(plot) = info.plot.filter(|p| !p.is_empty() && p != "N/A") {
                item.description = Some(plot);
            }
        }
    }

    async fn get_movie(&self, url: &str) -> Option<MovieInfo> {
        let info: MovieInfo = self.get_json(url).await?;
        if info.response == "True" {
            Some(info)
        } else {
            None
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Option<T> {
        match self.client.get(url).send().await {
            Ok(response) => match response.json().await {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!("enrichment response parse failed: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::debug!("enrichment request failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;

    fn service(api_key: Option<&str>) -> EnrichmentService {
        let mut config = Config {
            port: 0,
            environment: "test".to_string(),
            playlist_url: String::new(),
            playlist_local_path: String::new(),
            playlist_public_path: String::new(),
            fetch_timeout_ms: 500,
            cache_dir: String::new(),
            cache_ttl_ms: 0,
            cleanup_interval_secs: 3600,
            page_size: 30,
            search_debounce_ms: 300,
            curation_featured: Vec::new(),
            curation_new_window_years: 1,
            enrichment_base_url: "http://127.0.0.1:1/".to_string(),
            enrichment_api_key: None,
            user_agent: "test".to_string(),
        };
        config.enrichment_api_key = api_key.map(|k| k.to_string());
        EnrichmentService::new(&config).unwrap()
    }

    fn movie(description: Option<&str>) -> MediaItem {
        MediaItem {
            id: "media-1".to_string(),
            name: "Matrix".to_string(),
            url: "http://example/matrix.mp4".to_string(),
            media_type: MediaType::Movie,
            group: "Filmes".to_string(),
            genre: "Ficção Científica".to_string(),
            description: description.map(|d| d.to_string()),
            year: Some("1999".to_string()),
            season: None,
            episode: None,
            is_new: false,
            is_featured: false,
            tvg_id: None,
            tvg_name: None,
            tvg_logo: None,
            logo: None,
            poster: None,
            parent_id: None,
        }
    }

    #[tokio::test]
    async fn test_disabled_without_api_key() {
        let service = service(None);
        assert!(!service.enabled());
        assert!(service.fetch_movie_info("Matrix", None).await.is_none());
    }

    #[tokio::test]
    async fn test_enrich_keeps_existing_description() {
        let service = service(Some("key"));
        let mut item = movie(Some("Já tem descrição"));
        service.enrich_item(&mut item).await;
        assert_eq!(item.description.as_deref(), Some("Já tem descrição"));
    }

    #[tokio::test]
    async fn test_provider_failure_is_swallowed() {
        // base_url points at a closed port: the lookup fails, the item stays
        let service = service(Some("key"));
        let mut item = movie(None);
        service.enrich_item(&mut item).await;
        assert!(item.description.is_none());
    }
}
