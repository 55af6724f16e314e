use anyhow::{bail, Result};
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION, PRAGMA};
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::errors::SourceError;
use crate::services::parser::has_playlist_header;

/// In-memory fallback sample. Header-only: it never satisfies the fallback
/// chain by itself, so the remote source stays reachable.
pub const SAMPLE_PLAYLIST: &str = "#EXTM3U\n\
# Amostra local. O conteúdo completo é carregado do arquivo lista-iptv.m3u\n";

/// Resolves raw playlist text: local packaged file, well-known served path,
/// embedded sample, then the remote URL with one manual redirect retry.
/// First success wins, no merging.
pub struct PlaylistSource {
    client: Client,
    /// Redirects disabled: used to read the Location header manually
    probe_client: Client,
    url: String,
    local_path: String,
    public_path: String,
}

impl PlaylistSource {
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = Duration::from_millis(config.fetch_timeout_ms);

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;

        let probe_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            probe_client,
            url: config.playlist_url.clone(),
            local_path: config.playlist_local_path.clone(),
            public_path: config.playlist_public_path.clone(),
        })
    }

    /// Walk the fallback chain; fails only when every source is exhausted
    pub async fn fetch_playlist_text(&self) -> Result<String, SourceError> {
        for path in [&self.local_path, &self.public_path] {
            match tokio::fs::read_to_string(path).await {
                Ok(content) if has_playlist_header(&content) => {
                    tracing::info!(path = %path, bytes = content.len(), "playlist loaded from local file");
                    return Ok(content);
                }
                Ok(_) => {
                    tracing::warn!(path = %path, "local file lacks the #EXTM3U header, skipping");
                }
                Err(e) => {
                    tracing::debug!(path = %path, "local file unavailable: {}", e);
                }
            }
        }

        if SAMPLE_PLAYLIST.contains("#EXTINF:") {
            tracing::info!("using embedded sample playlist");
            return Ok(SAMPLE_PLAYLIST.to_string());
        }

        match self.fetch_remote(&self.url).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                tracing::warn!(url = %self.url, "remote playlist fetch failed: {}", e);
            }
        }

        // Short links the client cannot follow automatically: resolve the
        // Location header once and retry against the real URL
        if let Some(target) = self.resolve_redirect(&self.url).await {
            tracing::info!(target = %target, "retrying against resolved redirect target");
            if let Ok(response) = self.client.get(&target).send().await {
                if let Ok(body) = response.text().await {
                    tracing::info!(bytes = body.len(), "playlist loaded from redirect target");
                    return Ok(body);
                }
            }
        }

        Err(SourceError::Unavailable)
    }

    /// Plain GET with cache-busting headers; rejects HTML bodies that lack
    /// the playlist signature (captive portals, landing pages)
    async fn fetch_remote(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "*/*")
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.text().await?;

        if content_type.contains("html") && !has_playlist_header(&body) {
            bail!("resposta não parece ser uma lista M3U válida: {}", content_type);
        }

        tracing::info!(bytes = body.len(), "remote playlist loaded");
        Ok(body)
    }

    /// One-shot manual redirect resolution: GET without following, accept
    /// 2xx-3xx, read Location (resolved against the base URL)
    async fn resolve_redirect(&self, url: &str) -> Option<String> {
        let response = match self.probe_client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("redirect probe failed: {}", e);
                return None;
            }
        };

        let status = response.status().as_u16();
        if !(200..400).contains(&status) {
            return None;
        }

        let location = response.headers().get(LOCATION)?.to_str().ok()?.to_string();

        match Url::parse(&location) {
            Ok(absolute) => Some(absolute.to_string()),
            // relative Location: resolve against the original URL
            Err(_) => Url::parse(url)
                .ok()?
                .join(&location)
                .ok()
                .map(|u| u.to_string()),
        }
    }
}
