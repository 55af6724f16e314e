use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub environment: String,

    // Playlist source
    pub playlist_url: String,
    pub playlist_local_path: String,
    pub playlist_public_path: String,
    pub fetch_timeout_ms: u64,

    // Cache
    pub cache_dir: String,
    pub cache_ttl_ms: i64,
    pub cleanup_interval_secs: u64,

    // Query façade
    pub page_size: usize,
    pub search_debounce_ms: u64,

    // Curation (deterministic isNew/isFeatured signals)
    pub curation_featured: Vec<String>,
    pub curation_new_window_years: i32,

    // Metadata enrichment (best-effort, disabled without a key)
    pub enrichment_base_url: String,
    pub enrichment_api_key: Option<String>,

    // Misc - Use VLC user agent to avoid IPTV server blocks
    pub user_agent: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Server
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .unwrap_or(3001),
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),

            // Playlist source
            playlist_url: env::var("PLAYLIST_URL")
                .unwrap_or_else(|_| "https://is.gd/angeexx".to_string()),
            playlist_local_path: env::var("PLAYLIST_LOCAL_PATH")
                .unwrap_or_else(|_| "lista-iptv.m3u".to_string()),
            playlist_public_path: env::var("PLAYLIST_PUBLIC_PATH")
                .unwrap_or_else(|_| "public/lista-iptv.m3u".to_string()),
            fetch_timeout_ms: env::var("FETCH_TIMEOUT_MS")
                .unwrap_or_else(|_| "15000".to_string())
                .parse()
                .unwrap_or(15_000), // 15 seconds

            // Cache
            cache_dir: env::var("CATALOG_CACHE_DIR")
                .unwrap_or_else(|_| ".catalog-cache".to_string()),
            cache_ttl_ms: env::var("CATALOG_CACHE_TTL_MS")
                .unwrap_or_else(|_| "86400000".to_string())
                .parse()
                .unwrap_or(86_400_000), // 24 hours
            cleanup_interval_secs: env::var("CLEANUP_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .unwrap_or(3600), // hourly

            // Query façade
            page_size: env::var("PAGE_SIZE")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            search_debounce_ms: env::var("SEARCH_DEBOUNCE_MS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),

            // Curation
            curation_featured: env::var("CURATION_FEATURED")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            curation_new_window_years: env::var("CURATION_NEW_WINDOW_YEARS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),

            // Enrichment
            enrichment_base_url: env::var("ENRICHMENT_BASE_URL")
                .unwrap_or_else(|_| "https://www.omdbapi.com/".to_string()),
            enrichment_api_key: env::var("ENRICHMENT_API_KEY").ok().filter(|k| !k.is_empty()),

            // Misc
            user_agent: env::var("USER_AGENT")
                .unwrap_or_else(|_| "VLC/3.0.20 LibVLC/3.0.20".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
