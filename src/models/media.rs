use serde::{Deserialize, Serialize};

/// Content type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Series,
    Channel,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Movie => write!(f, "movie"),
            MediaType::Series => write!(f, "series"),
            MediaType::Channel => write!(f, "channel"),
        }
    }
}

impl MediaType {
    /// Parse from the lowercase wire form ("movie", "series", "channel")
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "movie" | "movies" => Some(MediaType::Movie),
            "series" => Some(MediaType::Series),
            "channel" | "channels" => Some(MediaType::Channel),
            _ => None,
        }
    }

    /// Plural bucket key used by the by-genre drill-down map
    pub fn plural(&self) -> &'static str {
        match self {
            MediaType::Movie => "movies",
            MediaType::Series => "series",
            MediaType::Channel => "channels",
        }
    }
}

/// Canonical record for one playable/browsable unit.
///
/// Parent series records are synthetic: `url` is empty and episodes point
/// back at them through `parent_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub group: String,
    pub genre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    /// Zero-padded two-digit season, present on episode records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    /// Zero-padded two-digit episode, present on episode records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvg_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvg_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvg_logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl MediaItem {
    /// Synthetic parent series record (aggregates episodes, not playable)
    pub fn is_parent_series(&self) -> bool {
        self.media_type == MediaType::Series && self.url.is_empty()
    }

    /// Episode record belonging to a synthesized parent
    pub fn is_episode(&self) -> bool {
        self.parent_id
            .as_deref()
            .map(|p| p != self.id)
            .unwrap_or(false)
    }
}

/// One category per distinct raw `group-title` value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: MediaType,
    pub items: Vec<MediaItem>,
}

/// One bucket per distinct derived genre, across the whole catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreBucket {
    pub id: String,
    pub name: String,
    pub items: Vec<MediaItem>,
}

/// Named, capped slice used for homepage rails
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedContent {
    pub id: String,
    pub title: String,
    pub items: Vec<MediaItem>,
}

/// Items split by authoritative content type (category-level wins)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentByType {
    pub movies: Vec<MediaItem>,
    pub series: Vec<MediaItem>,
    pub channels: Vec<MediaItem>,
}

/// Per-load counters, exposed by the stats route and startup logs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total_items: usize,
    pub movie_count: usize,
    pub series_count: usize,
    pub channel_count: usize,
    pub category_count: usize,
    pub genre_count: usize,
    /// Entries removed by the "Canais" drop rule, never emitted
    pub dropped_channels: usize,
}

/// Query parameters for the items endpoint (page-based windowing)
#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    #[serde(default, alias = "type")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default)]
    pub per_page: Option<usize>,
}

fn default_page() -> usize {
    1
}

/// Paginated items response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsResponse {
    pub items: Vec<MediaItem>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

/// Categories response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
    pub total: usize,
}

/// Genres response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenresResponse {
    pub genres: Vec<GenreBucket>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, url: &str, media_type: MediaType) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            name: "Teste".to_string(),
            url: url.to_string(),
            media_type,
            group: "Filmes".to_string(),
            genre: "Sem Categoria".to_string(),
            description: None,
            year: None,
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

    #[test]
    fn test_media_type_roundtrip() {
        assert_eq!(MediaType::from_str_opt("movie"), Some(MediaType::Movie));
        assert_eq!(MediaType::from_str_opt("SERIES"), Some(MediaType::Series));
        assert_eq!(MediaType::from_str_opt("channels"), Some(MediaType::Channel));
        assert_eq!(MediaType::from_str_opt("vod"), None);
        assert_eq!(MediaType::Movie.to_string(), "movie");
    }

    #[test]
    fn test_parent_series_detection() {
        let parent = item("series-teste", "", MediaType::Series);
        assert!(parent.is_parent_series());

        let playable = item("media-1", "http://example/x.mp4", MediaType::Series);
        assert!(!playable.is_parent_series());
    }

    #[test]
    fn test_serializes_camel_case_with_type_alias() {
        let value = serde_json::to_value(item("media-1", "http://u", MediaType::Movie)).unwrap();
        assert_eq!(value["type"], "movie");
        assert_eq!(value["isNew"], false);
        // absent optionals are omitted from the wire format
        assert!(value.get("tvgId").is_none());
    }
}
