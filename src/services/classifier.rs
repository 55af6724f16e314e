use chrono::Datelike;
use lazy_static::lazy_static;
use lru::LruCache;
use regex::Regex;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::config::Config;
use crate::models::MediaType;

// Cache for extract_series_info (LRU with 10k max entries)
lazy_static! {
    static ref SERIES_CACHE: Mutex<LruCache<String, Option<SeriesMarker>>> =
        Mutex::new(LruCache::new(NonZeroUsize::new(10000).unwrap()));

    /// SxxExx episode marker, case-insensitive
    static ref SERIES_EPISODE_RE: Regex = Regex::new(r"(?i)S(\d+)E(\d+)").unwrap();
    /// (YYYY) year marker
    static ref YEAR_RE: Regex = Regex::new(r"\((\d{4})\)").unwrap();
    /// Bracketed genre tag in the display name
    static ref BRACKET_TAG_RE: Regex = Regex::new(r"\[(.*?)\]").unwrap();
    /// Anything that is not a slug character
    static ref NON_SLUG_RE: Regex = Regex::new(r"[^a-z0-9]").unwrap();
}

// ============ TYPE KEYWORDS (group-title containment, checked in order) ============

const MOVIE_GROUP_KEYWORDS: &[&str] = &["filme", "movie"];
const SERIES_GROUP_KEYWORDS: &[&str] = &["série", "serie"];
const CHANNEL_GROUP_KEYWORDS: &[&str] = &["canal", "channel", "tv "];

// ============ GENRE TABLES (ordered, first keyword hit wins) ============

const MOVIE_GENRE_RULES: &[(&[&str], &str)] = &[
    (&["ação", "action"], "Ação"),
    (&["comédia", "comedy"], "Comédia"),
    (&["drama"], "Drama"),
    (&["terror", "horror"], "Terror"),
    (&["ficção", "sci-fi"], "Ficção Científica"),
    (&["netflix"], "Netflix"),
    (&["disney"], "Disney+"),
    (&["prime", "amazon"], "Prime Video"),
    (&["hbo"], "HBO"),
];

const SERIES_GENRE_RULES: &[(&[&str], &str)] = &[
    (&["netflix"], "Netflix"),
    (&["disney"], "Disney+"),
    (&["prime", "amazon"], "Prime Video"),
    (&["hbo"], "HBO"),
    (&["discovery"], "Discovery"),
    (&["apple"], "Apple TV+"),
    (&["ação", "action"], "Ação"),
    (&["comédia", "comedy"], "Comédia"),
    (&["drama"], "Drama"),
];

const CHANNEL_GENRE_RULES: &[(&[&str], &str)] = &[
    (&["aberto", "tv aberta"], "Abertos"),
    (&["sport", "esporte"], "Esportes"),
    (&["documentário", "documentary"], "Documentários"),
    (&["notícia", "news"], "Notícias"),
    (&["premium", "hbo"], "Filmes e Séries"),
    (&["infantil", "kids"], "Infantil"),
];

/// Genre floor when nothing can be inferred
pub const DEFAULT_GENRE: &str = "Sem Categoria";

/// Season/episode marker extracted from a display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesMarker {
    pub series_name: String,
    /// Zero-padded to at least two digits
    pub season: String,
    pub episode: String,
}

/// Content classifier: ordered rule lists for type and genre derivation
pub struct ContentClassifier;

impl ContentClassifier {
    /// Classify an entry from its group-title and display name.
    ///
    /// Group keywords win over name shape; the name-based fallback only
    /// applies when the group says nothing.
    pub fn classify(name: &str, group: &str) -> MediaType {
        let group_lower = group.to_lowercase();

        if contains_any(&group_lower, MOVIE_GROUP_KEYWORDS) {
            return MediaType::Movie;
        }

        if SERIES_EPISODE_RE.is_match(name) || contains_any(&group_lower, SERIES_GROUP_KEYWORDS) {
            return MediaType::Series;
        }

        if contains_any(&group_lower, CHANNEL_GROUP_KEYWORDS) {
            return MediaType::Channel;
        }

        // Group says nothing: infer from the name
        if YEAR_RE.is_match(name) {
            return MediaType::Movie;
        }

        MediaType::Channel
    }

    /// Second segment of a "Filmes | Ação" style group, separators checked
    /// in `|`, `-`, `:` order
    pub fn genre_from_group_split(group: &str) -> Option<String> {
        for sep in ['|', '-', ':'] {
            if group.contains(sep) {
                let second = group.split(sep).nth(1).map(|s| s.trim().to_string());
                return second.filter(|s| !s.is_empty());
            }
        }
        None
    }

    /// Bracketed tag in the display name; returns the tag and the name with
    /// the first bracket group stripped
    pub fn genre_from_bracket_tag(name: &str) -> Option<(String, String)> {
        let caps = BRACKET_TAG_RE.captures(name)?;
        let tag = caps.get(1)?.as_str().trim().to_string();
        if tag.is_empty() {
            return None;
        }
        let cleaned = BRACKET_TAG_RE.replace(name, "").trim().to_string();
        Some((tag, cleaned))
    }

    /// Per-type keyword table applied to the group text
    pub fn genre_from_keywords(group: &str, media_type: MediaType) -> Option<String> {
        let group_lower = group.to_lowercase();
        let table = match media_type {
            MediaType::Movie => MOVIE_GENRE_RULES,
            MediaType::Series => SERIES_GENRE_RULES,
            MediaType::Channel => CHANNEL_GENRE_RULES,
        };
        for (keywords, label) in table {
            if contains_any(&group_lower, keywords) {
                return Some((*label).to_string());
            }
        }
        None
    }

    /// Full genre derivation: group split → bracket tag → keyword table →
    /// raw group → "Sem Categoria". Returns the genre and, when a bracket
    /// tag was consumed, the cleaned display name.
    pub fn derive_genre(name: &str, group: &str, media_type: MediaType) -> (String, Option<String>) {
        if let Some(genre) = Self::genre_from_group_split(group) {
            return (genre, None);
        }

        if let Some((genre, cleaned)) = Self::genre_from_bracket_tag(name) {
            return (genre, Some(cleaned));
        }

        if let Some(genre) = Self::genre_from_keywords(group, media_type) {
            return (genre, None);
        }

        if !group.trim().is_empty() {
            return (group.to_string(), None);
        }

        (DEFAULT_GENRE.to_string(), None)
    }

    /// Capture a `(YYYY)` marker; returns the year and the name with the
    /// first marker stripped
    pub fn extract_year(name: &str) -> (Option<String>, String) {
        if let Some(caps) = YEAR_RE.captures(name) {
            let year = caps.get(1).map(|m| m.as_str().to_string());
            let cleaned = YEAR_RE.replace(name, "").trim().to_string();
            return (year, cleaned);
        }
        (None, name.to_string())
    }

    /// Detect the SxxExx pattern, yielding the clean series name and the
    /// zero-padded season/episode. Memoized (hot path during reassembly).
    pub fn extract_series_info(name: &str) -> Option<SeriesMarker> {
        {
            let mut cache = SERIES_CACHE.lock().unwrap();
            if let Some(cached) = cache.get(name) {
                return cached.clone();
            }
        }

        let result = SERIES_EPISODE_RE.captures(name).map(|caps| {
            let season: u32 = caps
                .get(1)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            let episode: u32 = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            let series_name = name[..caps.get(0).unwrap().start()].trim().to_string();
            SeriesMarker {
                series_name,
                season: format!("{:02}", season),
                episode: format!("{:02}", episode),
            }
        });

        let mut cache = SERIES_CACHE.lock().unwrap();
        cache.put(name.to_string(), result.clone());
        result
    }

    /// Slug for synthetic parent ids: lower-cased, non-alphanumerics mapped
    /// to `-`
    pub fn series_slug(name: &str) -> String {
        NON_SLUG_RE
            .replace_all(&name.to_lowercase(), "-")
            .to_string()
    }

    /// Clear the series info cache (useful for tests or when memory is high)
    pub fn clear_cache() {
        let mut cache = SERIES_CACHE.lock().unwrap();
        cache.clear();
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Deterministic replacement for the old randomized isNew/isFeatured flags:
/// recency window over the extracted year, plus an explicit curation list.
#[derive(Debug, Clone)]
pub struct Curation {
    pub reference_year: i32,
    pub new_window_years: i32,
    featured: HashSet<String>,
}

impl Curation {
    pub fn new(reference_year: i32, new_window_years: i32, featured: Vec<String>) -> Self {
        Self {
            reference_year,
            new_window_years,
            featured: featured.into_iter().map(|n| n.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            chrono::Utc::now().year(),
            config.curation_new_window_years,
            config.curation_featured.clone(),
        )
    }

    /// An item is new when its year falls inside the recency window
    pub fn is_new(&self, year: Option<&str>) -> bool {
        year.and_then(|y| y.parse::<i32>().ok())
            .map(|y| {
                y >= self.reference_year - self.new_window_years && y <= self.reference_year + 1
            })
            .unwrap_or(false)
    }

    /// An item is featured when its cleaned name is on the curation list
    pub fn is_featured(&self, name: &str) -> bool {
        self.featured.contains(&name.to_lowercase())
    }
}

impl Default for Curation {
    fn default() -> Self {
        Self::new(chrono::Utc::now().year(), 1, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_movie_group_wins() {
        assert_eq!(
            ContentClassifier::classify("Duro de Matar (1988)", "Filmes | Ação"),
            MediaType::Movie
        );
        // movie keyword in the group beats the episode shape in the name
        assert_eq!(
            ContentClassifier::classify("Harry Potter S01E01", "Filmes | Coletânea"),
            MediaType::Movie
        );
    }

    #[test]
    fn test_classify_series() {
        assert_eq!(
            ContentClassifier::classify("Breaking Bad S01E03", "Séries"),
            MediaType::Series
        );
        assert_eq!(
            ContentClassifier::classify("Breaking Bad S01E03", "HBO"),
            MediaType::Series
        );
        assert_eq!(
            ContentClassifier::classify("La Casa de Papel", "Series | Netflix"),
            MediaType::Series
        );
    }

    #[test]
    fn test_classify_channel() {
        assert_eq!(
            ContentClassifier::classify("Globo HD", "Canal Aberto"),
            MediaType::Channel
        );
        assert_eq!(
            ContentClassifier::classify("ESPN", "TV Esportes"),
            MediaType::Channel
        );
    }

    #[test]
    fn test_classify_fallback_by_name() {
        // unknown group, year in parentheses → movie
        assert_eq!(
            ContentClassifier::classify("Matrix (1999)", "Destaques"),
            MediaType::Movie
        );
        // nothing distinctive → channel
        assert_eq!(
            ContentClassifier::classify("Rede Genérica", "Destaques"),
            MediaType::Channel
        );
    }

    #[test]
    fn test_genre_from_group_split_order() {
        assert_eq!(
            ContentClassifier::genre_from_group_split("Filmes | Ação"),
            Some("Ação".to_string())
        );
        assert_eq!(
            ContentClassifier::genre_from_group_split("Filmes - Terror"),
            Some("Terror".to_string())
        );
        assert_eq!(
            ContentClassifier::genre_from_group_split("Filmes: Drama"),
            Some("Drama".to_string())
        );
        assert_eq!(ContentClassifier::genre_from_group_split("Filmes"), None);
        assert_eq!(ContentClassifier::genre_from_group_split("Filmes |"), None);
    }

    #[test]
    fn test_genre_from_bracket_tag_strips_name() {
        let (tag, cleaned) = ContentClassifier::genre_from_bracket_tag("Matrix [Ficção]").unwrap();
        assert_eq!(tag, "Ficção");
        assert_eq!(cleaned, "Matrix");
        assert!(ContentClassifier::genre_from_bracket_tag("Matrix").is_none());
    }

    #[test]
    fn test_genre_keyword_tables_per_type() {
        assert_eq!(
            ContentClassifier::genre_from_keywords("Filmes Netflix", MediaType::Movie),
            Some("Netflix".to_string())
        );
        assert_eq!(
            ContentClassifier::genre_from_keywords("Apple Originais", MediaType::Series),
            Some("Apple TV+".to_string())
        );
        assert_eq!(
            ContentClassifier::genre_from_keywords("Esportes ao vivo", MediaType::Channel),
            Some("Esportes".to_string())
        );
        assert_eq!(
            ContentClassifier::genre_from_keywords("Variedades", MediaType::Channel),
            None
        );
    }

    #[test]
    fn test_derive_genre_falls_back_to_group_then_floor() {
        let (genre, _) = ContentClassifier::derive_genre("Algo", "Variedades", MediaType::Channel);
        assert_eq!(genre, "Variedades");

        let (genre, _) = ContentClassifier::derive_genre("Algo", "", MediaType::Channel);
        assert_eq!(genre, DEFAULT_GENRE);
    }

    #[test]
    fn test_extract_year() {
        let (year, cleaned) = ContentClassifier::extract_year("Duro de Matar (1988)");
        assert_eq!(year, Some("1988".to_string()));
        assert_eq!(cleaned, "Duro de Matar");

        let (year, cleaned) = ContentClassifier::extract_year("Sem Ano");
        assert_eq!(year, None);
        assert_eq!(cleaned, "Sem Ano");
    }

    #[test]
    fn test_extract_series_info_padding() {
        let marker = ContentClassifier::extract_series_info("Breaking Bad S1E3").unwrap();
        assert_eq!(marker.series_name, "Breaking Bad");
        assert_eq!(marker.season, "01");
        assert_eq!(marker.episode, "03");

        let marker = ContentClassifier::extract_series_info("Dark S03E08").unwrap();
        assert_eq!(marker.season, "03");
        assert_eq!(marker.episode, "08");

        assert!(ContentClassifier::extract_series_info("Matrix (1999)").is_none());
    }

    #[test]
    fn test_series_slug() {
        assert_eq!(ContentClassifier::series_slug("Breaking Bad"), "breaking-bad");
        assert_eq!(
            ContentClassifier::series_slug("La Casa de Papel!"),
            "la-casa-de-papel-"
        );
    }

    #[test]
    fn test_curation_is_deterministic() {
        let curation = Curation::new(2024, 1, vec!["Duro de Matar".to_string()]);

        assert!(curation.is_new(Some("2024")));
        assert!(curation.is_new(Some("2023")));
        assert!(!curation.is_new(Some("1988")));
        assert!(!curation.is_new(None));

        assert!(curation.is_featured("duro de matar"));
        assert!(curation.is_featured("Duro de Matar"));
        assert!(!curation.is_featured("Matrix"));

        // same inputs, same answers
        assert_eq!(curation.is_new(Some("2023")), curation.is_new(Some("2023")));
    }
}
