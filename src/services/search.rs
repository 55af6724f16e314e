use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::models::MediaItem;

lazy_static! {
    /// Word boundaries for index keys and query terms
    static ref WORD_RE: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
}

/// Words shorter than this are not indexed
const MIN_WORD_LEN: usize = 2;

/// Inverted word → item-id index over parsed items.
///
/// Built from name/tvgName/genre/group; queries are substring-inclusive
/// against the index keys, with AND semantics across words.
#[derive(Debug, Default)]
pub struct SearchIndex {
    words: HashMap<String, HashSet<String>>,
    indexed_items: usize,
}

impl SearchIndex {
    pub fn build(items: &[MediaItem]) -> Self {
        let mut words: HashMap<String, HashSet<String>> = HashMap::new();

        for item in items {
            let fields = [
                Some(item.name.as_str()),
                item.tvg_name.as_deref(),
                Some(item.genre.as_str()),
                Some(item.group.as_str()),
            ];
            for field in fields.into_iter().flatten() {
                for word in tokenize(field) {
                    words.entry(word).or_default().insert(item.id.clone());
                }
            }
        }

        Self {
            words,
            indexed_items: items.len(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn indexed_items(&self) -> usize {
        self.indexed_items
    }

    /// Candidate item ids for a query. Single word: union of exact and
    /// substring key matches. Multiple words: intersection of the per-word
    /// candidate sets (AND semantics).
    pub fn query(&self, term: &str) -> HashSet<String> {
        let query_words: Vec<String> = term
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.to_string())
            .filter(|w| !w.is_empty())
            .collect();

        if query_words.is_empty() {
            return HashSet::new();
        }

        let mut result: Option<HashSet<String>> = None;
        for word in &query_words {
            let candidates = self.candidates_for(word);
            result = Some(match result {
                None => candidates,
                Some(acc) => acc.intersection(&candidates).cloned().collect(),
            });
            if result.as_ref().map(|r| r.is_empty()).unwrap_or(false) {
                break;
            }
        }

        result.unwrap_or_default()
    }

    /// Union of ids under every index key containing the word
    fn candidates_for(&self, word: &str) -> HashSet<String> {
        let mut ids: HashSet<String> = self.words.get(word).cloned().unwrap_or_default();
        for (key, set) in &self.words {
            if key != word && key.contains(word) {
                ids.extend(set.iter().cloned());
            }
        }
        ids
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .collect::<Vec<_>>()
        .into_iter()
}

/// Synchronous fallback used while the index is still building: whole-term
/// substring scan across the indexed fields
pub fn linear_search(items: &[MediaItem], term: &str) -> Vec<MediaItem> {
    let term_lower = term.to_lowercase();
    if term_lower.trim().is_empty() {
        return Vec::new();
    }

    items
        .iter()
        .filter(|item| {
            item.name.to_lowercase().contains(&term_lower)
                || item
                    .tvg_name
                    .as_deref()
                    .map(|n| n.to_lowercase().contains(&term_lower))
                    .unwrap_or(false)
                || item.genre.to_lowercase().contains(&term_lower)
                || item.group.to_lowercase().contains(&term_lower)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::parser::parse;

    const SAMPLE: &str = r#"#EXTM3U
#EXTINF:-1 tvg-id="" tvg-name="Duro de Matar" tvg-logo="" group-title="Filmes | Ação",Duro de Matar (1988)
http://example/x.mp4
#EXTINF:-1 tvg-id="" tvg-name="" tvg-logo="" group-title="Filmes | Ação",Máquina Mortífera (1987)
http://example/y.mp4
#EXTINF:-1 tvg-id="" tvg-name="" tvg-logo="" group-title="Séries",Breaking Bad S01E01
http://example/bb.mp4
"#;

    #[test]
    fn test_single_word_substring_match() {
        let items = parse(SAMPLE);
        let index = SearchIndex::build(&items);

        // "mata" is a substring of the indexed word "matar"
        let ids = index.query("mata");
        assert!(ids.contains("media-1"));
        assert!(!ids.contains("media-3"));
    }

    #[test]
    fn test_multi_word_and_semantics() {
        let items = parse(SAMPLE);
        let index = SearchIndex::build(&items);

        let ids = index.query("duro matar");
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("media-1"));

        // both words must match: "duro breaking" matches nothing
        assert!(index.query("duro breaking").is_empty());
    }

    #[test]
    fn test_genre_and_group_are_indexed() {
        let items = parse(SAMPLE);
        let index = SearchIndex::build(&items);

        let ids = index.query("ação");
        assert_eq!(ids.len(), 2);

        let ids = index.query("séries");
        assert!(ids.contains("media-3"));
    }

    #[test]
    fn test_case_insensitive() {
        let items = parse(SAMPLE);
        let index = SearchIndex::build(&items);
        assert_eq!(index.query("BREAKING"), index.query("breaking"));
    }

    #[test]
    fn test_empty_query_yields_nothing() {
        let items = parse(SAMPLE);
        let index = SearchIndex::build(&items);
        assert!(index.query("").is_empty());
        assert!(index.query("   ").is_empty());
    }

    #[test]
    fn test_linear_fallback_matches_indexed_fields() {
        let items = parse(SAMPLE);
        let results = linear_search(&items, "matar");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "media-1");

        // group substring
        let results = linear_search(&items, "filmes");
        assert_eq!(results.len(), 2);

        assert!(linear_search(&items, "").is_empty());
    }

    #[test]
    fn test_search_monotonicity_single_word() {
        let items = parse(SAMPLE);
        let index = SearchIndex::build(&items);
        let word = "bad";

        for id in index.query(word) {
            let item = items.iter().find(|i| i.id == id).unwrap();
            let haystack = format!(
                "{} {} {} {}",
                item.name,
                item.tvg_name.as_deref().unwrap_or(""),
                item.genre,
                item.group
            )
            .to_lowercase();
            assert!(haystack.contains(word));
        }
    }
}
