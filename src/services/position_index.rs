use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::MediaItem;
use crate::services::classifier::Curation;
use crate::services::parser;

lazy_static! {
    static ref TVG_ID_RE: Regex = Regex::new(r#"tvg-id="([^"]*)""#).unwrap();
}

/// Only words longer than this land in the partial-name index
const MIN_INDEX_WORD_LEN: usize = 3;

/// How far past the metadata line the URL is expected at most
const MAX_ENTRY_SPAN: usize = 5;

/// Raw-text line-offset index: resolves a single entry by id or name and
/// parses only that fragment, skipping the full-catalog parse.
///
/// Built by a lightweight single pass over the raw playlist text, not over
/// parsed items, and persisted alongside the item snapshot.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionIndex {
    /// tvg-id (or ordinal fallback) → metadata line number
    by_id: HashMap<String, usize>,
    /// lower-cased raw display name → metadata line number
    by_name: HashMap<String, usize>,
    /// significant name words → metadata line numbers
    by_word: HashMap<String, Vec<usize>>,
    entry_count: usize,
}

impl PositionIndex {
    pub fn build(text: &str) -> Self {
        let mut index = Self::default();

        for (line_no, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if !line.starts_with("#EXTINF:") {
                continue;
            }

            let id = TVG_ID_RE
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("item-{}", index.entry_count));

            let scan_from = line.rfind('"').map(|p| p + 1).unwrap_or(0);
            let name = line[scan_from..]
                .find(',')
                .map(|p| line[scan_from + p + 1..].trim().to_string())
                .unwrap_or_else(|| format!("Item {}", index.entry_count));

            index.by_id.insert(id, line_no);
            let name_lower = name.to_lowercase();
            for word in name_lower.split_whitespace() {
                if word.chars().count() > MIN_INDEX_WORD_LEN {
                    let lines = index.by_word.entry(word.to_string()).or_default();
                    if !lines.contains(&line_no) {
                        lines.push(line_no);
                    }
                }
            }
            index.by_name.insert(name_lower, line_no);
            index.entry_count += 1;
        }

        tracing::debug!(entries = index.entry_count, "position index built");
        index
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Metadata line for a lookup term: exact id, exact name, then the first
    /// significant-word hit
    pub fn locate(&self, term: &str) -> Option<usize> {
        if let Some(line) = self.by_id.get(term) {
            return Some(*line);
        }

        let term_lower = term.to_lowercase();
        if let Some(line) = self.by_name.get(&term_lower) {
            return Some(*line);
        }

        for word in term_lower.split_whitespace() {
            if word.chars().count() > MIN_INDEX_WORD_LEN {
                if let Some(lines) = self.by_word.get(word) {
                    if let Some(first) = lines.first() {
                        return Some(*first);
                    }
                }
            }
        }

        None
    }

    /// Slice one entry (metadata line through its URL line) out of the raw
    /// text, for fragment parsing
    pub fn slice_entry(text: &str, start_line: usize) -> String {
        let lines: Vec<&str> = text.lines().collect();
        if start_line >= lines.len() {
            return String::new();
        }

        let mut end = (start_line + 2).min(lines.len());
        for (i, line) in lines
            .iter()
            .enumerate()
            .take((start_line + MAX_ENTRY_SPAN).min(lines.len()))
            .skip(start_line + 1)
        {
            let line = line.trim();
            if !line.is_empty() && !line.starts_with('#') {
                end = i + 1;
                break;
            }
        }

        lines[start_line..end].join("\n")
    }
}

/// Resolve a single item from raw text via the position index, parsing only
/// the relevant fragment. Returns `None` when the index has no candidate or
/// the fragment does not parse into an item.
pub fn find_in_text(
    text: &str,
    index: &PositionIndex,
    term: &str,
    curation: &Curation,
) -> Option<MediaItem> {
    let start = index.locate(term)?;
    let fragment = PositionIndex::slice_entry(text, start);
    parser::parse_with_curation(&fragment, curation)
        .items
        .into_iter()
        .next()
}
