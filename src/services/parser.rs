use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::models::{MediaItem, MediaType};
use crate::services::classifier::{ContentClassifier, Curation};

lazy_static! {
    /// Regex to parse EXTINF attributes (tvg-id="...", group-title="...", etc)
    static ref ATTR_REGEX: Regex = Regex::new(r#"([\w-]+)="([^"]*)""#).unwrap();
}

/// Group prefix that removes an entry from the pipeline entirely
const DROPPED_GROUP_PREFIX: &str = "canais";

/// Default group when the attribute is missing
const UNKNOWN_GROUP: &str = "Unknown";

/// Parsed EXTINF line, waiting for its URL line
#[derive(Debug, Clone)]
struct PendingEntry {
    tvg_id: Option<String>,
    tvg_name: Option<String>,
    tvg_logo: Option<String>,
    group: String,
    name: String,
}

/// Line machine state: either between entries, or holding a metadata line
/// whose URL has not arrived yet
enum ParserState {
    AwaitingEntry,
    AwaitingUrl(PendingEntry),
}

/// Result of a full parse pass
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub items: Vec<MediaItem>,
    /// #EXTINF lines seen, including dropped and URL-less ones
    pub entry_count: usize,
    /// Entries removed by the "Canais" drop rule
    pub dropped_channels: usize,
}

/// Validity signal for raw playlist text
pub fn has_playlist_header(text: &str) -> bool {
    text.contains("#EXTM3U")
}

/// Parse raw playlist text into catalog items with default curation
pub fn parse(text: &str) -> Vec<MediaItem> {
    parse_with_curation(text, &Curation::default()).items
}

/// Parse raw playlist text into catalog items.
///
/// Line-oriented two-state machine: an `#EXTINF:` line opens an entry, the
/// next non-empty non-comment line is its URL. Entries whose URL never
/// arrives are discarded; entries in a "Canais" group are dropped before any
/// classification.
pub fn parse_with_curation(text: &str, curation: &Curation) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let mut state = ParserState::AwaitingEntry;

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if line.starts_with("#EXTINF:") {
            outcome.entry_count += 1;
            let entry = parse_extinf(line);
            if is_dropped_group(&entry.group) {
                outcome.dropped_channels += 1;
                state = ParserState::AwaitingEntry;
            } else {
                // A metadata line with no URL is superseded by the next one
                state = ParserState::AwaitingUrl(entry);
            }
            continue;
        }

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // URL line completes the pending entry
        if let ParserState::AwaitingUrl(entry) =
            std::mem::replace(&mut state, ParserState::AwaitingEntry)
        {
            let seq = outcome.items.len() + 1;
            outcome.items.push(build_item(entry, line, seq, curation));
        }
    }

    tracing::debug!(
        entries = outcome.entry_count,
        emitted = outcome.items.len(),
        dropped_channels = outcome.dropped_channels,
        "playlist parsed"
    );

    outcome
}

/// "Canais"-grouped lines are filtered out of the catalog, not reclassified
fn is_dropped_group(group: &str) -> bool {
    group.to_lowercase().starts_with(DROPPED_GROUP_PREFIX)
}

/// Extract attributes and the trailing display name from an #EXTINF line.
/// Missing pieces degrade to absent fields, never errors.
fn parse_extinf(line: &str) -> PendingEntry {
    let mut attributes: HashMap<String, String> = HashMap::new();
    for caps in ATTR_REGEX.captures_iter(line) {
        let key = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        let value = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
        attributes.insert(key, value);
    }

    let group = attributes
        .get("group-title")
        .filter(|g| !g.is_empty())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_GROUP.to_string());

    // The display name follows the comma after the quoted attributes (titles
    // themselves may contain commas)
    let scan_from = line.rfind('"').map(|p| p + 1).unwrap_or(0);
    let name = line[scan_from..]
        .find(',')
        .map(|p| line[scan_from + p + 1..].trim().to_string())
        .unwrap_or_default();

    let attr = |key: &str| attributes.get(key).filter(|v| !v.is_empty()).cloned();

    PendingEntry {
        tvg_id: attr("tvg-id"),
        tvg_name: attr("tvg-name"),
        tvg_logo: attr("tvg-logo"),
        group,
        name,
    }
}

/// Run the classification/extraction pipeline over a completed entry
fn build_item(entry: PendingEntry, url: &str, seq: usize, curation: &Curation) -> MediaItem {
    let mut name = if entry.name.is_empty() {
        format!("Unknown {}", seq)
    } else {
        entry.name
    };

    let media_type = ContentClassifier::classify(&name, &entry.group);

    let (genre, cleaned) = ContentClassifier::derive_genre(&name, &entry.group, media_type);
    if let Some(cleaned) = cleaned {
        name = cleaned;
    }

    let (year, cleaned) = ContentClassifier::extract_year(&name);
    name = cleaned;

    let mut season = None;
    let mut episode = None;
    let mut description = None;
    if media_type == MediaType::Series {
        if let Some(marker) = ContentClassifier::extract_series_info(&name) {
            season = Some(marker.season);
            episode = Some(marker.episode);
            // the pre-split title survives as the episode description
            description = Some(name.clone());
            name = marker.series_name;
        }
    }

    let is_new = curation.is_new(year.as_deref());
    let is_featured = curation.is_featured(&name);

    MediaItem {
        id: format!("media-{}", seq),
        name,
        url: url.to_string(),
        media_type,
        group: entry.group,
        genre,
        description,
        year,
        season,
        episode,
        is_new,
        is_featured,
        tvg_id: entry.tvg_id,
        tvg_name: entry.tvg_name,
        logo: entry.tvg_logo.clone(),
        poster: entry.tvg_logo.clone(),
        tvg_logo: entry.tvg_logo,
        parent_id: None,
    }
}
