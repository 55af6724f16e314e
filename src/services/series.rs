use std::collections::{BTreeMap, HashMap};

use crate::models::{MediaItem, MediaType};
use crate::services::classifier::ContentClassifier;

/// Output of a reassembly pass.
///
/// `listing_items` is the browsable catalog view (episodes folded into their
/// parents); `all_items` additionally carries every original item, every
/// synthesized parent, and every episode record. `episodes_by_series` is
/// rebuilt wholesale on every pass and owned by the caller's snapshot.
#[derive(Debug, Default)]
pub struct SeriesContent {
    pub listing_items: Vec<MediaItem>,
    pub all_items: Vec<MediaItem>,
    pub episodes_by_series: HashMap<String, Vec<MediaItem>>,
}

/// Group episode-shaped series items into synthetic parent records plus
/// child episodes, keyed by the normalized series name.
pub fn organize_series(items: &[MediaItem]) -> SeriesContent {
    let mut parents: Vec<MediaItem> = Vec::new();
    let mut parent_index: HashMap<String, usize> = HashMap::new();
    let mut episodes: Vec<MediaItem> = Vec::new();

    for item in items.iter().filter(|i| i.media_type == MediaType::Series) {
        let item = clean_series_item(item.clone());

        // already an episode from a previous pass
        if item.parent_id.is_some() {
            continue;
        }

        // no season/episode: standalone series, passed through unchanged
        let (season, episode) = match (&item.season, &item.episode) {
            (Some(s), Some(e)) => (s.clone(), e.clone()),
            _ => continue,
        };

        let key = item.name.to_lowercase();
        let parent_idx = match parent_index.get(&key) {
            Some(idx) => *idx,
            None => {
                parents.push(make_parent(&item, &key));
                parent_index.insert(key, parents.len() - 1);
                parents.len() - 1
            }
        };

        let parent_id = parents[parent_idx].id.clone();
        episodes.push(make_episode(item, &parent_id, &season, &episode));
    }

    // Catalog view: original non-episode items plus one parent per series
    // group; grouped episodes are not independently browsable
    let mut listing_items: Vec<MediaItem> = items
        .iter()
        .filter(|item| {
            if item.media_type != MediaType::Series {
                return true;
            }
            if item.season.is_some() && item.episode.is_some() {
                return !parent_index.contains_key(&series_key(item));
            }
            true
        })
        .cloned()
        .collect();
    listing_items.extend(parents.iter().cloned());

    let mut all_items = items.to_vec();
    all_items.extend(parents.iter().cloned());
    all_items.extend(episodes.iter().cloned());

    let mut episodes_by_series: HashMap<String, Vec<MediaItem>> = HashMap::new();
    for episode in episodes {
        if let Some(parent_id) = episode.parent_id.clone() {
            episodes_by_series.entry(parent_id).or_default().push(episode);
        }
    }
    for list in episodes_by_series.values_mut() {
        list.sort_by_key(|e| (episode_number(&e.season), episode_number(&e.episode)));
    }

    tracing::debug!(
        series = parents.len(),
        episodes = episodes_by_series.values().map(|v| v.len()).sum::<usize>(),
        "series reassembled"
    );

    SeriesContent {
        listing_items,
        all_items,
        episodes_by_series,
    }
}

/// Group a series' episodes by season number (detail-page view)
pub fn episodes_by_season(episodes: &[MediaItem]) -> BTreeMap<u32, Vec<MediaItem>> {
    let mut seasons: BTreeMap<u32, Vec<MediaItem>> = BTreeMap::new();
    for episode in episodes {
        let season = match episode.season.as_deref().and_then(|s| s.parse::<u32>().ok()) {
            Some(s) => s,
            None => continue,
        };
        seasons.entry(season).or_default().push(episode.clone());
    }
    for list in seasons.values_mut() {
        list.sort_by_key(|e| episode_number(&e.episode));
    }
    seasons
}

fn episode_number(field: &Option<String>) -> u32 {
    field
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Idempotent name/season/episode cleanup: a no-op for items the parser
/// already split
fn clean_series_item(mut item: MediaItem) -> MediaItem {
    if let Some(marker) = ContentClassifier::extract_series_info(&item.name) {
        item.season = Some(marker.season);
        item.episode = Some(marker.episode);
        item.description = item.description.or_else(|| Some(item.name.clone()));
        item.name = marker.series_name;
    }
    item
}

/// Synthetic, non-playable record representing the whole show
fn make_parent(first_episode: &MediaItem, key: &str) -> MediaItem {
    MediaItem {
        id: format!("series-{}", ContentClassifier::series_slug(key)),
        name: first_episode.name.clone(),
        url: String::new(),
        media_type: MediaType::Series,
        group: first_episode.group.clone(),
        genre: first_episode.genre.clone(),
        description: Some(format!("Coletânea de episódios de {}", first_episode.name)),
        year: first_episode.year.clone(),
        season: None,
        episode: None,
        is_new: first_episode.is_new,
        is_featured: first_episode.is_featured,
        tvg_id: first_episode.tvg_id.clone(),
        tvg_name: first_episode.tvg_name.clone(),
        tvg_logo: first_episode.tvg_logo.clone(),
        logo: first_episode.logo.clone(),
        poster: first_episode.poster.clone(),
        parent_id: None,
    }
}

fn make_episode(mut item: MediaItem, parent_id: &str, season: &str, episode: &str) -> MediaItem {
    let original_description = item.description.take();
    let mut description = format!(
        "{} - Temporada {} Episódio {}",
        item.name,
        season.parse::<u32>().unwrap_or(0),
        episode.parse::<u32>().unwrap_or(0)
    );
    if let Some(original) = original_description {
        description.push_str(" - ");
        description.push_str(&original);
    }

    item.id = format!("{}-s{}e{}", parent_id, season, episode);
    item.parent_id = Some(parent_id.to_string());
    item.description = Some(description);
    item
}

/// Normalized grouping key: the title before any SxxExx marker, lower-cased
fn series_key(item: &MediaItem) -> String {
    ContentClassifier::extract_series_info(&item.name)
        .map(|m| m.series_name)
        .unwrap_or_else(|| item.name.clone())
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::parser::parse;

    const SAMPLE: &str = r#"#EXTM3U
#EXTINF:-1 tvg-id="" tvg-name="" tvg-logo="http://logo/bb.png" group-title="Séries",Breaking Bad S01E03
http://example/bb-s01e03.mp4
#EXTINF:-1 tvg-id="" tvg-name="" tvg-logo="http://logo/bb.png" group-title="Séries",Breaking Bad S01E01
http://example/bb-s01e01.mp4
#EXTINF:-1 tvg-id="" tvg-name="" tvg-logo="" group-title="Séries",Documentário Único
http://example/doc.mp4
#EXTINF:-1 tvg-id="" tvg-name="" tvg-logo="" group-title="Filmes",Matrix (1999)
http://example/matrix.mp4
"#;

    #[test]
    fn test_parent_synthesis() {
        let items = parse(SAMPLE);
        let content = organize_series(&items);

        let parent = content
            .all_items
            .iter()
            .find(|i| i.id == "series-breaking-bad")
            .expect("parent record");
        assert_eq!(parent.url, "");
        assert_eq!(parent.name, "Breaking Bad");
        assert_eq!(parent.logo.as_deref(), Some("http://logo/bb.png"));
        assert_eq!(
            parent.description.as_deref(),
            Some("Coletânea de episódios de Breaking Bad")
        );
    }

    #[test]
    fn test_episode_records() {
        let items = parse(SAMPLE);
        let content = organize_series(&items);

        let episode = content
            .all_items
            .iter()
            .find(|i| i.id == "series-breaking-bad-s01e03")
            .expect("episode record");
        assert_eq!(episode.parent_id.as_deref(), Some("series-breaking-bad"));
        assert_eq!(
            episode.description.as_deref(),
            Some("Breaking Bad - Temporada 1 Episódio 3 - Breaking Bad S01E03")
        );
    }

    #[test]
    fn test_parent_episode_consistency() {
        let items = parse(SAMPLE);
        let content = organize_series(&items);

        for item in &content.all_items {
            if let Some(parent_id) = &item.parent_id {
                let parents: Vec<_> = content
                    .all_items
                    .iter()
                    .filter(|p| &p.id == parent_id)
                    .collect();
                assert_eq!(parents.len(), 1, "exactly one parent for {}", item.id);
                assert_eq!(parents[0].url, "");
            }
        }
    }

    #[test]
    fn test_listing_excludes_episodes_includes_parent() {
        let items = parse(SAMPLE);
        let content = organize_series(&items);

        assert!(content
            .listing_items
            .iter()
            .any(|i| i.id == "series-breaking-bad"));
        // raw episode entries are folded away
        assert!(!content
            .listing_items
            .iter()
            .any(|i| i.name == "Breaking Bad" && !i.url.is_empty()));
        // non-series and standalone series pass through
        assert!(content.listing_items.iter().any(|i| i.name == "Matrix"));
        assert!(content
            .listing_items
            .iter()
            .any(|i| i.name == "Documentário Único"));
    }

    #[test]
    fn test_all_items_is_superset() {
        let items = parse(SAMPLE);
        let content = organize_series(&items);
        // originals + 1 parent + 2 episodes
        assert_eq!(content.all_items.len(), items.len() + 3);
        for original in &items {
            assert!(content.all_items.iter().any(|i| i.id == original.id));
        }
    }

    #[test]
    fn test_episode_index_sorted() {
        let items = parse(SAMPLE);
        let content = organize_series(&items);

        let episodes = content
            .episodes_by_series
            .get("series-breaking-bad")
            .expect("indexed episodes");
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].episode.as_deref(), Some("01"));
        assert_eq!(episodes[1].episode.as_deref(), Some("03"));
    }

    #[test]
    fn test_season_episode_padding_invariant() {
        let items = parse(SAMPLE);
        let content = organize_series(&items);

        for episode in content.all_items.iter().filter(|i| i.is_episode()) {
            let season = episode.season.as_deref().unwrap();
            let ep = episode.episode.as_deref().unwrap();
            assert_eq!(season.len(), 2);
            assert_eq!(ep.len(), 2);
            assert!(season.parse::<u32>().is_ok());
            assert!(ep.parse::<u32>().is_ok());
        }
    }

    #[test]
    fn test_episodes_by_season_grouping() {
        let items = parse(
            "#EXTM3U\n\
             #EXTINF:-1 group-title=\"Séries\",Dark S02E01\nhttp://e/1\n\
             #EXTINF:-1 group-title=\"Séries\",Dark S01E02\nhttp://e/2\n\
             #EXTINF:-1 group-title=\"Séries\",Dark S01E01\nhttp://e/3\n",
        );
        let content = organize_series(&items);
        let episodes = content.episodes_by_series.get("series-dark").unwrap();
        let seasons = episodes_by_season(episodes);

        let keys: Vec<u32> = seasons.keys().copied().collect();
        assert_eq!(keys, vec![1, 2]);
        assert_eq!(seasons[&1].len(), 2);
        assert_eq!(seasons[&1][0].episode.as_deref(), Some("01"));
    }

    #[test]
    fn test_reassembly_is_idempotent_over_all_items() {
        let items = parse(SAMPLE);
        let first = organize_series(&items);
        // feeding listing items back in must not synthesize duplicate parents
        let second = organize_series(&first.listing_items);
        let parents: Vec<_> = second
            .all_items
            .iter()
            .filter(|i| i.id == "series-breaking-bad")
            .collect();
        assert_eq!(parents.len(), 1);
    }
}
