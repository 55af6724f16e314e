use std::collections::HashMap;

use crate::models::{Category, ContentByType, FeaturedContent, GenreBucket, MediaItem, MediaType};
use crate::services::classifier::DEFAULT_GENRE;

/// Homepage rails never exceed this many items
const FEATURED_RAIL_CAP: usize = 10;

/// Category-level type from the group name alone. `None` means the group is
/// ambiguous and item-level classification stands.
pub fn infer_category_type(group: &str) -> Option<MediaType> {
    let group_lower = group.to_lowercase();
    if group_lower.contains("filme") || group_lower.contains("movie") {
        Some(MediaType::Movie)
    } else if group_lower.contains("série") || group_lower.contains("serie") {
        Some(MediaType::Series)
    } else if group_lower.contains("canal")
        || group_lower.contains("channel")
        || group_lower.contains("tv")
    {
        Some(MediaType::Channel)
    } else {
        None
    }
}

/// Bucket items by raw `group-title`, first-seen order preserved
pub fn organize_by_categories(items: &[MediaItem]) -> Vec<Category> {
    let mut categories: Vec<Category> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let idx = match index.get(&item.group) {
            Some(idx) => *idx,
            None => {
                categories.push(Category {
                    id: format!("category-{}", categories.len() + 1),
                    name: item.group.clone(),
                    category_type: infer_category_type(&item.group).unwrap_or(MediaType::Channel),
                    items: Vec::new(),
                });
                index.insert(item.group.clone(), categories.len() - 1);
                categories.len() - 1
            }
        };
        categories[idx].items.push(item.clone());
    }

    categories
}

/// Split items by authoritative content type.
///
/// A decisive category name wins over the item's parse-time type; only
/// keyword-free groups fall back to item-level classification. Overrides are
/// debug-logged so the reclassification is observable.
pub fn organize_by_content_type(items: &[MediaItem]) -> ContentByType {
    let mut result = ContentByType::default();

    for category in organize_by_categories(items) {
        match infer_category_type(&category.name) {
            Some(category_type) => {
                for mut item in category.items {
                    if item.media_type != category_type {
                        tracing::debug!(
                            item = %item.id,
                            from = %item.media_type,
                            to = %category_type,
                            group = %category.name,
                            "category type overrides item type"
                        );
                        item.media_type = category_type;
                    }
                    push_by_type(&mut result, item, category_type);
                }
            }
            None => {
                for item in category.items {
                    let media_type = item.media_type;
                    push_by_type(&mut result, item, media_type);
                }
            }
        }
    }

    result
}

fn push_by_type(result: &mut ContentByType, item: MediaItem, media_type: MediaType) {
    match media_type {
        MediaType::Movie => result.movies.push(item),
        MediaType::Series => result.series.push(item),
        MediaType::Channel => result.channels.push(item),
    }
}

/// Bucket items by derived genre (global, not type-scoped)
pub fn organize_by_genre(items: &[MediaItem]) -> Vec<GenreBucket> {
    let mut genres: Vec<GenreBucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        if item.genre.is_empty() {
            continue;
        }
        let idx = match index.get(&item.genre) {
            Some(idx) => *idx,
            None => {
                genres.push(GenreBucket {
                    id: format!("genre-{}", genres.len() + 1),
                    name: item.genre.clone(),
                    items: Vec::new(),
                });
                index.insert(item.genre.clone(), genres.len() - 1);
                genres.len() - 1
            }
        };
        genres[idx].items.push(item.clone());
    }

    genres
}

/// Three fixed homepage rails: new items, featured movies, featured series
pub fn featured_content(items: &[MediaItem]) -> Vec<FeaturedContent> {
    let featured: Vec<&MediaItem> = items.iter().filter(|i| i.is_featured).collect();

    vec![
        FeaturedContent {
            id: "featured-new".to_string(),
            title: "Novidades".to_string(),
            items: items
                .iter()
                .filter(|i| i.is_new)
                .take(FEATURED_RAIL_CAP)
                .cloned()
                .collect(),
        },
        FeaturedContent {
            id: "featured-movies".to_string(),
            title: "Filmes em Destaque".to_string(),
            items: featured
                .iter()
                .filter(|i| i.media_type == MediaType::Movie)
                .take(FEATURED_RAIL_CAP)
                .map(|i| (*i).clone())
                .collect(),
        },
        FeaturedContent {
            id: "featured-series".to_string(),
            title: "Séries em Destaque".to_string(),
            items: featured
                .iter()
                .filter(|i| i.media_type == MediaType::Series)
                .take(FEATURED_RAIL_CAP)
                .map(|i| (*i).clone())
                .collect(),
        },
    ]
}

/// Type → genre → items drill-down map. Series buckets hold only parents and
/// standalone records; movies and channels hold every item.
pub fn organize_by_type_and_genre(
    items: &[MediaItem],
) -> HashMap<String, HashMap<String, Vec<MediaItem>>> {
    let mut by_genre: HashMap<String, HashMap<String, Vec<MediaItem>>> = HashMap::new();
    for bucket in ["movies", "series", "channels"] {
        by_genre.insert(bucket.to_string(), HashMap::new());
    }

    for item in items {
        let genre = if item.genre.is_empty() {
            DEFAULT_GENRE.to_string()
        } else {
            item.genre.clone()
        };

        if item.media_type == MediaType::Series && item.is_episode() {
            continue;
        }

        let bucket = by_genre
            .get_mut(item.media_type.plural())
            .expect("fixed type buckets");
        let entries = bucket.entry(genre).or_default();
        if entries.iter().any(|existing| existing.id == item.id) {
            continue;
        }
        entries.push(item.clone());
    }

    by_genre
}
