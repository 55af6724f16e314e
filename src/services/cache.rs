use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::path::PathBuf;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

use crate::models::MediaItem;
use crate::services::position_index::PositionIndex;

/// Snapshot metadata stored in .meta.json; its timestamp governs the item
/// snapshot and the position index alike
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub hash: String,
    pub item_count: usize,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Disk-based cache for the parsed catalog: item snapshot as .ndjson
/// (newline-delimited JSON), position index as .json, shared metadata with a
/// 24h expiry. Read/write failures degrade to cache misses, never to errors
/// surfaced to callers.
#[derive(Clone)]
pub struct CatalogCache {
    cache_dir: PathBuf,
    ttl_ms: i64,
    hash: String,
}

impl CatalogCache {
    /// Create the cache directory and bind the fixed source key
    pub async fn new(cache_dir: &str, ttl_ms: i64, source_key: &str) -> Result<Self> {
        let cache_dir = PathBuf::from(cache_dir);
        fs::create_dir_all(&cache_dir)
            .await
            .context("Failed to create cache directory")?;

        Ok(Self {
            cache_dir,
            ttl_ms,
            hash: Self::hash_key(source_key),
        })
    }

    /// SHA-1 hex of the source identity, used as the cache key
    pub fn hash_key(source: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Valid (non-expired) snapshot metadata, or None
    pub async fn read_meta(&self) -> Option<SnapshotMeta> {
        let content = match fs::read_to_string(self.meta_path()).await {
            Ok(content) => content,
            Err(_) => return None,
        };

        let meta: SnapshotMeta = match serde_json::from_str(&content) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("Failed to parse cache metadata: {}", e);
                return None;
            }
        };

        let now = chrono::Utc::now().timestamp_millis();
        if meta.expires_at <= now {
            tracing::info!(hash = %meta.hash, "snapshot expired, ignoring cache");
            return None;
        }

        Some(meta)
    }

    /// Load the item snapshot when it is still valid
    pub async fn load_items(&self) -> Option<Vec<MediaItem>> {
        let meta = self.read_meta().await?;

        let file = match File::open(self.items_path()).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Snapshot file missing or unreadable: {}", e);
                return None;
            }
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::with_capacity(meta.item_count);

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<MediaItem>(&line) {
                        Ok(item) => items.push(item),
                        Err(e) => {
                            tracing::warn!("Corrupt snapshot line, treating as miss: {}", e);
                            return None;
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Snapshot read failed: {}", e);
                    return None;
                }
            }
        }

        tracing::info!(items = items.len(), "catalog loaded from snapshot");
        Some(items)
    }

    /// Persist the item snapshot and refresh the shared timestamp
    pub async fn save_items(&self, items: &[MediaItem]) -> Result<()> {
        let path = self.items_path();
        let tmp_path = self.items_tmp_path();
        let file = File::create(&tmp_path).await?;
        let mut writer = BufWriter::new(file);

        for item in items {
            let line = serde_json::to_string(item)?;
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }

        writer.flush().await?;
        writer.get_ref().sync_all().await?;
        drop(writer);

        // Atomic replace to avoid readers seeing partial writes
        let _ = fs::remove_file(&path).await;
        fs::rename(&tmp_path, &path).await?;

        let now = chrono::Utc::now().timestamp_millis();
        let meta = SnapshotMeta {
            hash: self.hash.clone(),
            item_count: items.len(),
            created_at: now,
            expires_at: now + self.ttl_ms,
        };
        self.write_meta(&meta).await?;

        tracing::info!(items = items.len(), hash = %self.hash, "snapshot saved");
        Ok(())
    }

    async fn write_meta(&self, meta: &SnapshotMeta) -> Result<()> {
        let path = self.meta_path();
        let tmp_path = self.meta_tmp_path();
        let content = serde_json::to_string_pretty(meta)?;

        let mut file = File::create(&tmp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;

        let _ = fs::remove_file(&path).await;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    /// Load the persisted position index when the snapshot is still valid
    pub async fn load_position_index(&self) -> Option<PositionIndex> {
        self.read_meta().await?;

        let content = fs::read_to_string(self.index_path()).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!("Corrupt position index, treating as miss: {}", e);
                None
            }
        }
    }

    pub async fn save_position_index(&self, index: &PositionIndex) -> Result<()> {
        let path = self.index_path();
        let tmp_path = self.index_tmp_path();
        let content = serde_json::to_string(index)?;

        let mut file = File::create(&tmp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;

        let _ = fs::remove_file(&path).await;
        fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    /// Remove all persisted entries for this source
    pub async fn clear(&self) -> Result<()> {
        let _ = fs::remove_file(self.items_path()).await;
        let _ = fs::remove_file(self.index_path()).await;
        let _ = fs::remove_file(self.meta_path()).await;
        tracing::info!(hash = %self.hash, "cache cleared");
        Ok(())
    }

    /// Delete expired snapshot triples (background cleanup). Returns how many
    /// snapshots were purged.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut purged = 0usize;
        let mut entries = fs::read_dir(&self.cache_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            if !name.ends_with(".meta.json") {
                continue;
            }

            let expired = match fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<SnapshotMeta>(&content) {
                    Ok(meta) => meta.expires_at <= now,
                    // unreadable metadata counts as expired
                    Err(_) => true,
                },
                Err(_) => true,
            };

            if expired {
                let hash = name.trim_end_matches(".meta.json");
                let _ = fs::remove_file(self.cache_dir.join(format!("{}.ndjson", hash))).await;
                let _ = fs::remove_file(self.cache_dir.join(format!("{}.index.json", hash))).await;
                let _ = fs::remove_file(&path).await;
                purged += 1;
            }
        }

        Ok(purged)
    }

    /// Total size of the cache directory in bytes
    pub async fn cache_size(&self) -> Result<u64> {
        let mut total_size = 0u64;
        let mut entries = fs::read_dir(&self.cache_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if let Ok(metadata) = entry.metadata().await {
                total_size += metadata.len();
            }
        }

        Ok(total_size)
    }

    /// Whether a valid snapshot currently exists
    pub async fn has_snapshot(&self) -> bool {
        self.read_meta().await.is_some()
    }

    // ============ Path Helpers ============

    fn items_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.ndjson", self.hash))
    }

    fn items_tmp_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.ndjson.tmp", self.hash))
    }

    fn index_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.index.json", self.hash))
    }

    fn index_tmp_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.index.json.tmp", self.hash))
    }

    fn meta_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.meta.json", self.hash))
    }

    fn meta_tmp_path(&self) -> PathBuf {
        self.cache_dir.join(format!("{}.meta.json.tmp", self.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::parser::parse;

    const SAMPLE: &str = "#EXTM3U\n\
        #EXTINF:-1 group-title=\"Filmes\",Matrix (1999)\n\
        http://example/matrix.mp4\n";

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CatalogCache::new(dir.path().to_str().unwrap(), 60_000, "src")
            .await
            .unwrap();

        let items = parse(SAMPLE);
        cache.save_items(&items).await.unwrap();

        assert!(cache.has_snapshot().await);
        let loaded = cache.load_items().await.expect("valid snapshot");
        assert_eq!(loaded.len(), items.len());
        assert_eq!(loaded[0].name, "Matrix");
    }

    #[tokio::test]
    async fn test_expired_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        // negative TTL: the snapshot is born expired
        let cache = CatalogCache::new(dir.path().to_str().unwrap(), -1, "src")
            .await
            .unwrap();

        cache.save_items(&parse(SAMPLE)).await.unwrap();

        assert!(!cache.has_snapshot().await);
        assert!(cache.load_items().await.is_none());
        assert!(cache.load_position_index().await.is_none());
    }

    #[tokio::test]
    async fn test_position_index_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CatalogCache::new(dir.path().to_str().unwrap(), 60_000, "src")
            .await
            .unwrap();

        cache.save_items(&parse(SAMPLE)).await.unwrap();
        let index = PositionIndex::build(SAMPLE);
        cache.save_position_index(&index).await.unwrap();

        let restored = cache.load_position_index().await.expect("index");
        assert_eq!(restored.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_meta_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CatalogCache::new(dir.path().to_str().unwrap(), 60_000, "src")
            .await
            .unwrap();

        cache.save_items(&parse(SAMPLE)).await.unwrap();
        fs::write(cache.meta_path(), "not json").await.unwrap();

        assert!(cache.load_items().await.is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CatalogCache::new(dir.path().to_str().unwrap(), 60_000, "src")
            .await
            .unwrap();

        cache.save_items(&parse(SAMPLE)).await.unwrap();
        cache
            .save_position_index(&PositionIndex::build(SAMPLE))
            .await
            .unwrap();

        cache.clear().await.unwrap();
        assert!(cache.load_items().await.is_none());
        assert_eq!(cache.cache_size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_expired_deletes_triple() {
        let dir = tempfile::tempdir().unwrap();
        let expired = CatalogCache::new(dir.path().to_str().unwrap(), -1, "old")
            .await
            .unwrap();
        expired.save_items(&parse(SAMPLE)).await.unwrap();

        let fresh = CatalogCache::new(dir.path().to_str().unwrap(), 60_000, "new")
            .await
            .unwrap();
        fresh.save_items(&parse(SAMPLE)).await.unwrap();

        let purged = fresh.purge_expired().await.unwrap();
        assert_eq!(purged, 1);
        assert!(fresh.has_snapshot().await);
    }
}
