//! Cleanup service for expired catalog snapshots
//!
//! Runs as a background task on startup, then periodically. Deletes
//! snapshot/index/metadata triples whose expiry timestamp has passed.

use std::time::Duration;
use tokio::time;

use crate::services::cache::CatalogCache;

/// Configuration for the cleanup service
pub struct CleanupConfig {
    /// How often to run cleanup (in seconds)
    pub interval_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600, // Run every hour
        }
    }
}

/// Run a single cleanup cycle; returns how many snapshots were purged
pub async fn run_cleanup(cache: &CatalogCache) -> usize {
    match cache.purge_expired().await {
        Ok(count) => {
            if count > 0 {
                tracing::info!("Cleanup: purged {} expired snapshots", count);
            }
            count
        }
        Err(e) => {
            tracing::error!("Cleanup: snapshot purge failed: {}", e);
            0
        }
    }
}

/// Start the background cleanup task
///
/// Runs immediately on startup, then periodically at the configured interval.
/// This should be spawned as a background task using `tokio::spawn`.
pub async fn start_cleanup_task(cache: CatalogCache, config: CleanupConfig) {
    tracing::info!(
        "Starting cleanup task (interval: {}s)",
        config.interval_secs
    );

    // Run immediately on startup
    run_cleanup(&cache).await;

    // Then run periodically
    let mut interval = time::interval(Duration::from_secs(config.interval_secs));
    interval.tick().await; // first tick completes immediately

    loop {
        interval.tick().await;
        run_cleanup(&cache).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::parser::parse;

    #[tokio::test]
    async fn test_run_cleanup_purges_expired_only() {
        let dir = tempfile::tempdir().unwrap();
        let expired = CatalogCache::new(dir.path().to_str().unwrap(), -1, "old")
            .await
            .unwrap();
        let fresh = CatalogCache::new(dir.path().to_str().unwrap(), 60_000, "new")
            .await
            .unwrap();

        let items = parse("#EXTM3U\n#EXTINF:-1 group-title=\"Filmes\",A (2020)\nhttp://e/a\n");
        expired.save_items(&items).await.unwrap();
        fresh.save_items(&items).await.unwrap();

        assert_eq!(run_cleanup(&fresh).await, 1);
        assert!(fresh.has_snapshot().await);
        assert_eq!(run_cleanup(&fresh).await, 0);
    }
}
