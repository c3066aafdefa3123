use super::{CachedPage, PageCache};
use crate::error::Result;
use crate::metrics::blog::PAGE_CACHE_EVENTS;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

struct Entry {
    page: CachedPage,
    expires_at: Instant,
}

/// Process-wide page cache backed by a concurrent map.
#[derive(Default)]
pub struct InMemoryPageCache {
    entries: DashMap<String, Entry>,
}

impl InMemoryPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until they are next read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl PageCache for InMemoryPageCache {
    async fn get(&self, key: &str) -> Result<Option<CachedPage>> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                debug!(key = %key, "Page cache HIT");
                PAGE_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                return Ok(Some(entry.page.clone()));
            }
        }

        // Expired entries are evicted lazily.
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);

        debug!(key = %key, "Page cache MISS");
        PAGE_CACHE_EVENTS.with_label_values(&["miss"]).inc();
        Ok(None)
    }

    async fn put(&self, key: &str, page: CachedPage, ttl: Duration) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                page,
                expires_at: Instant::now() + ttl,
            },
        );
        PAGE_CACHE_EVENTS.with_label_values(&["store"]).inc();
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        debug!("Page cache cleared");
        PAGE_CACHE_EVENTS.with_label_values(&["clear"]).inc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_stored_page_until_cleared() {
        let cache = InMemoryPageCache::new();
        cache
            .put("/?page=1", CachedPage::json("{\"n\":1}"), Duration::from_secs(60))
            .await
            .unwrap();

        let hit = cache.get("/?page=1").await.unwrap();
        assert_eq!(hit, Some(CachedPage::json("{\"n\":1}")));
        assert_eq!(cache.get("/?page=2").await.unwrap(), None);

        cache.clear().await.unwrap();
        assert_eq!(cache.get("/?page=1").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = InMemoryPageCache::new();
        cache
            .put("/", CachedPage::json("stale"), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(cache.get("/").await.unwrap(), None);
        assert_eq!(cache.len(), 0);
    }
}
