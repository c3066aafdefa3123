use redis::{aio::ConnectionManager, AsyncCommands, Pipeline};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{CachedPage, PageCache};
use crate::error::{AppError, Result};
use crate::metrics::blog::PAGE_CACHE_EVENTS;

const KEY_PREFIX: &str = "blog:page:v1:";

/// Page cache shared by every instance through Redis.
#[derive(Clone)]
pub struct RedisPageCache {
    redis: ConnectionManager,
}

impl RedisPageCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }

    fn page_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

#[async_trait::async_trait]
impl PageCache for RedisPageCache {
    async fn get(&self, key: &str) -> Result<Option<CachedPage>> {
        let redis_key = Self::page_key(key);
        let mut conn = self.redis.clone();

        match conn.get::<_, Option<String>>(&redis_key).await {
            Ok(Some(data)) => {
                debug!(key = %key, "Page cache HIT");
                PAGE_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                serde_json::from_str::<CachedPage>(&data).map(Some).map_err(|e| {
                    error!("Failed to deserialize cached page: {}", e);
                    PAGE_CACHE_EVENTS.with_label_values(&["error"]).inc();
                    AppError::Cache(format!("Cache deserialization error: {}", e))
                })
            }
            Ok(None) => {
                debug!(key = %key, "Page cache MISS");
                PAGE_CACHE_EVENTS.with_label_values(&["miss"]).inc();
                Ok(None)
            }
            Err(e) => {
                warn!("Redis read error for page cache: {}", e);
                PAGE_CACHE_EVENTS.with_label_values(&["error"]).inc();
                Err(AppError::Cache(e.to_string()))
            }
        }
    }

    async fn put(&self, key: &str, page: CachedPage, ttl: Duration) -> Result<()> {
        let redis_key = Self::page_key(key);
        let data = serde_json::to_string(&page)?;

        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(&redis_key, data, ttl.as_secs().max(1))
            .await
            .map_err(|e| {
                warn!("Failed to write page cache: {}", e);
                PAGE_CACHE_EVENTS.with_label_values(&["error"]).inc();
                AppError::Cache(e.to_string())
            })?;

        PAGE_CACHE_EVENTS.with_label_values(&["store"]).inc();
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let pattern = format!("{}*", KEY_PREFIX);
        let mut conn = self.redis.clone();
        let mut cursor: u64 = 0;
        let mut total_deleted = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let mut pipe = Pipeline::new();
                for key in &keys {
                    pipe.del(key);
                }
                pipe.query_async::<_, ()>(&mut conn).await?;
                total_deleted += keys.len();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(deleted = total_deleted, "Page cache cleared");
        PAGE_CACHE_EVENTS.with_label_values(&["clear"]).inc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(
            RedisPageCache::page_key("/?page=2"),
            "blog:page:v1:/?page=2"
        );
    }
}
