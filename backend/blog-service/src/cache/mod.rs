/// Whole-response caching layer
///
/// This module provides:
/// - `PageCache`: key -> rendered body store with per-entry expiry and an explicit clear
/// - `InMemoryPageCache`: process-local store (default)
/// - `RedisPageCache`: shared store for multi-instance deployments
///
/// A cached page is served verbatim until its TTL lapses or `clear()` runs, so
/// readers may observe content that lags the store by up to one TTL.
pub mod memory;
pub mod redis;

pub use memory::InMemoryPageCache;
pub use self::redis::RedisPageCache;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A rendered response body as it was sent to the first requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    pub content_type: String,
    pub body: String,
}

impl CachedPage {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            content_type: "application/json".to_string(),
            body: body.into(),
        }
    }
}

#[async_trait::async_trait]
pub trait PageCache: Send + Sync {
    /// Returns the entry for `key` unless it is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<CachedPage>>;

    async fn put(&self, key: &str, page: CachedPage, ttl: Duration) -> Result<()>;

    /// Drop every entry.
    async fn clear(&self) -> Result<()>;
}
