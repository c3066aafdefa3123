//! Storage for uploaded post images.
//!
//! The store hands back a reference path (`posts/<file>`); the public URL is
//! the configured media URL prefix joined with that reference.

use std::path::PathBuf;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

/// Directory (and reference prefix) post images live under.
pub const POSTS_DIR: &str = "posts";

#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return the reference path of the stored file.
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String>;
}

/// Writes images below a local media root.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.root.join(POSTS_DIR);
        fs::create_dir_all(&dir).await?;

        let file_name = format!("{}_{}", Uuid::new_v4().simple(), name);
        fs::write(dir.join(&file_name), bytes).await?;

        let reference = format!("{}/{}", POSTS_DIR, file_name);
        info!(reference = %reference, size = bytes.len(), "Stored post image");
        Ok(reference)
    }
}

/// Public URL of a stored reference.
pub fn media_url(prefix: &str, reference: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        reference.trim_start_matches('/')
    )
}
