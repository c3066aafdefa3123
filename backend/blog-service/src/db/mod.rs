/// Database access layer
///
/// This module provides:
/// - `BlogRepository`: the storage seam every service talks to
/// - `PgBlogRepository`: PostgreSQL implementation (source of truth)
/// - `InMemoryBlogRepository`: process-local implementation for tests and local runs
/// - Connection pool creation and embedded migrations
pub mod memory;
pub mod postgres;

pub use memory::InMemoryBlogRepository;
pub use postgres::PgBlogRepository;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{
    Comment, CommentView, Follow, Group, NewComment, NewGroup, NewPost, PostChanges, PostView,
    User,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Which posts a listing covers. Every listing is ordered newest first,
/// ties broken by id descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(i64),
    Author(Uuid),
    Authors(Vec<Uuid>),
}

/// Storage operations for users, groups, posts, comments and follow edges.
///
/// Implementations own referential integrity:
/// - deleting a user removes their posts, comments and follow edges
/// - deleting a group clears `group` on its posts
/// - deleting a post removes its comments
/// - a (user, author) follow pair is stored at most once, and never with user == author
#[async_trait::async_trait]
pub trait BlogRepository: Send + Sync {
    /// Insert or refresh the mirrored record of an external identity.
    async fn ensure_user(&self, id: Uuid, username: &str) -> Result<User>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Returns false when the user did not exist.
    async fn delete_user(&self, id: Uuid) -> Result<bool>;

    /// Fails with `Conflict` when the slug is taken.
    async fn create_group(&self, group: NewGroup) -> Result<Group>;

    async fn find_group(&self, id: i64) -> Result<Option<Group>>;

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>>;

    async fn list_groups(&self) -> Result<Vec<Group>>;

    async fn delete_group(&self, id: i64) -> Result<bool>;

    async fn insert_post(&self, post: NewPost) -> Result<PostView>;

    /// Returns `None` when the post does not exist.
    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Option<PostView>>;

    async fn find_post(&self, id: i64) -> Result<Option<PostView>>;

    async fn delete_post(&self, id: i64) -> Result<bool>;

    async fn count_posts(&self, filter: &PostFilter) -> Result<usize>;

    async fn list_posts(
        &self,
        filter: &PostFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<PostView>>;

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment>;

    /// Comments on a post, newest first, authors resolved.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>>;

    /// Atomic check-and-insert. Returns the stored edge and whether this call created it.
    async fn insert_follow_if_absent(&self, user_id: Uuid, author_id: Uuid)
        -> Result<(Follow, bool)>;

    async fn delete_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool>;

    async fn find_follow(&self, user_id: Uuid, author_id: Uuid) -> Result<Option<Follow>>;

    /// Authors followed by `user_id`, ordered by author id descending.
    async fn followed_author_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>>;

    /// Health check (optional)
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Create a PostgreSQL connection pool and optionally apply migrations.
pub async fn create_pool(config: &DatabaseConfig) -> std::result::Result<PgPool, sqlx::Error> {
    info!(
        "Database Pool Configuration: max_connections={}, min_connections={}, acquire_timeout={}s",
        config.max_connections, config.min_connections, config.acquire_timeout_secs
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await?;

    if config.run_migrations {
        run_migrations(&pool).await?;
    }

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
