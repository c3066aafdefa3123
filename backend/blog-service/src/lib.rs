/// Blog Service Library
///
/// Users publish posts into optional groups, comment on posts and follow
/// authors to get a personalized feed.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route registration
/// - `models`: Data structures for users, groups, posts, comments, follows
/// - `services`: Feed composition, follow graph and content mutations
/// - `db`: Storage seam with PostgreSQL and in-memory repositories
/// - `pagination`: Page-number slicing with boundary clamping
/// - `forms`: Typed post and comment payloads and their validation
/// - `media`: Uploaded image storage
/// - `cache`: Whole-response page cache
/// - `middleware`: Viewer resolution and ownership checks
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Observability and metrics collection
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod media;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
