/// Business logic layer for blog-service
///
/// This module provides high-level operations:
/// - Follow service: follow graph edges and lookups
/// - Feed service: global, group, profile and following feeds
/// - Post service: post creation, editing and detail
/// - Comment service: comments on posts
pub mod comments;
pub mod feed;
pub mod follow;
pub mod posts;

// Re-export commonly used services
pub use comments::CommentService;
pub use feed::{Feed, FeedContext, FeedScope, FeedService, ProfileSummary};
pub use follow::FollowService;
pub use posts::{PostDetail, PostService};
