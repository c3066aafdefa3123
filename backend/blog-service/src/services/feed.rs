//! Feed composition.
//!
//! Every context resolves to a `PostFilter` over the store, is ordered newest
//! first, and is sliced by page number. The engine only reads.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::db::{BlogRepository, PostFilter};
use crate::error::{AppError, Result};
use crate::metrics::blog::{FEED_REQUEST_DURATION_SECONDS, FEED_REQUEST_TOTAL};
use crate::models::{Group, PostView, User, Viewer};
use crate::pagination::{Page, PageWindow};
use crate::services::FollowService;

/// Which posts a feed covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedContext {
    Global,
    Group { slug: String },
    Profile { username: String },
    /// Posts by authors the viewer follows. Requires an authenticated viewer.
    Following,
}

impl FeedContext {
    pub fn label(&self) -> &'static str {
        match self {
            FeedContext::Global => "global",
            FeedContext::Group { .. } => "group",
            FeedContext::Profile { .. } => "profile",
            FeedContext::Following => "following",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub author: User,
    pub posts_count: usize,
    /// Whether the current viewer follows this author
    pub following: bool,
}

/// Context-specific data returned alongside the posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "context", rename_all = "snake_case")]
pub enum FeedScope {
    Global,
    Group { group: Group },
    Profile { profile: ProfileSummary },
    Following,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    #[serde(flatten)]
    pub scope: FeedScope,
    pub page: Page<PostView>,
}

pub struct FeedService {
    repo: Arc<dyn BlogRepository>,
    follows: FollowService,
    page_size: usize,
}

impl FeedService {
    pub fn new(repo: Arc<dyn BlogRepository>, page_size: usize) -> Self {
        Self {
            follows: FollowService::new(repo.clone()),
            repo,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub async fn feed(&self, context: FeedContext, viewer: &Viewer, page: i64) -> Result<Feed> {
        self.feed_with_page_size(context, viewer, page, self.page_size)
            .await
    }

    /// Same as [`FeedService::feed`] with a call-site page size.
    pub async fn feed_with_page_size(
        &self,
        context: FeedContext,
        viewer: &Viewer,
        page: i64,
        page_size: usize,
    ) -> Result<Feed> {
        let label = context.label();
        let started = Instant::now();
        FEED_REQUEST_TOTAL.with_label_values(&[label]).inc();

        let (mut scope, filter) = self.resolve(context, viewer).await?;
        let page = self.page(&filter, page, page_size).await?;

        if let FeedScope::Profile { profile } = &mut scope {
            profile.posts_count = page.total_items;
        }

        FEED_REQUEST_DURATION_SECONDS
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());
        debug!(
            context = label,
            page = page.number,
            items = page.len(),
            total = page.total_items,
            "Feed composed"
        );

        Ok(Feed { scope, page })
    }

    async fn resolve(
        &self,
        context: FeedContext,
        viewer: &Viewer,
    ) -> Result<(FeedScope, PostFilter)> {
        match context {
            FeedContext::Global => Ok((FeedScope::Global, PostFilter::All)),
            FeedContext::Group { slug } => {
                let group = self
                    .repo
                    .find_group_by_slug(&slug)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("group '{}'", slug)))?;
                let filter = PostFilter::Group(group.id);
                Ok((FeedScope::Group { group }, filter))
            }
            FeedContext::Profile { username } => {
                let author = self
                    .repo
                    .find_user_by_username(&username)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("user '{}'", username)))?;
                let following = self.follows.viewer_follows(viewer, &author).await?;
                let filter = PostFilter::Author(author.id);
                let profile = ProfileSummary {
                    author,
                    posts_count: 0,
                    following,
                };
                Ok((FeedScope::Profile { profile }, filter))
            }
            FeedContext::Following => {
                let user_id = viewer.user_id().ok_or(AppError::Unauthenticated)?;
                let authors = self.follows.followed_authors(user_id).await?;
                Ok((FeedScope::Following, PostFilter::Authors(authors)))
            }
        }
    }

    async fn page(
        &self,
        filter: &PostFilter,
        requested: i64,
        page_size: usize,
    ) -> Result<Page<PostView>> {
        let total = match filter {
            PostFilter::Authors(authors) if authors.is_empty() => 0,
            _ => self.repo.count_posts(filter).await?,
        };
        let window = PageWindow::resolve(total, requested, page_size);

        let items = if window.is_empty() {
            Vec::new()
        } else {
            self.repo
                .list_posts(filter, window.offset(), window.size)
                .await?
        };

        Ok(Page::from_window(items, window))
    }
}
