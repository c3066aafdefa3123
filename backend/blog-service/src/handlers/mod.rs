/// HTTP handlers for blog endpoints
///
/// This module contains handlers for:
/// - Feeds: global index (page cached), group, profile and following feeds
/// - Posts: detail, create and edit forms
/// - Comments: adding comments to posts
/// - Follow: following and unfollowing authors
/// - Health: liveness and store checks
pub mod comments;
pub mod feed;
pub mod follow;
pub mod health;
pub mod posts;

use actix_web::http::header::LOCATION;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::PageCache;
use crate::db::BlogRepository;
use crate::media::{media_url, BlobStore};
use crate::models::{Group, PostView, User};
use crate::pagination::PageQuery;
use crate::services::{CommentService, FeedService, FollowService, PostService};

/// Settings the HTTP layer needs beyond the services.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Lifetime of a cached global feed page
    pub page_cache_ttl: Duration,
    /// Public prefix for stored images
    pub media_url: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            page_cache_ttl: Duration::from_secs(20),
            media_url: "/media/".to_string(),
        }
    }
}

/// Shared application state handed to every handler.
pub struct AppState {
    pub repo: Arc<dyn BlogRepository>,
    pub feeds: FeedService,
    pub follows: FollowService,
    pub posts: PostService,
    pub comments: CommentService,
    pub page_cache: Arc<dyn PageCache>,
    pub settings: HttpSettings,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn BlogRepository>,
        blobs: Arc<dyn BlobStore>,
        page_cache: Arc<dyn PageCache>,
        page_size: usize,
        settings: HttpSettings,
    ) -> Self {
        Self {
            feeds: FeedService::new(repo.clone(), page_size),
            follows: FollowService::new(repo.clone()),
            posts: PostService::new(repo.clone(), blobs),
            comments: CommentService::new(repo.clone()),
            repo,
            page_cache,
            settings,
        }
    }
}

/// Register every route of the service.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(crate::metrics::serve_metrics))
        .route("/api/v1/health", web::get().to(health::health_summary))
        .route("/api/v1/health/live", web::get().to(health::liveness_check))
        .route("/", web::get().to(feed::index))
        .route("/follow/", web::get().to(feed::follow_index))
        .route("/group/{slug}/", web::get().to(feed::group_posts))
        .route("/profile/{username}/", web::get().to(feed::profile))
        .service(
            web::resource("/profile/{username}/follow/")
                .route(web::get().to(follow::profile_follow))
                .route(web::post().to(follow::profile_follow)),
        )
        .service(
            web::resource("/profile/{username}/unfollow/")
                .route(web::get().to(follow::profile_unfollow))
                .route(web::post().to(follow::profile_unfollow)),
        )
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::create_form))
                .route(web::post().to(posts::post_create)),
        )
        .route("/posts/{post_id}/", web::get().to(posts::post_detail))
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(posts::edit_form))
                .route(web::post().to(posts::post_edit)),
        )
        .route(
            "/posts/{post_id}/comment/",
            web::post().to(comments::add_comment),
        );
}

/// Fallback for unknown routes.
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "error": "Not found: page",
        "status": 404,
        "path": req.path(),
    }))
}

pub(crate) fn redirect(location: impl Into<String>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, location.into()))
        .finish()
}

pub(crate) fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub(crate) fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

/// `?page=` from the raw query string. Unparseable input means page 1.
pub(crate) fn requested_page(req: &HttpRequest) -> i64 {
    web::Query::<PageQuery>::from_query(req.query_string())
        .map(|q| q.number())
        .unwrap_or(1)
}

/// A post as rendered in responses.
#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub id: i64,
    pub text: String,
    pub author: User,
    pub group: Option<Group>,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub created_at: String,
}

impl PostResponse {
    pub fn from_view(post: PostView, settings: &HttpSettings) -> Self {
        let image_url = post
            .image
            .as_deref()
            .map(|reference| media_url(&settings.media_url, reference));

        Self {
            id: post.id,
            text: post.text,
            author: post.author,
            group: post.group,
            image: post.image,
            image_url,
            created_at: post.created_at.to_rfc3339(),
        }
    }
}
