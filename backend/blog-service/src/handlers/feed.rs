/// Feed handlers - global, group, profile and following feeds
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::warn;

use super::{requested_page, AppState, HttpSettings, PostResponse};
use crate::cache::CachedPage;
use crate::error::Result;
use crate::models::{AuthUser, Viewer};
use crate::pagination::Page;
use crate::services::{Feed, FeedContext, FeedScope};

pub const PAGE_CACHE_HEADER: &str = "X-Page-Cache";

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    #[serde(flatten)]
    pub scope: FeedScope,
    pub page: Page<PostResponse>,
}

impl FeedResponse {
    pub fn new(feed: Feed, settings: &HttpSettings) -> Self {
        Self {
            scope: feed.scope,
            page: feed
                .page
                .map(|post| PostResponse::from_view(post, settings)),
        }
    }
}

fn cache_key(req: &HttpRequest) -> String {
    match req.query_string() {
        "" => req.path().to_string(),
        query => format!("{}?{}", req.path(), query),
    }
}

/// Global feed. Whole responses are cached per path and query for the
/// configured TTL, so the page may lag the store until it expires or the
/// cache is cleared.
pub async fn index(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    let key = cache_key(&req);

    match state.page_cache.get(&key).await {
        Ok(Some(cached)) => {
            return Ok(HttpResponse::Ok()
                .content_type(cached.content_type)
                .insert_header((PAGE_CACHE_HEADER, "HIT"))
                .body(cached.body));
        }
        Ok(None) => {}
        Err(e) => warn!(key = %key, "Page cache read failed: {}", e),
    }

    // The global feed renders the same for every viewer.
    let feed = state
        .feeds
        .feed(FeedContext::Global, &Viewer::Anonymous, requested_page(&req))
        .await?;
    let body = serde_json::to_string(&FeedResponse::new(feed, &state.settings))?;

    let page = CachedPage::json(body);
    if let Err(e) = state
        .page_cache
        .put(&key, page.clone(), state.settings.page_cache_ttl)
        .await
    {
        warn!(key = %key, "Page cache write failed: {}", e);
    }

    Ok(HttpResponse::Ok()
        .content_type(page.content_type)
        .insert_header((PAGE_CACHE_HEADER, "MISS"))
        .body(page.body))
}

pub async fn group_posts(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    slug: web::Path<String>,
) -> Result<HttpResponse> {
    let feed = state
        .feeds
        .feed(
            FeedContext::Group {
                slug: slug.into_inner(),
            },
            &viewer,
            requested_page(&req),
        )
        .await?;

    Ok(HttpResponse::Ok().json(FeedResponse::new(feed, &state.settings)))
}

pub async fn profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let feed = state
        .feeds
        .feed(
            FeedContext::Profile {
                username: username.into_inner(),
            },
            &viewer,
            requested_page(&req),
        )
        .await?;

    Ok(HttpResponse::Ok().json(FeedResponse::new(feed, &state.settings)))
}

/// Posts from followed authors. Anonymous requests are sent to the login page
/// by the `AuthUser` extractor.
pub async fn follow_index(
    user: AuthUser,
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let feed = state
        .feeds
        .feed(
            FeedContext::Following,
            &Viewer::from(user),
            requested_page(&req),
        )
        .await?;

    Ok(HttpResponse::Ok().json(FeedResponse::new(feed, &state.settings)))
}
