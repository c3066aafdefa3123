//! Shared fixtures for the HTTP integration tests.
//!
//! Every test gets its own in-memory store, page cache and media directory.
#![allow(dead_code)]

use actix_web::web;
use blog_service::cache::InMemoryPageCache;
use blog_service::db::{BlogRepository, InMemoryBlogRepository};
use blog_service::handlers::{AppState, HttpSettings};
use blog_service::media::LocalBlobStore;
use blog_service::middleware::JwtVerifier;
use blog_service::models::{AuthUser, Group, NewGroup, NewPost, PostView};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Build the service the way the binary does, minus logging and CORS.
macro_rules! init_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.state.clone())
                .app_data(actix_web::web::Data::new(
                    blog_service::middleware::LoginRedirect::default(),
                ))
                .wrap(blog_service::middleware::ViewerMiddleware::new(
                    $ctx.verifier.clone(),
                ))
                .configure(blog_service::handlers::configure_routes)
                .default_service(actix_web::web::to(blog_service::handlers::not_found)),
        )
        .await
    };
}

pub struct TestContext {
    pub repo: Arc<InMemoryBlogRepository>,
    pub cache: Arc<InMemoryPageCache>,
    pub state: web::Data<AppState>,
    pub verifier: Arc<JwtVerifier>,
    pub media: tempfile::TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_page_size(10)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        let repo = Arc::new(InMemoryBlogRepository::new());
        let cache = Arc::new(InMemoryPageCache::new());
        let media = tempfile::tempdir().expect("create media dir");

        let state = web::Data::new(AppState::new(
            repo.clone(),
            Arc::new(LocalBlobStore::new(media.path())),
            cache.clone(),
            page_size,
            HttpSettings {
                page_cache_ttl: Duration::from_secs(20),
                media_url: "/media/".to_string(),
            },
        ));

        Self {
            repo,
            cache,
            state,
            verifier: Arc::new(JwtVerifier::new(TEST_SECRET)),
            media,
        }
    }

    /// Register a user in the store and return the identity a token carries.
    pub async fn user(&self, username: &str) -> AuthUser {
        let user = self
            .repo
            .ensure_user(Uuid::new_v4(), username)
            .await
            .expect("create user");
        AuthUser {
            id: user.id,
            username: user.username,
        }
    }

    /// An identity the store has never seen.
    pub fn external_user(&self, username: &str) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
        }
    }

    pub fn bearer(&self, user: &AuthUser) -> (&'static str, String) {
        let token = self.verifier.sign(user, 3600).expect("sign token");
        ("Authorization", format!("Bearer {}", token))
    }

    pub async fn group(&self, title: &str, slug: &str) -> Group {
        self.repo
            .create_group(NewGroup::new(title, slug, "Тестовое описание"))
            .await
            .expect("create group")
    }

    pub async fn post(&self, author: &AuthUser, text: &str, group_id: Option<i64>) -> PostView {
        self.repo
            .insert_post(NewPost {
                author_id: author.id,
                text: text.to_string(),
                group_id,
                image: None,
            })
            .await
            .expect("create post")
    }
}
