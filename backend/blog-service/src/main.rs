use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use blog_service::cache::{InMemoryPageCache, PageCache, RedisPageCache};
use blog_service::config::{CacheBackend, Config, StorageBackend};
use blog_service::db::{self, BlogRepository, InMemoryBlogRepository, PgBlogRepository};
use blog_service::handlers::{self, AppState, HttpSettings};
use blog_service::media::LocalBlobStore;
use blog_service::middleware::{JwtVerifier, LoginRedirect, ViewerMiddleware};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(json_logs: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn build_repository(config: &Config) -> anyhow::Result<Arc<dyn BlogRepository>> {
    match config.database.backend {
        StorageBackend::Postgres => {
            let pool = db::create_pool(&config.database).await?;
            tracing::info!("Connected to PostgreSQL");
            Ok(Arc::new(PgBlogRepository::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(InMemoryBlogRepository::new()))
        }
    }
}

async fn build_page_cache(config: &Config) -> anyhow::Result<Arc<dyn PageCache>> {
    match config.feed.cache_backend {
        CacheBackend::Memory => Ok(Arc::new(InMemoryPageCache::new())),
        CacheBackend::Redis => {
            let cache = RedisPageCache::connect(&config.feed.redis_url).await?;
            tracing::info!("Page cache backed by Redis");
            Ok(Arc::new(cache))
        }
    }
}

/// Blog Service
///
/// Serves the global, group, profile and following feeds, post detail and
/// the post, comment and follow mutations.
///
/// # Routes
///
/// - `/`, `/group/{slug}/`, `/profile/{username}/`, `/follow/` - feeds
/// - `/posts/{id}/`, `/create/`, `/posts/{id}/edit/`, `/posts/{id}/comment/` - content
/// - `/profile/{username}/follow/`, `/profile/{username}/unfollow/` - follow graph
/// - `/api/v1/health`, `/api/v1/health/live`, `/metrics` - operations
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.app.json_logs);

    tracing::info!(
        env = %config.app.env,
        page_size = config.feed.page_size,
        "Starting blog-service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let repo = build_repository(&config).await?;
    let page_cache = build_page_cache(&config).await?;
    let blobs = Arc::new(LocalBlobStore::new(&config.media.root));

    let state = web::Data::new(AppState::new(
        repo,
        blobs,
        page_cache,
        config.feed.page_size,
        HttpSettings {
            page_cache_ttl: Duration::from_secs(config.feed.cache_ttl_secs),
            media_url: config.media.url.clone(),
        },
    ));
    let login = web::Data::new(LoginRedirect {
        login_url: config.auth.login_url.clone(),
    });
    let verifier = Arc::new(JwtVerifier::new(&config.auth.jwt_secret));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server on {}", bind_address);

    let cors_origins = config.cors.allowed_origins.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in cors_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(state.clone())
            .app_data(login.clone())
            .wrap(ViewerMiddleware::new(verifier.clone()))
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure_routes)
            .default_service(web::to(handlers::not_found))
    })
    .bind(&bind_address)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, draining connections");
    server_handle.stop(true).await;

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e.into()),
        Err(e) => tracing::error!("HTTP server task failed: {}", e),
    }

    tracing::info!("blog-service stopped");
    Ok(())
}
