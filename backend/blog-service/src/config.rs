/// Configuration management for Blog Service
///
/// Loads configuration from environment variables (a `.env` file is read first
/// when present).
use crate::pagination::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Feed pagination and page cache
    pub feed: FeedConfig,
    /// Identity provider settings
    pub auth: AuthConfig,
    /// Uploaded image storage
    pub media: MediaConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    /// Database URL
    #[serde(skip_serializing)]
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
    /// Min connections in pool
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Apply embedded migrations at startup
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Posts per page
    pub page_size: usize,
    /// Lifetime of a cached global feed response
    pub cache_ttl_secs: u64,
    pub cache_backend: CacheBackend,
    /// Redis URL, used when `cache_backend` is redis
    pub redis_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Where anonymous users are sent for actions that need a login
    pub login_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory uploaded images are written to
    pub root: String,
    /// Public URL prefix for stored images
    pub url: String,
}

const DEV_JWT_SECRET: &str = "blog-service-development-secret";

/// Login page used when `LOGIN_URL` is not set.
pub const DEFAULT_LOGIN_URL: &str = "/auth/login/";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();

        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let app = AppConfig {
            env: app_env.clone(),
            host: std::env::var("BLOG_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env_or_default("BLOG_SERVICE_PORT", 8080)?,
            json_logs: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        };

        let cors = {
            let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                Ok(value) => value,
                Err(_) if production => {
                    return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                }
                Err(_) => "http://localhost:3000".to_string(),
            };

            if production && allowed_origins.trim() == "*" {
                return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
            }

            CorsConfig { allowed_origins }
        };

        let database = DatabaseConfig {
            backend: parse_env_or_default("STORAGE_BACKEND", StorageBackend::Postgres)?,
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/blog".to_string()),
            max_connections: parse_env_or_default("DB_MAX_CONNECTIONS", 10)?,
            min_connections: parse_env_or_default("DB_MIN_CONNECTIONS", 1)?,
            acquire_timeout_secs: parse_env_or_default("DB_ACQUIRE_TIMEOUT_SECS", 10)?,
            run_migrations: parse_env_or_default("DB_RUN_MIGRATIONS", true)?,
        };

        let page_size: usize = parse_env_or_default("FEED_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err("FEED_PAGE_SIZE must be greater than zero".to_string());
        }

        let feed = FeedConfig {
            page_size,
            cache_ttl_secs: parse_env_or_default("FEED_CACHE_TTL_SECS", 20)?,
            cache_backend: parse_env_or_default("FEED_CACHE_BACKEND", CacheBackend::Memory)?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        };

        let auth = AuthConfig {
            jwt_secret: match std::env::var("JWT_SECRET") {
                Ok(secret) if !secret.trim().is_empty() => secret,
                _ if production => {
                    return Err("JWT_SECRET must be set in production".to_string())
                }
                _ => DEV_JWT_SECRET.to_string(),
            },
            login_url: std::env::var("LOGIN_URL").unwrap_or_else(|_| DEFAULT_LOGIN_URL.to_string()),
        };

        let media = MediaConfig {
            root: std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
            url: std::env::var("MEDIA_URL").unwrap_or_else(|_| "/media/".to_string()),
        };

        Ok(Config {
            app,
            cors,
            database,
            feed,
            auth,
            media,
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "APP_ENV",
        "CORS_ALLOWED_ORIGINS",
        "FEED_PAGE_SIZE",
        "FEED_CACHE_BACKEND",
        "JWT_SECRET",
        "STORAGE_BACKEND",
        "BLOG_SERVICE_PORT",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_default_values() {
        clear_env();

        let config = Config::from_env().unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.app.port, 8080);
        assert_eq!(config.feed.page_size, 10);
        assert_eq!(config.feed.cache_ttl_secs, 20);
        assert_eq!(config.feed.cache_backend, CacheBackend::Memory);
        assert_eq!(config.database.backend, StorageBackend::Postgres);
        assert_eq!(config.auth.login_url, "/auth/login/");
        assert_eq!(config.auth.jwt_secret, DEV_JWT_SECRET);
    }

    #[test]
    #[serial]
    fn test_zero_page_size_rejected() {
        clear_env();
        std::env::set_var("FEED_PAGE_SIZE", "0");

        let err = Config::from_env().unwrap_err();
        assert!(err.contains("FEED_PAGE_SIZE"));

        std::env::set_var("FEED_PAGE_SIZE", "ten");
        let err = Config::from_env().unwrap_err();
        assert!(err.contains("Failed to parse FEED_PAGE_SIZE"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_production_requires_secrets() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://blog.example.com");

        let err = Config::from_env().unwrap_err();
        assert!(err.contains("JWT_SECRET"));

        std::env::set_var("JWT_SECRET", "s3cret");
        std::env::set_var("STORAGE_BACKEND", "memory");
        let config = Config::from_env().unwrap();
        assert!(config.app.is_production());
        assert_eq!(config.database.backend, StorageBackend::Memory);

        clear_env();
    }
}
