//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use imchat_core::{InvalidationScope, PoolConfig, DEFAULT_PAGE_SIZE};
use tracing::warn;

/// Runtime configuration for imchat-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8888"`).
    pub bind_address: String,

    /// SQLite database URL (default: `"sqlite://imchat.db"`).
    pub database_url: String,

    /// Connection pool sizing for the message store.
    pub pool: PoolConfig,

    /// Page size used when a pull asks for `limit = 0`.
    pub default_page_size: u32,

    /// Cursor-cache entries dropped on every append.
    pub cache_invalidation: InvalidationScope,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Serve Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,

    /// Comma-separated CORS origin allow-list; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = PoolConfig::default();
        Self {
            bind_address: env_or("IMCHAT_BIND", "0.0.0.0:8888"),
            database_url: env_or("IMCHAT_DATABASE_URL", "sqlite://imchat.db"),
            pool: PoolConfig {
                max_connections: parse_env("IMCHAT_DB_MAX_CONNECTIONS", defaults.max_connections),
                idle_timeout: Some(Duration::from_secs(parse_env(
                    "IMCHAT_DB_IDLE_TIMEOUT_SECS",
                    600,
                ))),
                max_lifetime: Some(Duration::from_secs(parse_env(
                    "IMCHAT_DB_MAX_LIFETIME_SECS",
                    900,
                ))),
                ..defaults
            },
            default_page_size: parse_env("IMCHAT_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            cache_invalidation: parse_env("IMCHAT_CACHE_INVALIDATION", InvalidationScope::default()),
            log_level: env_or("IMCHAT_LOG", "info"),
            log_json: flag("IMCHAT_LOG_JSON", false),
            enable_swagger: flag("IMCHAT_ENABLE_SWAGGER", true),
            cors_allowed_origins: std::env::var("IMCHAT_CORS_ORIGINS").ok(),
        }
    }
}

/// In-memory database, no Swagger UI; shared by the router tests.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".into(),
        database_url: "sqlite::memory:".into(),
        pool: PoolConfig::default(),
        default_page_size: DEFAULT_PAGE_SIZE,
        cache_invalidation: InvalidationScope::Reverse,
        log_level: "info".into(),
        log_json: false,
        enable_swagger: false,
        cors_allowed_origins: None,
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unparseable setting; using default");
            default
        }),
        Err(_) => default,
    }
}

fn flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| parse_flag(&v))
        .unwrap_or(default)
}

fn parse_flag(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}
