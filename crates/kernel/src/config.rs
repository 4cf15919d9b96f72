//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL. When None, in-memory stores are used.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Path prefix listing endpoints are mounted under (default: /custom-api/v1).
    pub api_prefix: String,

    /// Content type listed by the default listing scope (default: post).
    pub listing_item_type: String,

    /// Collector base URL pushes go to. When None, sync is disabled.
    pub sync_base_url: Option<String>,

    /// Content type whose saves trigger a resync (default: post).
    pub sync_item_type: String,

    /// Outbound push timeout (default: 30s).
    pub sync_timeout: Duration,

    /// Delivery attempts per push; 1 means fire-and-forget (default: 1).
    pub sync_max_attempts: u32,

    /// Listing configuration written on first start if none is stored.
    pub category_slugs_seed: Option<String>,

    /// JSON file of items for the in-memory content source.
    pub seed_file: Option<PathBuf>,

    /// Bearer token for admin routes. When None, admin routes are closed.
    pub admin_token: Option<String>,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: None,
            database_max_connections: 10,
            api_prefix: "/custom-api/v1".to_string(),
            listing_item_type: "post".to_string(),
            sync_base_url: None,
            sync_item_type: "post".to_string(),
            sync_timeout: Duration::from_secs(30),
            sync_max_attempts: 1,
            category_slugs_seed: None,
            seed_file: None,
            admin_token: None,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url = non_empty_var("DATABASE_URL");

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let api_prefix = normalize_prefix(
            &env::var("API_PREFIX").unwrap_or_else(|_| "/custom-api/v1".to_string()),
        );

        let listing_item_type =
            env::var("LISTING_ITEM_TYPE").unwrap_or_else(|_| "post".to_string());

        let sync_base_url = non_empty_var("SYNC_BASE_URL");
        if let Some(ref base) = sync_base_url {
            url::Url::parse(base).context("SYNC_BASE_URL must be an absolute URL")?;
        }

        let sync_item_type = env::var("SYNC_ITEM_TYPE").unwrap_or_else(|_| "post".to_string());

        let sync_timeout_secs: u64 = env::var("SYNC_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("SYNC_TIMEOUT_SECS must be a valid u64")?;

        let sync_max_attempts: u32 = env::var("SYNC_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .context("SYNC_MAX_ATTEMPTS must be a valid u32")?;

        let category_slugs_seed = env::var("CATEGORY_SLUGS").ok();

        let seed_file = non_empty_var("SEED_FILE").map(PathBuf::from);

        let admin_token = non_empty_var("ADMIN_TOKEN");

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            api_prefix,
            listing_item_type,
            sync_base_url,
            sync_item_type,
            sync_timeout: Duration::from_secs(sync_timeout_secs),
            sync_max_attempts: sync_max_attempts.max(1),
            category_slugs_seed,
            seed_file,
            admin_token,
            cors_allowed_origins,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Leading slash, no trailing slash. An empty prefix mounts at the root.
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
