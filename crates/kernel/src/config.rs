//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::search::DEFAULT_PAGE_SIZE;
use crate::store::cache::{DEFAULT_MAX_CAPACITY, DEFAULT_TTL_SECS};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL. When None, listings are served from memory.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// JSON array of listings seeding the memory store.
    pub listings_file: Option<PathBuf>,

    /// YAML filter registry. When None, the built-in facets are used.
    pub filters_file: Option<PathBuf>,

    /// Results per page when a request does not set a limit (default: 12).
    pub page_size: u32,

    /// Maximum suggestions returned per lookup (default: 8).
    pub suggestion_limit: usize,

    /// Search result cache TTL in seconds (default: 30).
    pub search_cache_ttl_secs: u64,

    /// Search result cache capacity; 0 disables the cache (default: 1000).
    pub search_cache_capacity: u64,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let listings_file = env::var("LISTINGS_FILE").ok().map(PathBuf::from);

        let filters_file = env::var("FILTERS_FILE").ok().map(PathBuf::from);

        let page_size = env::var("PAGE_SIZE")
            .unwrap_or_else(|_| DEFAULT_PAGE_SIZE.to_string())
            .parse()
            .context("PAGE_SIZE must be a valid u32")?;

        let suggestion_limit = env::var("SUGGESTION_LIMIT")
            .unwrap_or_else(|_| "8".to_string())
            .parse()
            .context("SUGGESTION_LIMIT must be a valid usize")?;

        let search_cache_ttl_secs = env::var("SEARCH_CACHE_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_TTL_SECS.to_string())
            .parse()
            .context("SEARCH_CACHE_TTL_SECS must be a valid u64")?;

        let search_cache_capacity = env::var("SEARCH_CACHE_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_MAX_CAPACITY.to_string())
            .parse()
            .context("SEARCH_CACHE_CAPACITY must be a valid u64")?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            listings_file,
            filters_file,
            page_size,
            suggestion_limit,
            search_cache_ttl_secs,
            search_cache_capacity,
            cors_allowed_origins,
        })
    }
}
