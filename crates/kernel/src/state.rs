//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::filter::FilterRegistry;
use crate::search::{FilterCompiler, SearchService};
use crate::store::{CachedListingStore, ListingStore, MemoryStore, PgListingStore};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Compiler plus store.
    search: SearchService,

    /// Facet groups offered to clients.
    registry: Arc<FilterRegistry>,
}

impl AppState {
    /// Create new application state from configuration.
    pub async fn new(config: &Config) -> Result<Self> {
        let registry = match &config.filters_file {
            Some(path) => FilterRegistry::load(path)
                .with_context(|| format!("failed to load filters from {}", path.display()))?,
            None => FilterRegistry::builtin(),
        };

        let mut store: Arc<dyn ListingStore> = match &config.database_url {
            Some(url) => {
                let pool = db::create_pool(url, config.database_max_connections).await?;
                info!("listing store: postgres");
                Arc::new(PgListingStore::new(pool))
            }
            None => {
                let store = match &config.listings_file {
                    Some(path) => MemoryStore::from_json_file(path).with_context(|| {
                        format!("failed to load listings from {}", path.display())
                    })?,
                    None => MemoryStore::default(),
                };
                info!(listings = store.len(), "listing store: memory");
                Arc::new(store)
            }
        };

        if config.search_cache_capacity > 0 {
            store = Arc::new(CachedListingStore::new(
                store,
                config.search_cache_capacity,
                Duration::from_secs(config.search_cache_ttl_secs),
            ));
        }

        let search = SearchService::new(
            FilterCompiler::new(config.page_size),
            store,
            config.suggestion_limit,
        );

        Ok(Self::from_parts(search, Arc::new(registry)))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(search: SearchService, registry: Arc<FilterRegistry>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { search, registry }),
        }
    }

    /// Get the search service.
    pub fn search(&self) -> &SearchService {
        &self.inner.search
    }

    /// Get the filter registry.
    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.inner.registry
    }

    /// Name of the backing store.
    pub fn store_name(&self) -> &'static str {
        self.inner.search.store().name()
    }

    /// Check if the listing store is reachable.
    pub async fn store_healthy(&self) -> bool {
        self.inner.search.store().healthy().await
    }
}
