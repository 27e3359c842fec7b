//! Descriptor-keyed result cache in front of another store.
//!
//! Results are keyed by [`QueryDescriptor::cache_key`], so two compiles of
//! the same filters share an entry. Entries expire after a short TTL or when
//! [`CachedListingStore::invalidate_all`] is called.

use super::{ListingStore, StorePage, StoreError};
use crate::search::descriptor::QueryDescriptor;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default TTL for cached pages (30 seconds).
pub const DEFAULT_TTL_SECS: u64 = 30;

/// Default maximum number of cached pages.
pub const DEFAULT_MAX_CAPACITY: u64 = 1_000;

/// Listing store wrapper caching search pages in-process.
#[derive(Clone)]
pub struct CachedListingStore {
    inner: Arc<dyn ListingStore>,
    pages: Cache<String, StorePage>,
}

impl CachedListingStore {
    /// Wrap `inner` with a cache of the given capacity and TTL.
    pub fn new(inner: Arc<dyn ListingStore>, max_capacity: u64, ttl: Duration) -> Self {
        let pages = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self { inner, pages }
    }

    /// Drop every cached page.
    pub fn invalidate_all(&self) {
        self.pages.invalidate_all();
    }
}

#[async_trait]
impl ListingStore for CachedListingStore {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn search(&self, descriptor: &QueryDescriptor) -> Result<StorePage, StoreError> {
        let key = descriptor.cache_key();

        if let Some(page) = self.pages.get(&key).await {
            debug!(total = page.total, "search cache hit");
            return Ok(page);
        }

        let page = self.inner.search(descriptor).await?;
        self.pages.insert(key, page.clone()).await;
        Ok(page)
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        self.inner.suggest(prefix, limit).await
    }

    async fn healthy(&self) -> bool {
        self.inner.healthy().await
    }
}
