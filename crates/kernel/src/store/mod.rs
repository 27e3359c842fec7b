//! Data store boundary.
//!
//! A store accepts a compiled [`QueryDescriptor`] and returns one page of
//! listings plus the total match count. Pagination is derived by the caller.

pub mod cache;
pub mod memory;
pub mod postgres;

pub use cache::CachedListingStore;
pub use memory::MemoryStore;
pub use postgres::PgListingStore;

use crate::models::Listing;
use crate::search::descriptor::QueryDescriptor;
use crate::search::types::{Pagination, SearchResults};
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode listings: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unsupported query parameter: {0}")]
    UnsupportedParameter(String),
}

/// One page of rows and the total before paging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorePage {
    pub rows: Vec<Listing>,
    pub total: u64,
}

impl StorePage {
    /// Attach pagination computed from the descriptor's window.
    pub fn into_results(self, descriptor: &QueryDescriptor) -> SearchResults {
        SearchResults {
            results: self.rows,
            pagination: Pagination::new(self.total, descriptor.page(), descriptor.limit),
        }
    }
}

/// A source of listings that can execute query descriptors.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Short backend name for health reporting and logs.
    fn name(&self) -> &'static str;

    /// Execute a descriptor and return one page plus the total.
    async fn search(&self, descriptor: &QueryDescriptor) -> Result<StorePage, StoreError>;

    /// Listing names containing `prefix`, case-insensitively, at most `limit`.
    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>, StoreError>;

    /// Whether the backing storage is reachable.
    async fn healthy(&self) -> bool {
        true
    }
}
