//! Search service: compiles requests and runs them against a listing store.

use super::compiler::FilterCompiler;
use super::descriptor::QueryDescriptor;
use super::types::{SearchRequest, SearchResults};
use crate::store::{ListingStore, StoreError};
use std::sync::Arc;
use tracing::debug;

/// Prefixes shorter than this never reach the store.
pub const MIN_SUGGESTION_CHARS: usize = 2;

/// Search service shared by the HTTP API and in-process sessions.
#[derive(Clone)]
pub struct SearchService {
    compiler: FilterCompiler,
    store: Arc<dyn ListingStore>,
    suggestion_limit: usize,
}

impl SearchService {
    /// Create a new search service.
    pub fn new(
        compiler: FilterCompiler,
        store: Arc<dyn ListingStore>,
        suggestion_limit: usize,
    ) -> Self {
        Self {
            compiler,
            store,
            suggestion_limit,
        }
    }

    pub fn compiler(&self) -> &FilterCompiler {
        &self.compiler
    }

    pub fn store(&self) -> &Arc<dyn ListingStore> {
        &self.store
    }

    /// Compile a request into a descriptor.
    ///
    /// A non-empty `query` replaces `filters.searchQuery`.
    pub fn compile(&self, request: &SearchRequest) -> QueryDescriptor {
        if request.query.is_empty() {
            return self.compiler.compile(
                &request.filters,
                request.sort.as_ref(),
                request.page,
                request.limit,
            );
        }

        let mut filters = request.filters.clone();
        filters.search_query = request.query.clone();
        self.compiler
            .compile(&filters, request.sort.as_ref(), request.page, request.limit)
    }

    /// Run a search and derive pagination from the store's total.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResults, StoreError> {
        let descriptor = self.compile(request);

        debug!(
            query = %request.query,
            page = request.page,
            clauses = %descriptor.clause_text(),
            "executing search"
        );

        let page = self.store.search(&descriptor).await?;
        Ok(page.into_results(&descriptor))
    }

    /// Name suggestions for a prefix; empty below [`MIN_SUGGESTION_CHARS`].
    pub async fn suggest(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        if prefix.chars().count() < MIN_SUGGESTION_CHARS {
            return Ok(Vec::new());
        }
        self.store.suggest(prefix, self.suggestion_limit).await
    }
}
