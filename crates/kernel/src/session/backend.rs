//! Fetch boundary used by search sessions.
//!
//! A session never talks to a store directly; it goes through a
//! [`SearchBackend`], either in-process ([`LocalBackend`]) or over HTTP
//! ([`HttpBackend`]).

use crate::search::{SearchRequest, SearchResults, SearchService};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Error stored in session state when a fetch fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Search request failed with status {status}")]
    RequestFailed { status: u16 },

    #[error("Search request failed: {0}")]
    Transport(String),

    #[error("Search failed: {0}")]
    Backend(String),
}

/// Executes searches and suggestion lookups for a session.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError>;

    async fn suggest(&self, prefix: &str) -> Result<Vec<String>, SearchError>;
}

/// Backend running the search service in-process.
#[derive(Clone)]
pub struct LocalBackend {
    service: SearchService,
}

impl LocalBackend {
    pub fn new(service: SearchService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl SearchBackend for LocalBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        self.service
            .search(request)
            .await
            .map_err(|e| SearchError::Backend(e.to_string()))
    }

    async fn suggest(&self, prefix: &str) -> Result<Vec<String>, SearchError> {
        self.service
            .suggest(prefix)
            .await
            .map_err(|e| SearchError::Backend(e.to_string()))
    }
}

/// Backend calling a remote search API.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }
}

fn transport(e: reqwest::Error) -> SearchError {
    SearchError::Transport(e.to_string())
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        let url = format!("{}/api/search", self.base_url);
        debug!(url = %url, page = request.page, "posting search request");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::RequestFailed {
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(transport)
    }

    async fn suggest(&self, prefix: &str) -> Result<Vec<String>, SearchError> {
        let url = format!("{}/api/search/suggestions", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("q", prefix)])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::RequestFailed {
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_backend_trims_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:3000/");
        assert_eq!(backend.base_url, "http://localhost:3000");
    }

    #[test]
    fn search_error_messages() {
        assert_eq!(
            SearchError::RequestFailed { status: 500 }.to_string(),
            "Search request failed with status 500"
        );
    }
}
