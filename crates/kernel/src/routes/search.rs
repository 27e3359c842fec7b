//! Search route handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::filter::FilterGroupDefinition;
use crate::search::{SearchRequest, SearchResults, SortSpec};
use crate::state::AppState;

/// Largest page size a client may ask for.
const MAX_LIMIT: u32 = 50;

/// Create the search router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/search", get(search_query).post(search_json))
        .route("/api/search/suggestions", get(suggestions_json))
        .route("/api/filters", get(filters_json))
}

/// Search query parameters for the GET form.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    pub q: Option<String>,
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Results per page.
    pub limit: Option<u32>,
    /// Sort as `field` or `field:asc|desc`.
    pub sort: Option<String>,
}

fn default_page() -> u32 {
    1
}

/// Suggestion query parameters.
#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

fn clamp_limit(request: &mut SearchRequest) {
    request.limit = request.limit.map(|limit| limit.clamp(1, MAX_LIMIT));
}

/// Full search: `{ query, filters, page, sort }`.
async fn search_json(
    State(state): State<AppState>,
    Json(mut request): Json<SearchRequest>,
) -> AppResult<Json<SearchResults>> {
    clamp_limit(&mut request);
    let results = state.search().search(&request).await?;
    Ok(Json(results))
}

/// Text-only search from query parameters.
async fn search_query(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchResults>> {
    let sort = match params.sort.as_deref() {
        Some(raw) => {
            let sort = SortSpec::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("invalid sort: {raw}")))?;
            Some(sort)
        }
        None => None,
    };

    let mut request = SearchRequest {
        query: params.q.unwrap_or_default(),
        page: params.page.max(1),
        sort,
        limit: params.limit,
        ..Default::default()
    };
    clamp_limit(&mut request);
    let results = state.search().search(&request).await?;
    Ok(Json(results))
}

/// Name suggestions; empty for prefixes under two characters.
async fn suggestions_json(
    State(state): State<AppState>,
    Query(params): Query<SuggestionQuery>,
) -> AppResult<Json<Vec<String>>> {
    let suggestions = state.search().suggest(&params.q).await?;
    Ok(Json(suggestions))
}

/// Facet groups offered by the registry.
async fn filters_json(State(state): State<AppState>) -> Json<Vec<FilterGroupDefinition>> {
    Json(state.registry().groups().to_vec())
}
