//! Debounced search session.
//!
//! A [`SearchSession`] owns the query, filters, sort and page of one search
//! UI and keeps the fetched results in a [`SearchState`] published through
//! a `watch` channel. Two independent lanes drive fetching:
//! - search lane (300ms by default) for `{ query, filters, page, sort }`
//! - suggestion lane (200ms by default) for name suggestions
//!
//! Each lane only lets its most recent trigger commit results.

mod backend;
mod lane;

pub use backend::{HttpBackend, LocalBackend, SearchBackend, SearchError};

use crate::filter::{ActiveFilters, FilterRegistry, FilterStateController};
use crate::models::Listing;
use crate::search::{
    FilterGroup, MIN_SUGGESTION_CHARS, Pagination, SearchFilters, SearchFiltersPatch,
    SearchRequest, SortSpec,
};
use lane::DebounceLane;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Default quiet period before a search is issued.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default quiet period before suggestions are fetched.
pub const DEFAULT_SUGGESTION_DEBOUNCE: Duration = Duration::from_millis(200);

/// Session construction options.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub initial_query: String,
    pub initial_filters: SearchFilters,
    pub initial_sort: Option<SortSpec>,
    pub debounce: Duration,
    pub suggestion_debounce: Duration,
    /// Prefixes shorter than this clear suggestions without a request.
    pub min_suggestion_chars: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            initial_query: String::new(),
            initial_filters: SearchFilters::default(),
            initial_sort: None,
            debounce: DEFAULT_DEBOUNCE,
            suggestion_debounce: DEFAULT_SUGGESTION_DEBOUNCE,
            min_suggestion_chars: MIN_SUGGESTION_CHARS,
        }
    }
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub filters: SearchFilters,
    pub sort: Option<SortSpec>,
    pub page: u32,
    pub results: Vec<Listing>,
    pub pagination: Pagination,
    pub is_loading: bool,
    pub error: Option<SearchError>,
    pub suggestions: Vec<String>,
    pub is_loading_suggestions: bool,
}

impl SearchState {
    fn request(&self) -> SearchRequest {
        SearchRequest {
            query: self.query.clone(),
            filters: self.filters.clone(),
            page: self.page,
            sort: self.sort.clone(),
            limit: None,
        }
    }
}

/// Debounced search orchestrator for one search UI.
///
/// Cheap to clone; clones share state. Must be created inside a tokio
/// runtime.
#[derive(Clone)]
pub struct SearchSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    backend: Arc<dyn SearchBackend>,
    initial_filters: SearchFilters,
    min_suggestion_chars: usize,
    state: watch::Sender<SearchState>,
    facets: Mutex<FilterStateController>,
    search_lane: DebounceLane,
    suggestion_lane: DebounceLane,
}

impl SearchSession {
    /// Create a session and arm the initial search and suggestion lookup.
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        registry: Arc<FilterRegistry>,
        options: SessionOptions,
    ) -> Self {
        let state = SearchState {
            query: options.initial_query,
            filters: options.initial_filters.clone(),
            sort: options.initial_sort,
            page: 1,
            results: Vec::new(),
            pagination: Pagination::default(),
            is_loading: false,
            error: None,
            suggestions: Vec::new(),
            is_loading_suggestions: false,
        };
        let (state, _) = watch::channel(state);

        let session = Self {
            inner: Arc::new(SessionInner {
                backend,
                initial_filters: options.initial_filters,
                min_suggestion_chars: options.min_suggestion_chars,
                state,
                facets: Mutex::new(FilterStateController::new(registry)),
                search_lane: DebounceLane::new("search", options.debounce),
                suggestion_lane: DebounceLane::new("suggestions", options.suggestion_debounce),
            }),
        };
        session.schedule_search();
        session.schedule_suggestions();
        session
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    /// Set the query text and go back to page 1.
    ///
    /// The text is used verbatim; whitespace is not trimmed.
    pub fn handle_query_change(&self, text: impl Into<String>) {
        let text = text.into();
        self.inner.state.send_modify(|state| {
            state.query = text;
            state.page = 1;
        });
        self.schedule_search();
        self.schedule_suggestions();
    }

    /// Merge a partial filter update and go back to page 1.
    pub fn handle_filters_change(&self, patch: SearchFiltersPatch) {
        self.inner.state.send_modify(|state| {
            patch.apply_to(&mut state.filters);
            state.page = 1;
        });
        self.schedule_search();
    }

    /// Change the sort. The page is kept.
    pub fn handle_sort_change(&self, sort: SortSpec) {
        self.inner.state.send_modify(|state| state.sort = Some(sort));
        self.schedule_search();
    }

    /// Move to another page. Page 0 is treated as page 1.
    pub fn handle_page_change(&self, page: u32) {
        self.inner.state.send_modify(|state| state.page = page.max(1));
        self.schedule_search();
    }

    /// Restore the initial filters and drop the sort; query and page stay.
    pub fn clear_filters(&self) {
        self.inner.facets.lock().clear_filters();
        let initial = self.inner.initial_filters.clone();
        self.inner.state.send_modify(|state| {
            state.filters = initial;
            state.sort = None;
        });
        self.schedule_search();
    }

    /// Toggle a facet option and push the facets as combination groups.
    pub fn toggle_facet(&self, group_id: &str, option_id: &str) {
        let groups = {
            let mut facets = self.inner.facets.lock();
            facets.toggle_filter(group_id, option_id);
            facets.to_filter_groups()
        };
        self.push_facets(groups);
    }

    /// Clear every facet selection.
    pub fn clear_facets(&self) {
        self.inner.facets.lock().clear_filters();
        self.push_facets(Vec::new());
    }

    pub fn active_facets(&self) -> ActiveFilters {
        self.inner.facets.lock().active_filters().clone()
    }

    pub fn active_facet_count(&self) -> usize {
        self.inner.facets.lock().active_filter_count()
    }

    /// Re-fetch suggestions for the current query. The search lane is untouched.
    pub fn refresh_suggestions(&self) {
        self.schedule_suggestions();
    }

    /// Drop pending timers and supersede in-flight fetches in both lanes.
    ///
    /// Results already committed stay; loading flags are cleared.
    pub fn cancel_pending(&self) {
        self.inner.search_lane.cancel();
        self.inner.suggestion_lane.cancel();
        self.inner.state.send_if_modified(|state| {
            let changed = state.is_loading || state.is_loading_suggestions;
            state.is_loading = false;
            state.is_loading_suggestions = false;
            changed
        });
    }

    fn push_facets(&self, groups: Vec<FilterGroup>) {
        let combinations = (!groups.is_empty()).then_some(groups);
        self.handle_filters_change(SearchFiltersPatch::new().combinations(combinations));
    }

    fn schedule_search(&self) {
        let inner = Arc::downgrade(&self.inner);
        self.inner.search_lane.arm(move |generation| run_search(inner, generation));
    }

    fn schedule_suggestions(&self) {
        let inner = Arc::downgrade(&self.inner);
        self.inner
            .suggestion_lane
            .arm(move |generation| run_suggestions(inner, generation));
    }
}

async fn run_search(inner: Weak<SessionInner>, generation: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };

    let mut request = None;
    inner.state.send_if_modified(|state| {
        if !inner.search_lane.is_current(generation) {
            return false;
        }
        state.is_loading = true;
        state.error = None;
        request = Some(state.request());
        true
    });
    let Some(request) = request else {
        debug!(generation, "search superseded before dispatch");
        return;
    };

    debug!(
        generation,
        query = %request.query,
        page = request.page,
        "dispatching search"
    );
    let outcome = inner.backend.search(&request).await;

    let committed = inner.state.send_if_modified(|state| {
        // Compare-and-set: only the lane's latest generation may commit.
        if !inner.search_lane.is_current(generation) {
            return false;
        }
        state.is_loading = false;
        match outcome {
            Ok(results) => {
                state.results = results.results;
                state.pagination = results.pagination;
            }
            Err(e) => {
                warn!(generation, error = %e, "search failed");
                state.error = Some(e);
            }
        }
        true
    });

    if !committed {
        debug!(generation, "discarding superseded search response");
    }
}

async fn run_suggestions(inner: Weak<SessionInner>, generation: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };

    let prefix = inner.state.borrow().query.clone();

    if prefix.chars().count() < inner.min_suggestion_chars {
        inner.state.send_if_modified(|state| {
            if !inner.suggestion_lane.is_current(generation) {
                return false;
            }
            let changed = !state.suggestions.is_empty() || state.is_loading_suggestions;
            state.suggestions.clear();
            state.is_loading_suggestions = false;
            changed
        });
        return;
    }

    let dispatched = inner.state.send_if_modified(|state| {
        if !inner.suggestion_lane.is_current(generation) {
            return false;
        }
        state.is_loading_suggestions = true;
        true
    });
    if !dispatched {
        return;
    }

    let outcome = inner.backend.suggest(&prefix).await;

    let committed = inner.state.send_if_modified(|state| {
        if !inner.suggestion_lane.is_current(generation) {
            return false;
        }
        state.is_loading_suggestions = false;
        match outcome {
            Ok(suggestions) => state.suggestions = suggestions,
            Err(e) => {
                warn!(generation, error = %e, "suggestion lookup failed");
                state.suggestions.clear();
            }
        }
        true
    });

    if !committed {
        debug!(generation, "discarding superseded suggestions");
    }
}
