//! Search session timing tests on a paused clock.
//!
//! The scripted backend answers every search with a single listing named
//! `{query}#{page}`, so the committed results show which request won.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use nomadir_kernel::filter::FilterRegistry;
use nomadir_kernel::models::Listing;
use nomadir_kernel::search::{
    Pagination, SearchFilters, SearchFiltersPatch, SearchRequest, SearchResults, SortSpec,
};
use nomadir_kernel::session::{SearchBackend, SearchError, SearchSession, SessionOptions};

#[derive(Default)]
struct ScriptedBackend {
    searches: Mutex<Vec<SearchRequest>>,
    suggestions: Mutex<Vec<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    suggest_delay: Mutex<Option<Duration>>,
    failing: Mutex<bool>,
}

impl ScriptedBackend {
    fn delay(&self, query: &str, ms: u64) {
        self.delays
            .lock()
            .insert(query.to_string(), Duration::from_millis(ms));
    }

    fn delay_suggestions(&self, ms: u64) {
        *self.suggest_delay.lock() = Some(Duration::from_millis(ms));
    }

    fn fail(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    fn search_count(&self) -> usize {
        self.searches.lock().len()
    }

    fn last_search(&self) -> SearchRequest {
        self.searches.lock().last().cloned().expect("no search issued")
    }
}

fn listing(name: &str) -> Listing {
    serde_json::from_value(json!({
        "id": "0190a1b2-0000-7000-8000-000000000001",
        "name": name,
        "category": "cafe",
    }))
    .unwrap()
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, SearchError> {
        self.searches.lock().push(request.clone());
        let delay = self.delays.lock().get(&request.query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.failing.lock() {
            return Err(SearchError::RequestFailed { status: 500 });
        }
        Ok(SearchResults {
            results: vec![listing(&format!("{}#{}", request.query, request.page))],
            pagination: Pagination::new(1, request.page, 12),
        })
    }

    async fn suggest(&self, prefix: &str) -> Result<Vec<String>, SearchError> {
        self.suggestions.lock().push(prefix.to_string());
        let delay = *self.suggest_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(vec![format!("{prefix} suggestion")])
    }
}

fn session_with(options: SessionOptions) -> (SearchSession, Arc<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::default());
    let session = SearchSession::new(
        backend.clone(),
        Arc::new(FilterRegistry::builtin()),
        options,
    );
    (session, backend)
}

fn session() -> (SearchSession, Arc<ScriptedBackend>) {
    session_with(SessionOptions::default())
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn result_name(session: &SearchSession) -> Option<String> {
    session.state().results.first().map(|l| l.name.clone())
}

#[tokio::test(start_paused = true)]
async fn initial_search_waits_for_debounce() {
    let (session, backend) = session();

    advance(299).await;
    assert_eq!(backend.search_count(), 0);

    advance(2).await;
    assert_eq!(backend.search_count(), 1);
    assert_eq!(result_name(&session).as_deref(), Some("#1"));
    assert!(!session.state().is_loading);
}

#[tokio::test(start_paused = true)]
async fn rapid_query_changes_issue_one_search() {
    let (session, backend) = session();

    for text in ["l", "li", "lis", "lisb"] {
        session.handle_query_change(text);
        advance(100).await;
    }
    assert_eq!(backend.search_count(), 0);

    advance(250).await;
    assert_eq!(backend.search_count(), 1);
    assert_eq!(backend.last_search().query, "lisb");
    assert_eq!(result_name(&session).as_deref(), Some("lisb#1"));
}

#[tokio::test(start_paused = true)]
async fn superseded_response_is_discarded() {
    let (session, backend) = session();
    backend.delay("slow", 1_000);
    backend.delay("fast", 10);

    session.handle_query_change("slow");
    advance(350).await;
    assert_eq!(backend.search_count(), 1);
    assert!(session.state().is_loading);

    session.handle_query_change("fast");
    advance(350).await;
    assert_eq!(result_name(&session).as_deref(), Some("fast#1"));

    // The slow response lands after the fast one and must not win.
    advance(1_000).await;
    assert_eq!(backend.search_count(), 2);
    assert_eq!(result_name(&session).as_deref(), Some("fast#1"));
    assert!(!session.state().is_loading);
}

#[tokio::test(start_paused = true)]
async fn loading_flag_covers_the_request() {
    let (session, backend) = session();
    backend.delay("", 500);

    advance(301).await;
    assert!(session.state().is_loading);

    advance(500).await;
    let state = session.state();
    assert!(!state.is_loading);
    assert!(state.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn query_and_filter_changes_reset_page() {
    let (session, backend) = session();
    advance(301).await;

    session.handle_page_change(3);
    advance(301).await;
    assert_eq!(backend.last_search().page, 3);
    assert_eq!(result_name(&session).as_deref(), Some("#3"));

    session.handle_query_change("cafe");
    assert_eq!(session.state().page, 1);

    session.handle_page_change(2);
    session.handle_filters_change(SearchFiltersPatch::new().category(Some("cafe".into())));
    assert_eq!(session.state().page, 1);

    advance(301).await;
    let request = backend.last_search();
    assert_eq!(request.page, 1);
    assert_eq!(request.query, "cafe");
    assert_eq!(request.filters.category.as_deref(), Some("cafe"));
}

#[tokio::test(start_paused = true)]
async fn sort_change_keeps_page() {
    let (session, backend) = session();
    session.handle_page_change(2);
    advance(301).await;

    let sort = SortSpec::parse("rating:desc").unwrap();
    session.handle_sort_change(sort.clone());
    advance(301).await;

    let request = backend.last_search();
    assert_eq!(request.page, 2);
    assert_eq!(request.sort, Some(sort));
}

#[tokio::test(start_paused = true)]
async fn page_zero_is_page_one() {
    let (session, _backend) = session();
    session.handle_page_change(0);
    assert_eq!(session.state().page, 1);
}

#[tokio::test(start_paused = true)]
async fn failure_keeps_previous_results() {
    let (session, backend) = session();
    session.handle_query_change("hub");
    advance(301).await;
    assert_eq!(result_name(&session).as_deref(), Some("hub#1"));

    backend.fail(true);
    session.handle_query_change("hubs");
    advance(301).await;

    let state = session.state();
    assert_eq!(state.error, Some(SearchError::RequestFailed { status: 500 }));
    assert_eq!(result_name(&session).as_deref(), Some("hub#1"));
    assert!(!state.is_loading);

    // The next successful search clears the error.
    backend.fail(false);
    session.handle_query_change("hub");
    advance(301).await;
    assert!(session.state().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn clear_filters_restores_initial_state() {
    let initial = SearchFilters {
        category: Some("coworking".into()),
        ..Default::default()
    };
    let (session, backend) = session_with(SessionOptions {
        initial_filters: initial.clone(),
        ..Default::default()
    });

    session.handle_query_change("desk");
    session.handle_filters_change(SearchFiltersPatch::new().category(Some("cafe".into())));
    session.handle_sort_change(SortSpec::parse("rating:desc").unwrap());
    session.toggle_facet("ecoTags", "Organic");
    advance(301).await;

    session.clear_filters();
    let state = session.state();
    assert_eq!(state.filters, initial);
    assert_eq!(state.sort, None);
    assert_eq!(state.query, "desk");
    assert_eq!(session.active_facet_count(), 0);

    advance(301).await;
    assert_eq!(backend.last_search().filters, initial);
}

#[tokio::test(start_paused = true)]
async fn suggestions_need_two_characters() {
    let (session, backend) = session();

    session.handle_query_change("s");
    advance(250).await;
    assert!(backend.suggestions.lock().is_empty());
    assert!(session.state().suggestions.is_empty());

    session.handle_query_change("se");
    advance(250).await;
    assert_eq!(*backend.suggestions.lock(), ["se"]);
    assert_eq!(session.state().suggestions, ["se suggestion"]);

    // Dropping back below the threshold clears without a request.
    session.handle_query_change("s");
    advance(250).await;
    assert_eq!(backend.suggestions.lock().len(), 1);
    assert!(session.state().suggestions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn suggestions_run_on_their_own_window() {
    let (session, backend) = session();

    session.handle_query_change("lis");
    advance(201).await;
    assert_eq!(*backend.suggestions.lock(), ["lis"]);
    assert_eq!(backend.search_count(), 0);

    advance(100).await;
    assert_eq!(backend.search_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn initial_query_fetches_suggestions() {
    let (session, backend) = session_with(SessionOptions {
        initial_query: "lisbon".into(),
        ..Default::default()
    });

    advance(201).await;
    assert_eq!(*backend.suggestions.lock(), ["lisbon"]);
    assert_eq!(session.state().suggestions, ["lisbon suggestion"]);

    advance(100).await;
    assert_eq!(backend.last_search().query, "lisbon");
}

#[tokio::test(start_paused = true)]
async fn filter_change_leaves_in_flight_suggestions_alone() {
    let (session, backend) = session();
    backend.delay_suggestions(300);

    session.handle_query_change("lis");
    advance(250).await;
    assert!(session.state().is_loading_suggestions);

    session.handle_filters_change(SearchFiltersPatch::new().category(Some("cafe".into())));
    advance(400).await;

    let state = session.state();
    assert_eq!(*backend.suggestions.lock(), ["lis"]);
    assert_eq!(state.suggestions, ["lis suggestion"]);
    assert!(!state.is_loading_suggestions);
}

#[tokio::test(start_paused = true)]
async fn refreshing_suggestions_leaves_in_flight_search_alone() {
    let (session, backend) = session();
    backend.delay("lis", 500);

    session.handle_query_change("lis");
    advance(350).await;
    assert!(session.state().is_loading);

    session.refresh_suggestions();
    advance(600).await;

    assert_eq!(backend.search_count(), 1);
    assert_eq!(*backend.suggestions.lock(), ["lis", "lis"]);
    assert_eq!(result_name(&session).as_deref(), Some("lis#1"));
    assert!(!session.state().is_loading);
}

#[tokio::test(start_paused = true)]
async fn facets_become_combination_groups() {
    let (session, backend) = session();

    session.toggle_facet("category", "cafe");
    session.toggle_facet("category", "coworking");
    advance(301).await;

    assert_eq!(session.active_facet_count(), 2);
    let groups = backend.last_search().filters.combinations.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id.as_deref(), Some("category"));
    assert_eq!(groups[0].conditions.len(), 2);

    session.clear_facets();
    advance(301).await;
    assert!(backend.last_search().filters.combinations.is_none());
    assert!(session.active_facets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_pending_stops_timers_and_in_flight_commits() {
    let (session, backend) = session();
    backend.delay("late", 500);

    session.handle_query_change("late");
    advance(350).await;
    assert!(session.state().is_loading);

    session.cancel_pending();
    assert!(!session.state().is_loading);

    advance(1_000).await;
    assert_eq!(backend.search_count(), 1);
    assert!(session.state().results.is_empty());

    // A cancelled timer never fires.
    session.handle_page_change(2);
    session.cancel_pending();
    advance(1_000).await;
    assert_eq!(backend.search_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_committed_results() {
    let (session, _backend) = session();
    let mut rx = session.subscribe();

    session.handle_query_change("porto");
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().query, "porto");

    advance(301).await;
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.results[0].name, "porto#1");
}
