#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Builds the real kernel router over an in-memory store seeded with the
//! sample listings from `nomadir-test-utils`.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use nomadir_kernel::AppState;
use nomadir_kernel::filter::FilterRegistry;
use nomadir_kernel::routes;
use nomadir_kernel::search::{FilterCompiler, SearchService};
use nomadir_kernel::store::{ListingStore, MemoryStore};
use nomadir_test_utils::sample_listings_json;

/// Page size used by the test app; small enough to exercise paging.
pub const TEST_PAGE_SIZE: u32 = 3;

/// Search service over the sample listings.
pub fn sample_service() -> SearchService {
    let store = MemoryStore::from_json_str(&sample_listings_json()).expect("sample listings");
    let store: Arc<dyn ListingStore> = Arc::new(store);
    SearchService::new(FilterCompiler::new(TEST_PAGE_SIZE), store, 8)
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_registry(FilterRegistry::builtin())
    }

    pub fn with_registry(registry: FilterRegistry) -> Self {
        let state = AppState::from_parts(sample_service(), Arc::new(registry));
        let router = routes::router().with_state(state.clone());
        Self { router, state }
    }

    /// Send a request through the router.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        read_json(self.request(request).await).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        read_json(self.request(request).await).await
    }

    /// Serve the router on an ephemeral local port; returns the base URL.
    pub async fn spawn(self) -> String {
        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, self.router).await.unwrap();
        });
        format!("http://{addr}")
    }
}

/// Split a response into status and JSON body (`Null` when not JSON).
pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}
