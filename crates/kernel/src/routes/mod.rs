//! HTTP route handlers.

pub mod health;
pub mod search;

use axum::Router;

use crate::state::AppState;

/// All kernel routes, without middleware layers.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(search::router())
}
