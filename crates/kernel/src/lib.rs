//! Nomadir kernel library.
//!
//! Filter compilation, listing stores, facet state, debounced search
//! sessions and the HTTP API. The `nomadir` binary serves the API.

pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod routes;
pub mod search;
pub mod session;
pub mod state;
pub mod store;

pub use config::Config;
pub use state::AppState;
