//! Domain models.

pub mod listing;

pub use listing::{Listing, PriceRange};
