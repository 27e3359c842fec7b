//! Facet filters: the registry of available groups and the controller
//! tracking active selections.

pub mod controller;
pub mod registry;

pub use controller::{ActiveFilterLabel, ActiveFilters, FilterStateController};
pub use registry::{FilterGroupDefinition, FilterOption, FilterRegistry, RegistryError};
