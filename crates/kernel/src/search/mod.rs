//! Listing search: filter types, the combination compiler, SQL rendering
//! and the service tying them to a data store.

pub mod compiler;
pub mod descriptor;
pub mod service;
pub mod sql;
pub mod types;

pub use compiler::{DEFAULT_PAGE_SIZE, FilterCompiler};
pub use descriptor::{Column, Comparison, Param, ParamValue, Predicate, QueryDescriptor};
pub use service::{MIN_SUGGESTION_CHARS, SearchService};
pub use sql::DescriptorSqlBuilder;
pub use types::{
    BoolOperator, FilterCondition, FilterField, FilterGroup, Pagination, SearchFilters,
    SearchFiltersPatch, SearchRequest, SearchResults, SortDirection, SortSpec,
};
