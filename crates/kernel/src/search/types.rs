//! Search request and filter types.
//!
//! Provides the wire types shared by the search session, the filter compiler
//! and the HTTP API:
//! - SearchFilters: legacy scalar filters plus optional combination groups
//! - FilterGroup / FilterCondition: grouped predicates with per-group operators
//! - SearchRequest / SearchResults: fetch payload and paged response

use crate::models::Listing;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Boolean operator joining conditions inside a group, or groups together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoolOperator {
    #[default]
    And,
    Or,
}

impl BoolOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Filterable listing fields, by their wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Category,
    Location,
    EcoTags,
    NomadFeatures,
    MinRating,
    MaxPriceRange,
    MinPriceRange,
    SustainabilityScore,
    AccommodationType,
    EcoCertification,
}

impl FilterField {
    pub const ALL: [FilterField; 10] = [
        Self::Category,
        Self::Location,
        Self::EcoTags,
        Self::NomadFeatures,
        Self::MinRating,
        Self::MaxPriceRange,
        Self::MinPriceRange,
        Self::SustainabilityScore,
        Self::AccommodationType,
        Self::EcoCertification,
    ];

    /// Wire name used in JSON payloads and parameter keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Location => "location",
            Self::EcoTags => "ecoTags",
            Self::NomadFeatures => "nomadFeatures",
            Self::MinRating => "minRating",
            Self::MaxPriceRange => "maxPriceRange",
            Self::MinPriceRange => "minPriceRange",
            Self::SustainabilityScore => "sustainabilityScore",
            Self::AccommodationType => "accommodationType",
            Self::EcoCertification => "ecoCertification",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }

    /// Whether the field compares against a number rather than text.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::MinRating | Self::MaxPriceRange | Self::MinPriceRange | Self::SustainabilityScore
        )
    }
}

/// A single atomic predicate inside a filter group.
///
/// Conditions arrive as `{ "field": ..., "value": ... }`. Fields the compiler
/// does not know, or values of the wrong shape, are kept as `Unsupported` so
/// they round-trip but compile to nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCondition", into = "RawCondition")]
pub enum FilterCondition {
    Category(String),
    Location(String),
    EcoTag(String),
    NomadFeature(String),
    MinRating(f64),
    MaxPriceRange(f64),
    MinPriceRange(f64),
    SustainabilityScore(f64),
    AccommodationType(String),
    EcoCertification(String),
    Unsupported { field: String, value: Value },
}

impl FilterCondition {
    /// Build a condition from a field name and a JSON value.
    ///
    /// Numeric fields accept numbers and numeric strings; text fields accept
    /// strings only.
    pub fn new(field: &str, value: Value) -> Self {
        let Some(known) = FilterField::parse(field) else {
            return Self::unsupported(field, value);
        };

        if known.is_numeric() {
            let number = match &value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            return match number.filter(|n| n.is_finite()) {
                Some(n) => match known {
                    FilterField::MinRating => Self::MinRating(n),
                    FilterField::MaxPriceRange => Self::MaxPriceRange(n),
                    FilterField::MinPriceRange => Self::MinPriceRange(n),
                    _ => Self::SustainabilityScore(n),
                },
                None => Self::unsupported(field, value),
            };
        }

        let Value::String(text) = value else {
            return Self::unsupported(field, value);
        };
        match known {
            FilterField::Category => Self::Category(text),
            FilterField::Location => Self::Location(text),
            FilterField::EcoTags => Self::EcoTag(text),
            FilterField::NomadFeatures => Self::NomadFeature(text),
            FilterField::AccommodationType => Self::AccommodationType(text),
            _ => Self::EcoCertification(text),
        }
    }

    fn unsupported(field: &str, value: Value) -> Self {
        Self::Unsupported {
            field: field.to_string(),
            value,
        }
    }

    /// The compiler field this condition targets, `None` when unsupported.
    pub fn field(&self) -> Option<FilterField> {
        match self {
            Self::Category(_) => Some(FilterField::Category),
            Self::Location(_) => Some(FilterField::Location),
            Self::EcoTag(_) => Some(FilterField::EcoTags),
            Self::NomadFeature(_) => Some(FilterField::NomadFeatures),
            Self::MinRating(_) => Some(FilterField::MinRating),
            Self::MaxPriceRange(_) => Some(FilterField::MaxPriceRange),
            Self::MinPriceRange(_) => Some(FilterField::MinPriceRange),
            Self::SustainabilityScore(_) => Some(FilterField::SustainabilityScore),
            Self::AccommodationType(_) => Some(FilterField::AccommodationType),
            Self::EcoCertification(_) => Some(FilterField::EcoCertification),
            Self::Unsupported { .. } => None,
        }
    }

    /// Wire name of the targeted field.
    pub fn field_name(&self) -> &str {
        match self {
            Self::Unsupported { field, .. } => field,
            other => other.field().map(|f| f.as_str()).unwrap_or_default(),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCondition {
    field: String,
    #[serde(default)]
    value: Value,
}

impl From<RawCondition> for FilterCondition {
    fn from(raw: RawCondition) -> Self {
        Self::new(&raw.field, raw.value)
    }
}

impl From<FilterCondition> for RawCondition {
    fn from(condition: FilterCondition) -> Self {
        let field = condition.field_name().to_string();
        let value = match condition {
            FilterCondition::Category(s)
            | FilterCondition::Location(s)
            | FilterCondition::EcoTag(s)
            | FilterCondition::NomadFeature(s)
            | FilterCondition::AccommodationType(s)
            | FilterCondition::EcoCertification(s) => Value::String(s),
            FilterCondition::MinRating(n)
            | FilterCondition::MaxPriceRange(n)
            | FilterCondition::MinPriceRange(n)
            | FilterCondition::SustainabilityScore(n) => serde_json::json!(n),
            FilterCondition::Unsupported { value, .. } => value,
        };
        Self { field, value }
    }
}

/// A group of conditions joined by one operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroup {
    /// Client-side identifier (the facet id for facet-driven groups).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub conditions: Vec<FilterCondition>,

    #[serde(default)]
    pub operator: BoolOperator,

    /// Disabled groups are ignored by the compiler.
    #[serde(default = "default_true")]
    pub is_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl FilterGroup {
    /// An enabled group with the given operator.
    pub fn new(operator: BoolOperator, conditions: Vec<FilterCondition>) -> Self {
        Self {
            id: None,
            label: None,
            conditions,
            operator,
            is_enabled: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }
}

/// Filters attached to a search.
///
/// When `combinations` holds at least one enabled group the legacy scalar
/// fields are ignored entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    pub search_query: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub combinations: Option<Vec<FilterGroup>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub combination_operator: Option<BoolOperator>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    pub eco_tags: Vec<String>,

    pub nomad_features: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price_range: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price_range: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sustainability_score: Option<f64>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accommodation_type: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub eco_certification: Option<String>,
}

impl SearchFilters {
    /// Enabled combination groups, in order.
    pub fn enabled_groups(&self) -> impl Iterator<Item = &FilterGroup> {
        self.combinations
            .iter()
            .flatten()
            .filter(|group| group.is_enabled)
    }

    pub fn has_enabled_combinations(&self) -> bool {
        self.enabled_groups().next().is_some()
    }
}

/// Partial update merged into [`SearchFilters`].
///
/// Unset fields leave the current value untouched. Optional fields take an
/// `Option` so a patch can also clear them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFiltersPatch {
    search_query: Option<String>,
    combinations: Option<Option<Vec<FilterGroup>>>,
    combination_operator: Option<Option<BoolOperator>>,
    category: Option<Option<String>>,
    location: Option<Option<String>>,
    eco_tags: Option<Vec<String>>,
    nomad_features: Option<Vec<String>>,
    min_rating: Option<Option<f64>>,
    max_price_range: Option<Option<f64>>,
    min_price_range: Option<Option<f64>>,
    sustainability_score: Option<Option<f64>>,
    accommodation_type: Option<Vec<String>>,
    eco_certification: Option<Option<String>>,
}

impl SearchFiltersPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_query(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    pub fn combinations(mut self, groups: Option<Vec<FilterGroup>>) -> Self {
        self.combinations = Some(groups);
        self
    }

    pub fn combination_operator(mut self, operator: Option<BoolOperator>) -> Self {
        self.combination_operator = Some(operator);
        self
    }

    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = Some(category);
        self
    }

    pub fn location(mut self, location: Option<String>) -> Self {
        self.location = Some(location);
        self
    }

    pub fn eco_tags(mut self, tags: Vec<String>) -> Self {
        self.eco_tags = Some(tags);
        self
    }

    pub fn nomad_features(mut self, features: Vec<String>) -> Self {
        self.nomad_features = Some(features);
        self
    }

    pub fn min_rating(mut self, rating: Option<f64>) -> Self {
        self.min_rating = Some(rating);
        self
    }

    pub fn max_price_range(mut self, price: Option<f64>) -> Self {
        self.max_price_range = Some(price);
        self
    }

    pub fn min_price_range(mut self, price: Option<f64>) -> Self {
        self.min_price_range = Some(price);
        self
    }

    pub fn sustainability_score(mut self, score: Option<f64>) -> Self {
        self.sustainability_score = Some(score);
        self
    }

    pub fn accommodation_type(mut self, types: Vec<String>) -> Self {
        self.accommodation_type = Some(types);
        self
    }

    pub fn eco_certification(mut self, certification: Option<String>) -> Self {
        self.eco_certification = Some(certification);
        self
    }

    /// Merge the patch into `filters`.
    pub fn apply_to(self, filters: &mut SearchFilters) {
        if let Some(v) = self.search_query {
            filters.search_query = v;
        }
        if let Some(v) = self.combinations {
            filters.combinations = v;
        }
        if let Some(v) = self.combination_operator {
            filters.combination_operator = v;
        }
        if let Some(v) = self.category {
            filters.category = v;
        }
        if let Some(v) = self.location {
            filters.location = v;
        }
        if let Some(v) = self.eco_tags {
            filters.eco_tags = v;
        }
        if let Some(v) = self.nomad_features {
            filters.nomad_features = v;
        }
        if let Some(v) = self.min_rating {
            filters.min_rating = v;
        }
        if let Some(v) = self.max_price_range {
            filters.max_price_range = v;
        }
        if let Some(v) = self.min_price_range {
            filters.min_price_range = v;
        }
        if let Some(v) = self.sustainability_score {
            filters.sustainability_score = v;
        }
        if let Some(v) = self.accommodation_type {
            filters.accommodation_type = v;
        }
        if let Some(v) = self.eco_certification {
            filters.eco_certification = v;
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Sort order for results. Field names are passed to the store verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,

    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// The default ordering: `name asc`.
    pub fn by_name() -> Self {
        Self::new("name", SortDirection::Asc)
    }

    /// Parse `field` or `field:asc|desc`.
    pub fn parse(input: &str) -> Option<Self> {
        let (field, direction) = match input.split_once(':') {
            Some((field, "asc")) => (field, SortDirection::Asc),
            Some((field, "desc")) => (field, SortDirection::Desc),
            Some(_) => return None,
            None => (input, SortDirection::Asc),
        };
        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        Some(Self::new(field, direction))
    }
}

/// Fetch payload sent by the search session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,

    #[serde(default)]
    pub filters: SearchFilters,

    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default)]
    pub sort: Option<SortSpec>,

    /// Page size override; the server default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

fn default_page() -> u32 {
    1
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: SearchFilters::default(),
            page: default_page(),
            sort: None,
            limit: None,
        }
    }
}

/// Paging summary for a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Total matches before paging.
    pub total: u64,

    /// Current page (1-indexed).
    pub page: u32,

    pub total_pages: u32,

    /// Whether rows exist past this page.
    pub has_more: bool,
}

impl Pagination {
    /// Compute paging for `total` rows viewed `limit` at a time.
    pub fn new(total: u64, page: u32, limit: u32) -> Self {
        let page = page.max(1);
        let total_pages = if limit > 0 {
            u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX)
        } else {
            0
        };

        Self {
            total,
            page,
            total_pages,
            has_more: u64::from(page) * u64::from(limit) < total,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            total: 0,
            page: 1,
            total_pages: 0,
            has_more: false,
        }
    }
}

/// A page of listings plus its paging summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<Listing>,
    pub pagination: Pagination,
}
