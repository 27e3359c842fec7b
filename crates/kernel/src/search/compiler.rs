//! Filter combination compiler.
//!
//! Turns [`SearchFilters`] into a [`QueryDescriptor`]. Compilation is pure and
//! never fails: unknown fields and ill-typed values compile to nothing.
//!
//! Two mutually exclusive paths exist:
//! - combination path, taken when at least one enabled group is present
//! - legacy path, compiling each scalar filter independently

use super::descriptor::{Column, Comparison, Param, ParamValue, Predicate, QueryDescriptor};
use super::types::{BoolOperator, FilterCondition, SearchFilters, SortSpec};
use tracing::debug;

/// Results per page when the caller does not ask for a size.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Parameter key bound to the free-text query.
pub const SEARCH_QUERY_PARAM: &str = "searchQuery";

/// Compiles search filters into query descriptors.
#[derive(Debug, Clone)]
pub struct FilterCompiler {
    page_size: u32,
}

impl Default for FilterCompiler {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl FilterCompiler {
    /// Create a compiler with the given default page size (minimum 1).
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Compile filters, sort and paging into a descriptor.
    ///
    /// `page` is 1-indexed; values below 1 are treated as 1. `limit` falls
    /// back to the compiler's page size when absent or zero.
    pub fn compile(
        &self,
        filters: &SearchFilters,
        sort: Option<&SortSpec>,
        page: u32,
        limit: Option<u32>,
    ) -> QueryDescriptor {
        let mut bindings = Bindings::default();

        if filters.has_enabled_combinations() {
            compile_combinations(filters, &mut bindings);
        } else {
            compile_legacy(filters, &mut bindings);
        }

        // The text clause always goes last, after every filter clause.
        if !filters.search_query.is_empty() {
            let param = bindings.bind(
                SEARCH_QUERY_PARAM.to_string(),
                ParamValue::Text(filters.search_query.clone()),
            );
            bindings.clauses.push(Predicate::Matches {
                columns: vec![Column::Name, Column::DescriptionShort],
                param,
            });
        }

        let limit = limit.filter(|l| *l > 0).unwrap_or(self.page_size);
        let page = page.max(1);
        let offset = u64::from(page - 1) * u64::from(limit);
        let sort = sort.cloned().unwrap_or_else(SortSpec::by_name);

        let descriptor = QueryDescriptor {
            clauses: bindings.clauses,
            params: bindings.params,
            sort,
            limit,
            offset,
        };

        debug!(
            clauses = descriptor.clauses.len(),
            params = descriptor.params.len(),
            limit,
            offset,
            "compiled search filters"
        );

        descriptor
    }
}

/// Clause and parameter accumulator for one compile.
#[derive(Default)]
struct Bindings {
    clauses: Vec<Predicate>,
    params: Vec<Param>,
}

impl Bindings {
    fn bind(&mut self, key: String, value: ParamValue) -> String {
        self.params.push(Param {
            key: key.clone(),
            value,
        });
        key
    }

    /// Bind the condition's value under `key` and return its predicate.
    /// Unsupported conditions bind nothing.
    fn condition(&mut self, condition: &FilterCondition, key: String) -> Option<Predicate> {
        let (column, op, value) = condition_target(condition)?;
        let param = self.bind(key, value);
        Some(Predicate::compare(column, op, param))
    }
}

/// Map a condition onto the column, comparison and value it tests.
fn condition_target(condition: &FilterCondition) -> Option<(Column, Comparison, ParamValue)> {
    let text = |s: &String| ParamValue::Text(s.clone());
    let target = match condition {
        FilterCondition::Category(s) => (Column::Category, Comparison::Equals, text(s)),
        FilterCondition::Location(s) => (Column::CityName, Comparison::Equals, text(s)),
        FilterCondition::EcoTag(s) => (Column::EcoTags, Comparison::Includes, text(s)),
        FilterCondition::NomadFeature(s) => (Column::NomadFeatures, Comparison::Includes, text(s)),
        FilterCondition::AccommodationType(s) => {
            (Column::AccommodationTypes, Comparison::Includes, text(s))
        }
        FilterCondition::EcoCertification(s) => {
            (Column::EcoCertification, Comparison::Equals, text(s))
        }
        FilterCondition::MinRating(n) => {
            (Column::Rating, Comparison::AtLeast, ParamValue::Number(*n))
        }
        FilterCondition::MaxPriceRange(n) => {
            (Column::PriceMax, Comparison::AtMost, ParamValue::Number(*n))
        }
        FilterCondition::MinPriceRange(n) => {
            (Column::PriceMin, Comparison::AtLeast, ParamValue::Number(*n))
        }
        FilterCondition::SustainabilityScore(n) => (
            Column::SustainabilityScore,
            Comparison::AtLeast,
            ParamValue::Number(*n),
        ),
        FilterCondition::Unsupported { .. } => return None,
    };
    Some(target)
}

/// Combination path: one parenthesized clause per enabled group, joined by
/// the combination operator.
fn compile_combinations(filters: &SearchFilters, bindings: &mut Bindings) {
    let mut groups = Vec::new();

    for (group_index, group) in filters.enabled_groups().enumerate() {
        let mut members = Vec::new();
        for (condition_index, condition) in group.conditions.iter().enumerate() {
            let key = format!(
                "{}_{group_index}_{condition_index}",
                condition.field_name()
            );
            match bindings.condition(condition, key) {
                Some(predicate) => members.push(predicate),
                None => debug!(
                    field = condition.field_name(),
                    group = group_index,
                    "skipping unsupported filter condition"
                ),
            }
        }
        if let Some(clause) = Predicate::join(group.operator, members) {
            groups.push(clause);
        }
    }

    let operator = filters.combination_operator.unwrap_or(BoolOperator::And);
    if let Some(clause) = Predicate::join(operator, groups) {
        bindings.clauses.push(clause);
    }
}

/// Legacy path: each present scalar is its own clause; array fields OR-join.
fn compile_legacy(filters: &SearchFilters, bindings: &mut Bindings) {
    if let Some(category) = present_text(&filters.category) {
        let clause = bindings.condition(
            &FilterCondition::Category(category.to_string()),
            "category".into(),
        );
        bindings.clauses.extend(clause);
    }
    if let Some(location) = present_text(&filters.location) {
        let clause = bindings.condition(
            &FilterCondition::Location(location.to_string()),
            "location".into(),
        );
        bindings.clauses.extend(clause);
    }

    compile_any_of(bindings, &filters.eco_tags, "tag", FilterCondition::EcoTag);
    compile_any_of(
        bindings,
        &filters.nomad_features,
        "feature",
        FilterCondition::NomadFeature,
    );

    let scalars: [(Option<f64>, &str, fn(f64) -> FilterCondition); 4] = [
        (filters.min_rating, "minRating", FilterCondition::MinRating),
        (filters.max_price_range, "maxPrice", FilterCondition::MaxPriceRange),
        (filters.min_price_range, "minPrice", FilterCondition::MinPriceRange),
        (
            filters.sustainability_score,
            "minSustainability",
            FilterCondition::SustainabilityScore,
        ),
    ];
    for (value, key, condition) in scalars {
        if let Some(n) = present_number(value) {
            let clause = bindings.condition(&condition(n), key.to_string());
            bindings.clauses.extend(clause);
        }
    }

    compile_any_of(
        bindings,
        &filters.accommodation_type,
        "accommodation",
        FilterCondition::AccommodationType,
    );

    if let Some(certification) = present_text(&filters.eco_certification) {
        let clause = bindings.condition(
            &FilterCondition::EcoCertification(certification.to_string()),
            "ecoCertification".into(),
        );
        bindings.clauses.extend(clause);
    }
}

/// OR-join one member-of clause per value, keyed `{prefix}_{i}`.
fn compile_any_of(
    bindings: &mut Bindings,
    values: &[String],
    prefix: &str,
    condition: fn(String) -> FilterCondition,
) {
    let members = values
        .iter()
        .enumerate()
        .filter_map(|(i, value)| {
            bindings.condition(&condition(value.clone()), format!("{prefix}_{i}"))
        })
        .collect();
    if let Some(clause) = Predicate::join(BoolOperator::Or, members) {
        bindings.clauses.push(clause);
    }
}

fn present_text(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Zero and NaN count as "not set".
fn present_number(value: Option<f64>) -> Option<f64> {
    value.filter(|n| *n != 0.0 && !n.is_nan())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::search::types::{FilterGroup, SortDirection};
    use serde_json::json;

    fn group(operator: BoolOperator, field: &str, value: serde_json::Value) -> FilterGroup {
        FilterGroup::new(operator, vec![FilterCondition::new(field, value)])
    }

    fn keys(descriptor: &QueryDescriptor) -> Vec<&str> {
        descriptor.params.iter().map(|p| p.key.as_str()).collect()
    }

    #[test]
    fn empty_filters_compile_to_no_clauses() {
        let filters = SearchFilters::default();
        let descriptor = FilterCompiler::default().compile(&filters, None, 1, None);
        assert!(descriptor.clauses.is_empty());
        assert!(descriptor.params.is_empty());
        assert_eq!(descriptor.sort, SortSpec::by_name());
        assert_eq!(descriptor.limit, 12);
        assert_eq!(descriptor.offset, 0);
    }

    #[test]
    fn combination_groups_compile_with_positional_keys() {
        let filters = SearchFilters {
            combinations: Some(vec![
                FilterGroup::new(
                    BoolOperator::Or,
                    vec![
                        FilterCondition::new("category", json!("coworking")),
                        FilterCondition::new("ecoTags", json!("Solar")),
                    ],
                ),
                group(BoolOperator::And, "minRating", json!(4)),
            ]),
            combination_operator: Some(BoolOperator::And),
            ..Default::default()
        };

        let descriptor = FilterCompiler::default().compile(&filters, None, 2, None);

        assert_eq!(
            descriptor.clause_text(),
            "((category == $category_0_0 OR $ecoTags_0_1 in ecoTags) AND rating >= $minRating_1_0)"
        );
        assert_eq!(keys(&descriptor), ["category_0_0", "ecoTags_0_1", "minRating_1_0"]);
        assert_eq!(descriptor.param("minRating_1_0"), Some(&ParamValue::Number(4.0)));
        assert_eq!(descriptor.offset, 12);
        assert_eq!(descriptor.limit, 12);
        assert_eq!(descriptor.sort, SortSpec::by_name());
    }

    #[test]
    fn combination_path_ignores_legacy_scalars() {
        let filters = SearchFilters {
            category: Some("cafe".to_string()),
            eco_tags: vec!["Zero Waste".to_string()],
            combinations: Some(vec![FilterGroup::new(
                BoolOperator::And,
                vec![FilterCondition::new("location", json!("Lisbon"))],
            )]),
            ..Default::default()
        };

        let descriptor = FilterCompiler::default().compile(&filters, None, 1, None);
        assert_eq!(descriptor.clause_text(), "city->name == $location_0_0");
        assert_eq!(keys(&descriptor), ["location_0_0"]);
    }

    #[test]
    fn disabled_groups_are_skipped_and_indices_count_enabled_only() {
        let filters = SearchFilters {
            combinations: Some(vec![
                group(BoolOperator::Or, "category", json!("cafe")).disabled(),
                group(BoolOperator::Or, "ecoTags", json!("Solar")),
            ]),
            ..Default::default()
        };

        let descriptor = FilterCompiler::default().compile(&filters, None, 1, None);
        assert_eq!(keys(&descriptor), ["ecoTags_0_0"]);
    }

    #[test]
    fn all_groups_disabled_falls_back_to_legacy() {
        let filters = SearchFilters {
            category: Some("cafe".to_string()),
            combinations: Some(vec![FilterGroup::new(
                BoolOperator::Or,
                vec![FilterCondition::new("ecoTags", json!("Solar"))],
            )
            .disabled()]),
            ..Default::default()
        };

        let descriptor = FilterCompiler::default().compile(&filters, None, 1, None);
        assert_eq!(descriptor.clause_text(), "category == $category");
    }

    #[test]
    fn unsupported_conditions_compile_to_nothing() {
        let filters = SearchFilters {
            combinations: Some(vec![
                FilterGroup::new(
                    BoolOperator::And,
                    vec![
                        FilterCondition::new("wifiSpeed", json!(100)),
                        FilterCondition::new("category", json!("cafe")),
                    ],
                ),
                FilterGroup::new(BoolOperator::And, vec![FilterCondition::new("geo", json!({}))]),
            ]),
            ..Default::default()
        };

        let descriptor = FilterCompiler::default().compile(&filters, None, 1, None);
        assert_eq!(descriptor.clause_text(), "category == $category_0_1");
        assert_eq!(keys(&descriptor), ["category_0_1"]);
    }

    #[test]
    fn legacy_scalars_compile_independently() {
        let filters = SearchFilters {
            category: Some("coworking".to_string()),
            location: Some("Lisbon".to_string()),
            eco_tags: vec!["Solar".to_string(), "Zero Waste".to_string()],
            nomad_features: vec!["Fast WiFi".to_string()],
            min_rating: Some(4.0),
            max_price_range: Some(30.0),
            ..Default::default()
        };

        let descriptor = FilterCompiler::default().compile(&filters, None, 1, None);
        assert_eq!(
            descriptor.clause_text(),
            "category == $category AND city->name == $location AND \
             ($tag_0 in ecoTags OR $tag_1 in ecoTags) AND $feature_0 in nomadFeatures AND \
             rating >= $minRating AND priceRange.max <= $maxPrice"
        );
        assert_eq!(
            keys(&descriptor),
            ["category", "location", "tag_0", "tag_1", "feature_0", "minRating", "maxPrice"]
        );
    }

    #[test]
    fn legacy_supplemented_fields() {
        let filters = SearchFilters {
            min_price_range: Some(5.0),
            sustainability_score: Some(70.0),
            accommodation_type: vec!["hostel".to_string(), "coliving".to_string()],
            eco_certification: Some("Green Key".to_string()),
            ..Default::default()
        };

        let descriptor = FilterCompiler::default().compile(&filters, None, 1, None);
        assert_eq!(
            keys(&descriptor),
            [
                "minPrice",
                "minSustainability",
                "accommodation_0",
                "accommodation_1",
                "ecoCertification"
            ]
        );
        assert_eq!(descriptor.clauses.len(), 4);
    }

    #[test]
    fn legacy_falsy_scalars_are_skipped() {
        let filters = SearchFilters {
            category: Some(String::new()),
            min_rating: Some(0.0),
            max_price_range: Some(f64::NAN),
            ..Default::default()
        };

        let descriptor = FilterCompiler::default().compile(&filters, None, 1, None);
        assert!(descriptor.clauses.is_empty());
    }

    #[test]
    fn text_clause_is_last_and_verbatim() {
        let filters = SearchFilters {
            search_query: "  Café ".to_string(),
            category: Some("cafe".to_string()),
            ..Default::default()
        };

        let descriptor = FilterCompiler::default().compile(&filters, None, 1, None);
        assert_eq!(
            descriptor.clause_text(),
            "category == $category AND (name ~ $searchQuery OR descriptionShort ~ $searchQuery)"
        );
        assert_eq!(
            descriptor.param(SEARCH_QUERY_PARAM),
            Some(&ParamValue::Text("  Café ".to_string()))
        );
    }

    #[test]
    fn compile_is_deterministic() {
        let filters = SearchFilters {
            search_query: "desk".to_string(),
            combinations: Some(vec![FilterGroup::new(
                BoolOperator::Or,
                vec![
                    FilterCondition::new("nomadFeatures", json!("Fast WiFi")),
                    FilterCondition::new("nomadFeatures", json!("Standing Desks")),
                ],
            )]),
            ..Default::default()
        };
        let compiler = FilterCompiler::default();
        let sort = SortSpec::new("rating", SortDirection::Desc);

        let first = compiler.compile(&filters, Some(&sort), 3, Some(20));
        let second = compiler.compile(&filters, Some(&sort), 3, Some(20));
        assert_eq!(first, second);
        assert_eq!(first.cache_key(), second.cache_key());
        assert_eq!(first.offset, 40);
        assert_eq!(first.sort, sort);
    }

    #[test]
    fn page_zero_is_treated_as_first_page() {
        let filters = SearchFilters::default();
        let descriptor = FilterCompiler::new(10).compile(&filters, None, 0, Some(0));
        assert_eq!(descriptor.limit, 10);
        assert_eq!(descriptor.offset, 0);
    }
}
