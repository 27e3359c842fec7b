//! Storage-agnostic query descriptor produced by the filter compiler.
//!
//! A descriptor is an ordered list of top-level clauses (implicitly ANDed),
//! a parameter table the clauses reference by key, a sort and a window.
//! Stores translate it into their own query language; values never appear
//! inline in the clauses.

use super::types::{BoolOperator, SortSpec};
use serde::Serialize;
use std::fmt;

/// A listing attribute a predicate can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Column {
    Name,
    DescriptionShort,
    Category,
    CityName,
    EcoTags,
    NomadFeatures,
    Rating,
    PriceMin,
    PriceMax,
    SustainabilityScore,
    AccommodationTypes,
    EcoCertification,
}

impl Column {
    /// Neutral path notation used in rendered clause text.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::DescriptionShort => "descriptionShort",
            Self::Category => "category",
            Self::CityName => "city->name",
            Self::EcoTags => "ecoTags",
            Self::NomadFeatures => "nomadFeatures",
            Self::Rating => "rating",
            Self::PriceMin => "priceRange.min",
            Self::PriceMax => "priceRange.max",
            Self::SustainabilityScore => "sustainabilityScore",
            Self::AccommodationTypes => "accommodationTypes",
            Self::EcoCertification => "ecoCertification",
        }
    }
}

/// Comparison applied between a column and a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Comparison {
    /// Column equals the parameter.
    Equals,
    /// Parameter is a member of the array column.
    Includes,
    /// Column is greater than or equal to the parameter.
    AtLeast,
    /// Column is less than or equal to the parameter.
    AtMost,
}

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Number(f64),
}

impl ParamValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A named parameter in the descriptor's parameter table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub key: String,
    pub value: ParamValue,
}

/// A predicate tree over listing columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Predicate {
    /// Case-insensitive substring match of the parameter against any column.
    Matches { columns: Vec<Column>, param: String },
    Compare {
        column: Column,
        op: Comparison,
        param: String,
    },
    All { predicates: Vec<Predicate> },
    Any { predicates: Vec<Predicate> },
}

impl Predicate {
    pub fn compare(column: Column, op: Comparison, param: impl Into<String>) -> Self {
        Self::Compare {
            column,
            op,
            param: param.into(),
        }
    }

    /// Join predicates with `operator`. A single predicate is returned as-is
    /// and an empty list yields `None`.
    pub fn join(operator: BoolOperator, mut predicates: Vec<Predicate>) -> Option<Predicate> {
        match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(match operator {
                BoolOperator::And => Self::All { predicates },
                BoolOperator::Or => Self::Any { predicates },
            }),
        }
    }

    fn fmt_joined(f: &mut fmt::Formatter<'_>, predicates: &[Predicate], sep: &str) -> fmt::Result {
        f.write_str("(")?;
        for (i, predicate) in predicates.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            write!(f, "{predicate}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matches { columns, param } => {
                if columns.len() > 1 {
                    f.write_str("(")?;
                }
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" OR ")?;
                    }
                    write!(f, "{} ~ ${param}", column.path())?;
                }
                if columns.len() > 1 {
                    f.write_str(")")?;
                }
                Ok(())
            }
            Self::Compare { column, op, param } => match op {
                Comparison::Equals => write!(f, "{} == ${param}", column.path()),
                Comparison::Includes => write!(f, "${param} in {}", column.path()),
                Comparison::AtLeast => write!(f, "{} >= ${param}", column.path()),
                Comparison::AtMost => write!(f, "{} <= ${param}", column.path()),
            },
            Self::All { predicates } => Self::fmt_joined(f, predicates, " AND "),
            Self::Any { predicates } => Self::fmt_joined(f, predicates, " OR "),
        }
    }
}

/// Compiled, parameterized description of one search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDescriptor {
    /// Top-level clauses, ANDed together.
    pub clauses: Vec<Predicate>,

    /// Parameters in the order they were bound.
    pub params: Vec<Param>,

    pub sort: SortSpec,

    pub limit: u32,

    pub offset: u64,
}

impl QueryDescriptor {
    /// Look up a bound parameter.
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|param| param.key == key)
            .map(|param| &param.value)
    }

    /// 1-indexed page this window starts on.
    pub fn page(&self) -> u32 {
        if self.limit == 0 {
            return 1;
        }
        u32::try_from(self.offset / u64::from(self.limit))
            .unwrap_or(u32::MAX)
            .saturating_add(1)
    }

    /// Clauses rendered in neutral notation, ANDed.
    pub fn clause_text(&self) -> String {
        self.clauses
            .iter()
            .map(|clause| clause.to_string())
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Stable key identifying this exact query, for result caching.
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
