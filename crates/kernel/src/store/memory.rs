//! In-process listing store.
//!
//! Evaluates descriptors directly against a `Vec<Listing>`, mirroring the
//! PostgreSQL semantics: case-insensitive substring matching, nulls sorting
//! last on ascending order, and an id tiebreak so pages never overlap.

use super::{ListingStore, StorePage, StoreError};
use crate::models::Listing;
use crate::search::descriptor::{Column, Comparison, ParamValue, Predicate, QueryDescriptor};
use crate::search::types::SortDirection;
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Listing store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    listings: RwLock<Vec<Listing>>,
}

impl MemoryStore {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: RwLock::new(listings),
        }
    }

    /// Load listings from a JSON array.
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        let listings: Vec<Listing> = serde_json::from_str(json)?;
        Ok(Self::new(listings))
    }

    /// Load listings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_json_str(&json)?;
        info!(path = %path.display(), listings = store.len(), "loaded listings");
        Ok(store)
    }

    pub fn insert(&self, listing: Listing) {
        self.listings.write().push(listing);
    }

    pub fn len(&self) -> usize {
        self.listings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.read().is_empty()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn search(&self, descriptor: &QueryDescriptor) -> Result<StorePage, StoreError> {
        let listings = self.listings.read();

        let mut matches: Vec<&Listing> = listings
            .iter()
            .filter(|listing| {
                descriptor
                    .clauses
                    .iter()
                    .all(|clause| evaluate(listing, clause, descriptor))
            })
            .collect();

        let field = descriptor.sort.field.as_str();
        let direction = descriptor.sort.direction;
        matches.sort_by(|a, b| {
            let primary = match (sort_cell(a, field), sort_cell(b, field)) {
                (Some(x), Some(y)) => compare_cells(&x, &y),
                _ => Ordering::Equal,
            };
            let primary = match direction {
                SortDirection::Asc => primary,
                SortDirection::Desc => primary.reverse(),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        let total = matches.len() as u64;
        let offset = usize::try_from(descriptor.offset).unwrap_or(usize::MAX);
        let rows: Vec<Listing> = matches
            .into_iter()
            .skip(offset)
            .take(descriptor.limit as usize)
            .cloned()
            .collect();

        debug!(total, returned = rows.len(), "memory store search");
        Ok(StorePage { rows, total })
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let needle = prefix.to_lowercase();
        let listings = self.listings.read();
        let names: BTreeSet<&str> = listings
            .iter()
            .filter(|listing| listing.name.to_lowercase().contains(&needle))
            .map(|listing| listing.name.as_str())
            .collect();
        Ok(names.into_iter().take(limit).map(str::to_string).collect())
    }
}

/// A listing attribute viewed for comparison.
enum Cell<'a> {
    Text(Option<&'a str>),
    List(&'a [String]),
    Number(Option<f64>),
    Date(Option<NaiveDate>),
}

fn cell(listing: &Listing, column: Column) -> Cell<'_> {
    match column {
        Column::Name => Cell::Text(Some(&listing.name)),
        Column::DescriptionShort => Cell::Text(listing.description_short.as_deref()),
        Column::Category => Cell::Text(Some(&listing.category)),
        Column::CityName => Cell::Text(listing.city.as_deref()),
        Column::EcoTags => Cell::List(&listing.eco_tags),
        Column::NomadFeatures => Cell::List(&listing.nomad_features),
        Column::Rating => Cell::Number(listing.rating),
        Column::PriceMin => Cell::Number(listing.price_range.as_ref().map(|p| p.min)),
        Column::PriceMax => Cell::Number(listing.price_range.as_ref().map(|p| p.max)),
        Column::SustainabilityScore => Cell::Number(listing.sustainability_score),
        Column::AccommodationTypes => Cell::List(&listing.accommodation_types),
        Column::EcoCertification => Cell::Text(listing.eco_certification.as_deref()),
    }
}

fn evaluate(listing: &Listing, predicate: &Predicate, descriptor: &QueryDescriptor) -> bool {
    match predicate {
        Predicate::Matches { columns, param } => {
            let Some(needle) = descriptor.param(param).and_then(ParamValue::as_text) else {
                return false;
            };
            let needle = needle.to_lowercase();
            columns.iter().any(|column| match cell(listing, *column) {
                Cell::Text(Some(text)) => text.to_lowercase().contains(&needle),
                _ => false,
            })
        }
        Predicate::Compare { column, op, param } => {
            let Some(value) = descriptor.param(param) else {
                return false;
            };
            compare(&cell(listing, *column), *op, value)
        }
        Predicate::All { predicates } => predicates
            .iter()
            .all(|p| evaluate(listing, p, descriptor)),
        Predicate::Any { predicates } => predicates
            .iter()
            .any(|p| evaluate(listing, p, descriptor)),
    }
}

fn compare(cell: &Cell<'_>, op: Comparison, value: &ParamValue) -> bool {
    match (cell, op, value) {
        (Cell::Text(Some(text)), Comparison::Equals, ParamValue::Text(v)) => *text == v.as_str(),
        (Cell::List(items), Comparison::Includes, ParamValue::Text(v)) => items.contains(v),
        (Cell::Number(Some(n)), Comparison::Equals, ParamValue::Number(v)) => n == v,
        (Cell::Number(Some(n)), Comparison::AtLeast, ParamValue::Number(v)) => n >= v,
        (Cell::Number(Some(n)), Comparison::AtMost, ParamValue::Number(v)) => n <= v,
        _ => false,
    }
}

fn sort_cell<'a>(listing: &'a Listing, field: &str) -> Option<Cell<'a>> {
    let column = match field {
        "name" => Column::Name,
        "category" => Column::Category,
        "city" | "location" => Column::CityName,
        "rating" => Column::Rating,
        "price" | "priceRange.min" => Column::PriceMin,
        "priceRange.max" => Column::PriceMax,
        "sustainabilityScore" => Column::SustainabilityScore,
        "lastVerifiedDate" => return Some(Cell::Date(listing.last_verified_date)),
        _ => return None,
    };
    Some(cell(listing, column))
}

/// Ascending comparison with missing values last.
fn compare_cells(a: &Cell<'_>, b: &Cell<'_>) -> Ordering {
    fn missing_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(T, T) -> Ordering) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => cmp(a, b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    match (a, b) {
        (Cell::Text(a), Cell::Text(b)) => {
            missing_last(*a, *b, |a, b| a.to_lowercase().cmp(&b.to_lowercase()))
        }
        (Cell::Number(a), Cell::Number(b)) => missing_last(*a, *b, |a, b| a.total_cmp(&b)),
        (Cell::Date(a), Cell::Date(b)) => missing_last(*a, *b, |a, b| a.cmp(&b)),
        _ => Ordering::Equal,
    }
}
