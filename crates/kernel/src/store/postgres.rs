//! PostgreSQL listing store.
//!
//! Renders descriptors with [`DescriptorSqlBuilder`] and binds the resulting
//! SeaQuery values to sqlx queries in order.

use super::{ListingStore, StorePage, StoreError};
use crate::models::{Listing, PriceRange};
use crate::search::descriptor::QueryDescriptor;
use crate::search::sql::{DescriptorSqlBuilder, build_suggestions};
use async_trait::async_trait;
use chrono::NaiveDate;
use sea_query::{Value, Values};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

/// A positional query argument decoded from SeaQuery values.
#[derive(Debug, Clone, PartialEq)]
enum BindValue {
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
}

fn bind_values(values: Values) -> Result<Vec<BindValue>, StoreError> {
    values
        .0
        .into_iter()
        .map(|value| match value {
            Value::String(Some(s)) => Ok(BindValue::Text(s.to_string())),
            Value::Double(Some(n)) => Ok(BindValue::Float(n)),
            Value::Float(Some(n)) => Ok(BindValue::Float(f64::from(n))),
            Value::BigInt(Some(n)) => Ok(BindValue::Int(n)),
            Value::Int(Some(n)) => Ok(BindValue::Int(i64::from(n))),
            Value::BigUnsigned(Some(n)) => i64::try_from(n)
                .map(BindValue::Int)
                .map_err(|_| StoreError::UnsupportedParameter(format!("{n} out of range"))),
            Value::Unsigned(Some(n)) => Ok(BindValue::Int(i64::from(n))),
            Value::Bool(Some(b)) => Ok(BindValue::Bool(b)),
            other => Err(StoreError::UnsupportedParameter(format!("{other:?}"))),
        })
        .collect()
}

/// Raw listing row as selected by [`DescriptorSqlBuilder`].
#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: Uuid,
    name: String,
    slug: String,
    description_short: Option<String>,
    category: String,
    eco_tags: Vec<String>,
    nomad_features: Vec<String>,
    rating: Option<f64>,
    price_min: Option<f64>,
    price_max: Option<f64>,
    price_currency: Option<String>,
    sustainability_score: Option<f64>,
    accommodation_types: Vec<String>,
    eco_certification: Option<String>,
    last_verified_date: Option<NaiveDate>,
    city_name: Option<String>,
}

impl From<ListingRow> for Listing {
    fn from(row: ListingRow) -> Self {
        let price_range = match (row.price_min, row.price_max) {
            (Some(min), Some(max)) => Some(PriceRange {
                min,
                max,
                currency: row.price_currency,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description_short: row.description_short,
            category: row.category,
            city: row.city_name,
            eco_tags: row.eco_tags,
            nomad_features: row.nomad_features,
            rating: row.rating,
            price_range,
            sustainability_score: row.sustainability_score,
            accommodation_types: row.accommodation_types,
            eco_certification: row.eco_certification,
            last_verified_date: row.last_verified_date,
        }
    }
}

/// Listing store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn search(&self, descriptor: &QueryDescriptor) -> Result<StorePage, StoreError> {
        let builder = DescriptorSqlBuilder::new(descriptor);

        let (count_sql, count_values) = builder.build_count();
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for value in bind_values(count_values)? {
            count_query = match value {
                BindValue::Text(v) => count_query.bind(v),
                BindValue::Float(v) => count_query.bind(v),
                BindValue::Int(v) => count_query.bind(v),
                BindValue::Bool(v) => count_query.bind(v),
            };
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let (sql, values) = builder.build();
        debug!(sql = %sql, "executing listing search");

        let mut query = sqlx::query_as::<_, ListingRow>(&sql);
        for value in bind_values(values)? {
            query = match value {
                BindValue::Text(v) => query.bind(v),
                BindValue::Float(v) => query.bind(v),
                BindValue::Int(v) => query.bind(v),
                BindValue::Bool(v) => query.bind(v),
            };
        }
        let rows = query.fetch_all(&self.pool).await?;

        Ok(StorePage {
            rows: rows.into_iter().map(Listing::from).collect(),
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let (sql, values) = build_suggestions(prefix, limit);

        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for value in bind_values(values)? {
            query = match value {
                BindValue::Text(v) => query.bind(v),
                BindValue::Float(v) => query.bind(v),
                BindValue::Int(v) => query.bind(v),
                BindValue::Bool(v) => query.bind(v),
            };
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn healthy(&self) -> bool {
        crate::db::check_health(&self.pool).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn bind_values_converts_limit_and_text() {
        let values = Values(vec![
            Value::from("Solar".to_string()),
            Value::from(4.5_f64),
            Value::from(12_u64),
        ]);
        assert_eq!(
            bind_values(values).unwrap(),
            vec![
                BindValue::Text("Solar".to_string()),
                BindValue::Float(4.5),
                BindValue::Int(12),
            ]
        );
    }

    #[test]
    fn bind_values_rejects_null() {
        let values = Values(vec![Value::String(None)]);
        assert!(matches!(
            bind_values(values),
            Err(StoreError::UnsupportedParameter(_))
        ));
    }

    #[test]
    fn row_without_full_price_band_has_no_price_range() {
        let row = ListingRow {
            id: Uuid::nil(),
            name: "Desk Lab".to_string(),
            slug: "desk-lab".to_string(),
            description_short: None,
            category: "coworking".to_string(),
            eco_tags: vec![],
            nomad_features: vec![],
            rating: Some(4.0),
            price_min: Some(10.0),
            price_max: None,
            price_currency: None,
            sustainability_score: None,
            accommodation_types: vec![],
            eco_certification: None,
            last_verified_date: None,
            city_name: Some("Lisbon".to_string()),
        };
        let listing = Listing::from(row);
        assert_eq!(listing.price_range, None);
        assert_eq!(listing.city.as_deref(), Some("Lisbon"));
    }
}
