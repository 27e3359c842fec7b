//! PostgreSQL rendering of query descriptors using SeaQuery.
//!
//! Listings live in the `listing` table; the city name comes from a LEFT JOIN
//! on `city`. Array attributes are `text[]` columns tested with `= ANY(..)`.
//! Every descriptor parameter is bound, never inlined, unless the caller
//! explicitly asks for the inline rendering used by the CLI.

use super::descriptor::{Column, Comparison, ParamValue, Predicate, QueryDescriptor};
use super::types::SortDirection;
use sea_query::{
    Alias, Asterisk, Cond, Expr, ExprTrait, Order, PostgresQueryBuilder, Query, SelectStatement,
    SimpleExpr, Value, Values,
};

const LISTING: &str = "listing";
const CITY: &str = "city";

/// Columns selected for every listing row, in `ListingRow` order.
const LISTING_COLUMNS: [&str; 15] = [
    "id",
    "name",
    "slug",
    "description_short",
    "category",
    "eco_tags",
    "nomad_features",
    "rating",
    "price_min",
    "price_max",
    "price_currency",
    "sustainability_score",
    "accommodation_types",
    "eco_certification",
    "last_verified_date",
];

/// Table and column backing a descriptor column.
fn column_ref(column: Column) -> (&'static str, &'static str) {
    match column {
        Column::Name => (LISTING, "name"),
        Column::DescriptionShort => (LISTING, "description_short"),
        Column::Category => (LISTING, "category"),
        Column::CityName => (CITY, "name"),
        Column::EcoTags => (LISTING, "eco_tags"),
        Column::NomadFeatures => (LISTING, "nomad_features"),
        Column::Rating => (LISTING, "rating"),
        Column::PriceMin => (LISTING, "price_min"),
        Column::PriceMax => (LISTING, "price_max"),
        Column::SustainabilityScore => (LISTING, "sustainability_score"),
        Column::AccommodationTypes => (LISTING, "accommodation_types"),
        Column::EcoCertification => (LISTING, "eco_certification"),
    }
}

/// Table and column for a sort field name, `None` for unknown fields.
fn sort_ref(field: &str) -> Option<(&'static str, &'static str)> {
    let column = match field {
        "name" => Column::Name,
        "category" => Column::Category,
        "city" | "location" => Column::CityName,
        "rating" => Column::Rating,
        "price" | "priceRange.min" => Column::PriceMin,
        "priceRange.max" => Column::PriceMax,
        "sustainabilityScore" => Column::SustainabilityScore,
        "lastVerifiedDate" => return Some((LISTING, "last_verified_date")),
        _ => return None,
    };
    Some(column_ref(column))
}

fn column_expr(column: Column) -> SimpleExpr {
    let (table, name) = column_ref(column);
    Expr::col((Alias::new(table), Alias::new(name))).into()
}

/// Quoted `"table"."column"` for custom expressions.
fn column_sql(column: Column) -> String {
    let (table, name) = column_ref(column);
    format!("\"{table}\".\"{name}\"")
}

fn param_value(value: &ParamValue) -> Value {
    match value {
        ParamValue::Text(s) => s.clone().into(),
        ParamValue::Number(n) => (*n).into(),
    }
}

/// Escape LIKE wildcards so user text matches literally.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Renders a [`QueryDescriptor`] into PostgreSQL.
pub struct DescriptorSqlBuilder<'a> {
    descriptor: &'a QueryDescriptor,
}

impl<'a> DescriptorSqlBuilder<'a> {
    pub fn new(descriptor: &'a QueryDescriptor) -> Self {
        Self { descriptor }
    }

    /// Build the paged SELECT with bound parameters.
    pub fn build(&self) -> (String, Values) {
        self.select().build(PostgresQueryBuilder)
    }

    /// Build a COUNT query over the same filters.
    pub fn build_count(&self) -> (String, Values) {
        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count());
        self.add_from(&mut query);
        self.add_filters(&mut query);
        query.build(PostgresQueryBuilder)
    }

    /// The paged SELECT with values inlined, for inspection only.
    pub fn to_inline_sql(&self) -> String {
        self.select().to_string(PostgresQueryBuilder)
    }

    fn select(&self) -> SelectStatement {
        let mut query = Query::select();

        for column in LISTING_COLUMNS {
            query.column((Alias::new(LISTING), Alias::new(column)));
        }
        query.expr_as(
            Expr::col((Alias::new(CITY), Alias::new("name"))),
            Alias::new("city_name"),
        );

        self.add_from(&mut query);
        self.add_filters(&mut query);
        self.add_sort(&mut query);

        query.limit(u64::from(self.descriptor.limit));
        query.offset(self.descriptor.offset);
        query
    }

    fn add_from(&self, query: &mut SelectStatement) {
        query.from(Alias::new(LISTING));
        query.left_join(
            Alias::new(CITY),
            Expr::col((Alias::new(LISTING), Alias::new("city_id")))
                .equals((Alias::new(CITY), Alias::new("id"))),
        );
    }

    fn add_filters(&self, query: &mut SelectStatement) {
        for clause in &self.descriptor.clauses {
            if let Some(condition) = self.predicate_expr(clause) {
                query.and_where(condition);
            }
        }
    }

    fn add_sort(&self, query: &mut SelectStatement) {
        let sort = &self.descriptor.sort;
        let order = match sort.direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };

        match sort_ref(&sort.field) {
            Some((table, column)) => {
                query.order_by((Alias::new(table), Alias::new(column)), order);
            }
            None => tracing::warn!(field = %sort.field, "unknown sort field; ordering by id"),
        }

        // Stable tiebreak so pages never overlap.
        query.order_by((Alias::new(LISTING), Alias::new("id")), Order::Asc);
    }

    fn predicate_expr(&self, predicate: &Predicate) -> Option<SimpleExpr> {
        match predicate {
            Predicate::Matches { columns, param } => {
                let Some(text) = self.descriptor.param(param).and_then(ParamValue::as_text) else {
                    return Some(Self::restrict(param));
                };
                let pattern = format!("%{}%", escape_like_wildcards(text));
                let mut cond = Cond::any();
                for column in columns {
                    cond = cond.add(Expr::cust_with_values(
                        format!("{} ILIKE $1", column_sql(*column)),
                        [pattern.clone()],
                    ));
                }
                Some(cond.into())
            }
            Predicate::Compare { column, op, param } => {
                let Some(value) = self.descriptor.param(param).map(param_value) else {
                    return Some(Self::restrict(param));
                };
                Some(match op {
                    Comparison::Equals => column_expr(*column).eq(value),
                    Comparison::AtLeast => column_expr(*column).gte(value),
                    Comparison::AtMost => column_expr(*column).lte(value),
                    Comparison::Includes => Expr::cust_with_values(
                        format!("$1 = ANY({})", column_sql(*column)),
                        [value],
                    ),
                })
            }
            Predicate::All { predicates } => self.group_expr(Cond::all(), predicates),
            Predicate::Any { predicates } => self.group_expr(Cond::any(), predicates),
        }
    }

    fn group_expr(&self, mut cond: Cond, predicates: &[Predicate]) -> Option<SimpleExpr> {
        let mut added = false;
        for predicate in predicates {
            if let Some(expr) = self.predicate_expr(predicate) {
                cond = cond.add(expr);
                added = true;
            }
        }
        added.then(|| cond.into())
    }

    /// A clause whose parameter is missing or ill-typed matches nothing.
    fn restrict(param: &str) -> SimpleExpr {
        tracing::error!(param, "unusable descriptor parameter; restricting results");
        Expr::cust("FALSE")
    }
}

/// Build the name suggestion query for `prefix`.
pub fn build_suggestions(prefix: &str, limit: usize) -> (String, Values) {
    let pattern = format!("%{}%", escape_like_wildcards(prefix));
    let mut query = Query::select();
    query
        .distinct()
        .column((Alias::new(LISTING), Alias::new("name")))
        .from(Alias::new(LISTING))
        .and_where(Expr::cust_with_values(
            format!("\"{LISTING}\".\"name\" ILIKE $1"),
            [pattern],
        ))
        .order_by((Alias::new(LISTING), Alias::new("name")), Order::Asc)
        .limit(limit as u64);
    query.build(PostgresQueryBuilder)
}
