//! Nomadir test utilities.
//!
//! Listing fixtures, a sample filter registry, and assertion helpers for
//! integration tests.

use serde_json::{Value as JsonValue, json};
use uuid::Uuid;

/// Create a test listing with default values.
///
/// Ids are derived from `seq` so fixture ordering is predictable.
pub fn test_listing(seq: u128, name: &str, category: &str) -> TestListing {
    TestListing {
        id: Uuid::from_u128(seq),
        name: name.to_string(),
        category: category.to_string(),
        city: None,
        eco_tags: Vec::new(),
        nomad_features: Vec::new(),
        rating: None,
        price_range: None,
        sustainability_score: None,
        accommodation_types: Vec::new(),
        eco_certification: None,
        last_verified_date: None,
    }
}

/// A listing builder for creating test fixtures.
#[derive(Debug, Clone)]
pub struct TestListing {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub city: Option<String>,
    pub eco_tags: Vec<String>,
    pub nomad_features: Vec<String>,
    pub rating: Option<f64>,
    pub price_range: Option<(f64, f64)>,
    pub sustainability_score: Option<f64>,
    pub accommodation_types: Vec<String>,
    pub eco_certification: Option<String>,
    pub last_verified_date: Option<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl TestListing {
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn in_city(mut self, city: &str) -> Self {
        self.city = Some(city.to_string());
        self
    }

    pub fn with_eco_tags(mut self, tags: &[&str]) -> Self {
        self.eco_tags = strings(tags);
        self
    }

    pub fn with_features(mut self, features: &[&str]) -> Self {
        self.nomad_features = strings(features);
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_price(mut self, min: f64, max: f64) -> Self {
        self.price_range = Some((min, max));
        self
    }

    pub fn with_sustainability(mut self, score: f64) -> Self {
        self.sustainability_score = Some(score);
        self
    }

    pub fn with_accommodation_types(mut self, types: &[&str]) -> Self {
        self.accommodation_types = strings(types);
        self
    }

    pub fn certified(mut self, certification: &str) -> Self {
        self.eco_certification = Some(certification.to_string());
        self
    }

    /// Set the verification date (`YYYY-MM-DD`).
    pub fn verified_on(mut self, date: &str) -> Self {
        self.last_verified_date = Some(date.to_string());
        self
    }

    /// Render as the camelCase JSON a listing store loads.
    pub fn to_json(&self) -> JsonValue {
        let slug = self
            .name
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        json!({
            "id": self.id,
            "name": self.name,
            "slug": slug,
            "category": self.category,
            "city": self.city,
            "ecoTags": self.eco_tags,
            "nomadFeatures": self.nomad_features,
            "rating": self.rating,
            "priceRange": self.price_range.map(|(min, max)| json!({
                "min": min,
                "max": max,
                "currency": "EUR",
            })),
            "sustainabilityScore": self.sustainability_score,
            "accommodationTypes": self.accommodation_types,
            "ecoCertification": self.eco_certification,
            "lastVerifiedDate": self.last_verified_date,
        })
    }
}

/// Number of listings in [`sample_listings`].
pub const SAMPLE_LISTING_COUNT: usize = 8;

/// A small directory spanning every category and filterable attribute.
///
/// | seq | name                  | category      | city        | rating | price  | score |
/// |-----|-----------------------|---------------|-------------|--------|--------|-------|
/// | 1   | Hub Lisboa            | coworking     | Lisbon      | 4.7    | 15-25  | 85    |
/// | 2   | Copenhagen Coffee Lab | cafe          | Lisbon      | 4.5    | 3-8    | 70    |
/// | 3   | Selina Porto          | accommodation | Porto       | 4.1    | 20-60  | 55    |
/// | 4   | Outpost Canggu        | coworking     | Canggu      | 4.8    | 10-20  | 78    |
/// | 5   | Punspace              | coworking     | Chiang Mai  | 4.3    | 5-12   | 40    |
/// | 6   | Selina Medellin       | accommodation | Medellín    | 3.9    | 15-45  | 62    |
/// | 7   | Cafe Pergamino        | cafe          | Medellín    | 4.6    | 2-6    | 66    |
/// | 8   | Nomad Loft Mexico     | accommodation | Mexico City | -      | -      | -     |
pub fn sample_listings() -> Vec<TestListing> {
    vec![
        test_listing(1, "Hub Lisboa", "coworking")
            .in_city("Lisbon")
            .with_eco_tags(&["Solar Powered", "Zero Waste"])
            .with_features(&["Fast WiFi", "Standing Desks", "24/7 Access"])
            .with_rating(4.7)
            .with_price(15.0, 25.0)
            .with_sustainability(85.0)
            .certified("B Corp")
            .verified_on("2024-05-01"),
        test_listing(2, "Copenhagen Coffee Lab", "cafe")
            .in_city("Lisbon")
            .with_eco_tags(&["Organic", "Local Sourcing"])
            .with_features(&["Fast WiFi"])
            .with_rating(4.5)
            .with_price(3.0, 8.0)
            .with_sustainability(70.0)
            .verified_on("2024-03-12"),
        test_listing(3, "Selina Porto", "accommodation")
            .in_city("Porto")
            .with_eco_tags(&["Plastic Free"])
            .with_features(&["Fast WiFi", "Meeting Rooms"])
            .with_rating(4.1)
            .with_price(20.0, 60.0)
            .with_sustainability(55.0)
            .with_accommodation_types(&["hostel", "coliving"]),
        test_listing(4, "Outpost Canggu", "coworking")
            .in_city("Canggu")
            .with_eco_tags(&["Solar Powered"])
            .with_features(&["Fast WiFi", "Phone Booths", "24/7 Access"])
            .with_rating(4.8)
            .with_price(10.0, 20.0)
            .with_sustainability(78.0)
            .certified("Green Key"),
        test_listing(5, "Punspace", "coworking")
            .in_city("Chiang Mai")
            .with_features(&["Fast WiFi", "Meeting Rooms"])
            .with_rating(4.3)
            .with_price(5.0, 12.0)
            .with_sustainability(40.0),
        test_listing(6, "Selina Medellin", "accommodation")
            .in_city("Medellín")
            .with_eco_tags(&["Zero Waste", "Local Sourcing"])
            .with_features(&["Fast WiFi"])
            .with_rating(3.9)
            .with_price(15.0, 45.0)
            .with_sustainability(62.0)
            .with_accommodation_types(&["hostel"]),
        test_listing(7, "Cafe Pergamino", "cafe")
            .in_city("Medellín")
            .with_eco_tags(&["Organic"])
            .with_rating(4.6)
            .with_price(2.0, 6.0)
            .with_sustainability(66.0),
        test_listing(8, "Nomad Loft Mexico", "accommodation")
            .in_city("Mexico City")
            .with_eco_tags(&["Solar Powered", "Plastic Free"])
            .with_features(&["Fast WiFi", "Standing Desks"])
            .with_accommodation_types(&["apartment", "coliving"]),
    ]
}

/// [`sample_listings`] as a JSON array string.
pub fn sample_listings_json() -> String {
    JsonValue::Array(sample_listings().iter().map(TestListing::to_json).collect()).to_string()
}

/// A two-group filter registry in the YAML format the kernel loads.
pub const SAMPLE_FILTERS_YAML: &str = r#"
groups:
  - id: category
    label: Category
    multiSelect: true
    options:
      - id: coworking
        label: Coworking
      - id: cafe
        label: Cafe
  - id: location
    label: City
    options:
      - id: Lisbon
        label: Lisbon
      - id: Porto
        label: Porto
"#;

/// Assertion helpers for JSON responses.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that a search response lists exactly `expected` names, in order.
    pub fn result_names(response: &Value, expected: &[&str]) {
        let names: Vec<&str> = response["results"]
            .as_array()
            .map(|results| {
                results
                    .iter()
                    .filter_map(|listing| listing["name"].as_str())
                    .collect()
            })
            .unwrap_or_default();
        assert_eq!(names, expected, "unexpected results in: {response}");
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }
}
