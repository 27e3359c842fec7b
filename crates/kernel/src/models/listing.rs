//! Listing model: the row type returned by every data store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Nightly or monthly price band for a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// A directory listing (coworking space, cafe or accommodation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Display name.
    pub name: String,

    /// URL slug.
    #[serde(default)]
    pub slug: String,

    /// One-line description shown on result cards.
    #[serde(default)]
    pub description_short: Option<String>,

    /// Listing category id (e.g. `coworking`, `cafe`).
    pub category: String,

    /// Name of the city the listing belongs to.
    #[serde(default)]
    pub city: Option<String>,

    /// Names of the eco-focus tags attached to the listing.
    #[serde(default)]
    pub eco_tags: Vec<String>,

    /// Digital-nomad amenities.
    #[serde(default)]
    pub nomad_features: Vec<String>,

    #[serde(default)]
    pub rating: Option<f64>,

    #[serde(default)]
    pub price_range: Option<PriceRange>,

    #[serde(default)]
    pub sustainability_score: Option<f64>,

    #[serde(default)]
    pub accommodation_types: Vec<String>,

    #[serde(default)]
    pub eco_certification: Option<String>,

    /// Date the listing details were last confirmed.
    #[serde(default)]
    pub last_verified_date: Option<NaiveDate>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_camel_case_listing() {
        let listing: Listing = serde_json::from_value(serde_json::json!({
            "id": "0190a1b2-0000-7000-8000-000000000001",
            "name": "Hub Lisboa",
            "category": "coworking",
            "descriptionShort": "Rooftop desks",
            "priceRange": {"min": 10.0, "max": 25.0}
        }))
        .unwrap();

        assert_eq!(listing.name, "Hub Lisboa");
        assert_eq!(listing.description_short.as_deref(), Some("Rooftop desks"));
        assert!(listing.eco_tags.is_empty());
        assert_eq!(listing.price_range.unwrap().max, 25.0);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let listing = Listing {
            id: Uuid::nil(),
            name: "Cafe".to_string(),
            slug: "cafe".to_string(),
            description_short: None,
            category: "cafe".to_string(),
            city: Some("Porto".to_string()),
            eco_tags: vec![],
            nomad_features: vec!["Fast WiFi".to_string()],
            rating: Some(4.5),
            price_range: None,
            sustainability_score: None,
            accommodation_types: vec![],
            eco_certification: None,
            last_verified_date: None,
        };
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["nomadFeatures"][0], "Fast WiFi");
        assert!(json.get("nomad_features").is_none());
    }
}
