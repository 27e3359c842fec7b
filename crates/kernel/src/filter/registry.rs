//! Filter registry: the static set of facet groups and their options.
//!
//! Loaded once from YAML (or the built-in set) and immutable afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Registry load failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read filter registry {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid filter registry: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("duplicate filter group id: {0}")]
    DuplicateGroup(String),
}

/// A selectable option within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: String,
    pub label: String,

    /// Number of listings carrying this option, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl FilterOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            count: None,
        }
    }
}

/// A facet group and its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroupDefinition {
    /// Unique group id; also the compiler field facets in this group target.
    pub id: String,

    pub label: String,

    #[serde(default)]
    pub options: Vec<FilterOption>,

    /// Whether more than one option may be active at once.
    #[serde(default)]
    pub multi_select: bool,
}

impl FilterGroupDefinition {
    pub fn option(&self, option_id: &str) -> Option<&FilterOption> {
        self.options.iter().find(|option| option.id == option_id)
    }
}

#[derive(Deserialize)]
struct RegistryFile {
    groups: Vec<FilterGroupDefinition>,
}

/// Immutable set of filter group definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterRegistry {
    groups: Vec<FilterGroupDefinition>,
}

impl FilterRegistry {
    /// Build a registry, rejecting duplicate group ids.
    pub fn new(groups: Vec<FilterGroupDefinition>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for group in &groups {
            if !seen.insert(group.id.as_str()) {
                return Err(RegistryError::DuplicateGroup(group.id.clone()));
            }
        }
        Ok(Self { groups })
    }

    /// Parse a registry from YAML with a top-level `groups` list.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_yml::from_str(yaml)?;
        Self::new(file.groups)
    }

    /// Load a registry from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_yaml_str(&yaml)?;
        tracing::info!(
            path = %path.display(),
            groups = registry.groups.len(),
            "loaded filter registry"
        );
        Ok(registry)
    }

    /// The built-in listing facets.
    pub fn builtin() -> Self {
        fn group(
            id: &str,
            label: &str,
            multi_select: bool,
            options: &[(&str, &str)],
        ) -> FilterGroupDefinition {
            FilterGroupDefinition {
                id: id.to_string(),
                label: label.to_string(),
                options: options
                    .iter()
                    .map(|(id, label)| FilterOption::new(*id, *label))
                    .collect(),
                multi_select,
            }
        }

        Self {
            groups: vec![
                group(
                    "category",
                    "Category",
                    true,
                    &[
                        ("coworking", "Coworking"),
                        ("cafe", "Cafe"),
                        ("accommodation", "Accommodation"),
                    ],
                ),
                group(
                    "location",
                    "Location",
                    false,
                    &[
                        ("Lisbon", "Lisbon"),
                        ("Porto", "Porto"),
                        ("Canggu", "Canggu"),
                        ("Chiang Mai", "Chiang Mai"),
                        ("Medellín", "Medellín"),
                        ("Mexico City", "Mexico City"),
                    ],
                ),
                group(
                    "ecoTags",
                    "Eco Focus",
                    true,
                    &[
                        ("Solar Powered", "Solar Powered"),
                        ("Zero Waste", "Zero Waste"),
                        ("Plastic Free", "Plastic Free"),
                        ("Local Sourcing", "Local Sourcing"),
                        ("Organic", "Organic"),
                    ],
                ),
                group(
                    "nomadFeatures",
                    "Nomad Features",
                    true,
                    &[
                        ("Fast WiFi", "Fast WiFi"),
                        ("Standing Desks", "Standing Desks"),
                        ("24/7 Access", "24/7 Access"),
                        ("Meeting Rooms", "Meeting Rooms"),
                        ("Phone Booths", "Phone Booths"),
                    ],
                ),
                group(
                    "accommodationType",
                    "Accommodation Type",
                    true,
                    &[
                        ("hostel", "Hostel"),
                        ("guesthouse", "Guesthouse"),
                        ("coliving", "Coliving"),
                        ("apartment", "Apartment"),
                    ],
                ),
                group(
                    "minRating",
                    "Rating",
                    false,
                    &[("3", "3+ stars"), ("4", "4+ stars"), ("4.5", "4.5+ stars")],
                ),
            ],
        }
    }

    pub fn groups(&self) -> &[FilterGroupDefinition] {
        &self.groups
    }

    pub fn group(&self, group_id: &str) -> Option<&FilterGroupDefinition> {
        self.groups.iter().find(|group| group.id == group_id)
    }

    pub fn option(&self, group_id: &str, option_id: &str) -> Option<&FilterOption> {
        self.group(group_id)?.option(option_id)
    }

    /// Unknown groups are single-select.
    pub fn is_multi_select(&self, group_id: &str) -> bool {
        self.group(group_id).is_some_and(|group| group.multi_select)
    }
}
