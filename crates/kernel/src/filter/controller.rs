//! Filter state controller: active facet selections per group.
//!
//! Multi-select groups hold an ordered set of option ids. Single-select
//! groups (and groups the registry does not know) hold at most one.

use super::registry::FilterRegistry;
use crate::search::types::{BoolOperator, FilterCondition, FilterGroup};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Active option ids per group id.
///
/// Groups keep the order in which they were first touched, which is the
/// order labels and compiled groups come out in. A group cleared by a toggle
/// keeps its slot with an empty selection.
pub type ActiveFilters = IndexMap<String, Vec<String>>;

type ChangeCallback = Box<dyn Fn(&ActiveFilters) -> anyhow::Result<()> + Send + Sync>;

/// A resolved active selection, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveFilterLabel {
    pub group_id: String,
    pub option_id: String,
    pub label: String,
}

/// Tracks which facet options are active.
pub struct FilterStateController {
    registry: Arc<FilterRegistry>,
    active: ActiveFilters,
    active_count: usize,
    on_change: Option<ChangeCallback>,
}

impl fmt::Debug for FilterStateController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterStateController")
            .field("active", &self.active)
            .field("active_count", &self.active_count)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl FilterStateController {
    pub fn new(registry: Arc<FilterRegistry>) -> Self {
        Self {
            registry,
            active: ActiveFilters::new(),
            active_count: 0,
            on_change: None,
        }
    }

    /// Start from existing selections.
    ///
    /// Single-select groups keep only their first option and repeated ids in
    /// multi-select groups collapse.
    pub fn with_initial(registry: Arc<FilterRegistry>, initial: ActiveFilters) -> Self {
        let mut active = ActiveFilters::new();
        for (group_id, options) in initial {
            let mut selected: Vec<String> = Vec::with_capacity(options.len());
            for option in options {
                if !selected.contains(&option) {
                    selected.push(option);
                }
            }
            if !registry.is_multi_select(&group_id) {
                selected.truncate(1);
            }
            active.insert(group_id, selected);
        }

        let mut controller = Self::new(registry);
        controller.active_count = count(&active);
        controller.active = active;
        controller
    }

    /// Register the change callback, invoked with the full map after every
    /// toggle and clear.
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ActiveFilters) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Toggle an option.
    ///
    /// Multi-select: removes the option if active, otherwise appends it.
    /// Single-select: clears the group when the option is its sole
    /// selection, otherwise replaces the selection with it.
    pub fn toggle_filter(&mut self, group_id: &str, option_id: &str) {
        let multi_select = self.registry.is_multi_select(group_id);
        let selected = self.active.entry(group_id.to_string()).or_default();

        if multi_select {
            match selected.iter().position(|id| id == option_id) {
                Some(index) => {
                    selected.remove(index);
                }
                None => selected.push(option_id.to_string()),
            }
        } else if selected.len() == 1 && selected[0] == option_id {
            selected.clear();
        } else {
            *selected = vec![option_id.to_string()];
        }

        self.active_count = count(&self.active);
        self.notify();
    }

    /// Remove every selection. Always notifies, even when nothing was active.
    pub fn clear_filters(&mut self) {
        self.active.clear();
        self.active_count = 0;
        self.notify();
    }

    pub fn active_filters(&self) -> &ActiveFilters {
        &self.active
    }

    /// Active option ids for a group; empty for unknown or empty groups.
    pub fn active_filters_for_group(&self, group_id: &str) -> &[String] {
        self.active.get(group_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_option_active(&self, group_id: &str, option_id: &str) -> bool {
        self.active_filters_for_group(group_id)
            .iter()
            .any(|id| id == option_id)
    }

    /// Labels for every active selection the registry can resolve.
    pub fn active_filter_labels(&self) -> Vec<ActiveFilterLabel> {
        self.active
            .iter()
            .flat_map(|(group_id, options)| {
                options.iter().filter_map(move |option_id| {
                    let option = self.registry.option(group_id, option_id)?;
                    Some(ActiveFilterLabel {
                        group_id: group_id.clone(),
                        option_id: option_id.clone(),
                        label: option.label.clone(),
                    })
                })
            })
            .collect()
    }

    /// Total number of active selections across groups.
    ///
    /// Selections the registry cannot resolve are counted here but have no
    /// entry in [`Self::active_filter_labels`].
    pub fn active_filter_count(&self) -> usize {
        self.active_count
    }

    /// Project the active selections into compiler filter groups.
    ///
    /// Each non-empty facet becomes one OR group whose conditions target the
    /// group id as field with the option ids as values.
    pub fn to_filter_groups(&self) -> Vec<FilterGroup> {
        self.active
            .iter()
            .filter(|(_, options)| !options.is_empty())
            .map(|(group_id, options)| {
                let conditions = options
                    .iter()
                    .map(|option_id| {
                        FilterCondition::new(group_id, serde_json::Value::String(option_id.clone()))
                    })
                    .collect();
                let mut group = FilterGroup::new(BoolOperator::Or, conditions).with_id(group_id);
                group.label = self.registry.group(group_id).map(|g| g.label.clone());
                group
            })
            .collect()
    }

    fn notify(&self) {
        if let Some(callback) = &self.on_change
            && let Err(e) = callback(&self.active)
        {
            warn!(error = %e, "filter change callback failed");
        }
    }
}

fn count(active: &ActiveFilters) -> usize {
    active.values().map(Vec::len).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn controller() -> FilterStateController {
        FilterStateController::new(Arc::new(FilterRegistry::builtin()))
    }

    #[test]
    fn multi_select_double_toggle_is_identity() {
        let mut c = controller();
        c.toggle_filter("ecoTags", "Solar Powered");
        c.toggle_filter("ecoTags", "Zero Waste");
        let before = c.active_filters().clone();

        c.toggle_filter("ecoTags", "Organic");
        c.toggle_filter("ecoTags", "Organic");
        assert_eq!(c.active_filters(), &before);
        assert_eq!(
            c.active_filters_for_group("ecoTags"),
            ["Solar Powered", "Zero Waste"]
        );
    }

    #[test]
    fn single_select_replaces_then_clears() {
        let mut c = controller();
        c.toggle_filter("location", "Lisbon");
        c.toggle_filter("location", "Porto");
        assert_eq!(c.active_filters_for_group("location"), ["Porto"]);

        c.toggle_filter("location", "Porto");
        assert!(c.active_filters_for_group("location").is_empty());
        assert_eq!(c.active_filter_count(), 0);
    }

    #[test]
    fn unknown_group_behaves_as_single_select() {
        let mut c = controller();
        c.toggle_filter("wifi", "fast");
        c.toggle_filter("wifi", "fiber");
        assert_eq!(c.active_filters_for_group("wifi"), ["fiber"]);
        assert_eq!(c.active_filter_count(), 1);
        // Not in the registry, so there is no label to show.
        assert!(c.active_filter_labels().is_empty());
    }

    #[test]
    fn single_select_never_holds_more_than_one() {
        let mut c = controller();
        for option in ["Lisbon", "Porto", "Porto", "Canggu", "Lisbon", "Lisbon"] {
            c.toggle_filter("location", option);
            assert!(c.active_filters_for_group("location").len() <= 1);
        }
    }

    #[test]
    fn count_matches_labels_for_registry_options() {
        let mut c = controller();
        let toggles = [
            ("category", "cafe"),
            ("category", "coworking"),
            ("location", "Lisbon"),
            ("ecoTags", "Organic"),
            ("category", "cafe"),
            ("location", "Porto"),
            ("minRating", "4"),
        ];
        for (group, option) in toggles {
            c.toggle_filter(group, option);
            assert_eq!(c.active_filter_count(), c.active_filter_labels().len());
        }
        c.clear_filters();
        assert_eq!(c.active_filter_count(), 0);
        assert!(c.active_filter_labels().is_empty());
    }

    #[test]
    fn groups_keep_first_touch_order() {
        let mut c = controller();
        c.toggle_filter("location", "Porto");
        c.toggle_filter("category", "cafe");
        c.toggle_filter("ecoTags", "Organic");
        c.toggle_filter("location", "Lisbon");

        let groups: Vec<_> = c
            .active_filter_labels()
            .into_iter()
            .map(|label| label.group_id)
            .collect();
        assert_eq!(groups, ["location", "category", "ecoTags"]);

        let compiled: Vec<_> = c
            .to_filter_groups()
            .into_iter()
            .filter_map(|group| group.id)
            .collect();
        assert_eq!(compiled, ["location", "category", "ecoTags"]);
    }

    #[test]
    fn is_option_active_checks_membership() {
        let mut c = controller();
        c.toggle_filter("category", "cafe");
        assert!(c.is_option_active("category", "cafe"));
        assert!(!c.is_option_active("category", "coworking"));
        assert!(!c.is_option_active("nope", "cafe"));
    }

    #[test]
    fn callback_sees_updated_state_and_clear_always_notifies() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut c = controller().on_change(move |active| {
            sink.lock().push(active.clone());
            Ok(())
        });

        c.toggle_filter("category", "cafe");
        c.clear_filters();
        c.clear_filters();

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0]["category"], ["cafe"]);
        assert!(seen[1].is_empty());
        assert!(seen[2].is_empty());
    }

    #[test]
    fn callback_failure_does_not_corrupt_state() {
        let mut c = controller().on_change(|_| anyhow::bail!("listener went away"));
        c.toggle_filter("category", "cafe");
        assert!(c.is_option_active("category", "cafe"));
        assert_eq!(c.active_filter_count(), 1);
    }

    #[test]
    fn stale_selections_are_dropped_from_labels() {
        let mut initial = ActiveFilters::new();
        initial.insert(
            "category".to_string(),
            vec!["cafe".to_string(), "bar".to_string()],
        );
        let c = FilterStateController::with_initial(Arc::new(FilterRegistry::builtin()), initial);

        let labels = c.active_filter_labels();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].label, "Cafe");
    }

    #[test]
    fn initial_single_select_groups_are_normalized() {
        let mut initial = ActiveFilters::new();
        initial.insert(
            "location".to_string(),
            vec!["Lisbon".to_string(), "Porto".to_string()],
        );
        initial.insert(
            "ecoTags".to_string(),
            vec!["Organic".to_string(), "Organic".to_string()],
        );
        let c = FilterStateController::with_initial(Arc::new(FilterRegistry::builtin()), initial);

        assert_eq!(c.active_filters_for_group("location"), ["Lisbon"]);
        assert_eq!(c.active_filters_for_group("ecoTags"), ["Organic"]);
        assert_eq!(c.active_filter_count(), 2);
    }

    #[test]
    fn to_filter_groups_builds_one_or_group_per_facet() {
        let mut c = controller();
        c.toggle_filter("ecoTags", "Solar Powered");
        c.toggle_filter("ecoTags", "Zero Waste");
        c.toggle_filter("minRating", "4.5");
        c.toggle_filter("location", "Lisbon");
        c.toggle_filter("location", "Lisbon");

        let groups = c.to_filter_groups();
        assert_eq!(groups.len(), 2);

        assert_eq!(groups[0].id.as_deref(), Some("ecoTags"));
        assert_eq!(groups[0].operator, BoolOperator::Or);
        assert_eq!(
            groups[0].conditions,
            vec![
                FilterCondition::EcoTag("Solar Powered".to_string()),
                FilterCondition::EcoTag("Zero Waste".to_string()),
            ]
        );
        assert_eq!(groups[1].conditions, vec![FilterCondition::MinRating(4.5)]);
        assert_eq!(groups[1].label.as_deref(), Some("Rating"));
    }
}
