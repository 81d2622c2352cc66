//! Category filtering for the heat overlay.
//!
//! Labels are compared after [`normalize_label`]. Matching is a two-way
//! substring test so that submission-time and filter-panel vocabularies can
//! drift apart without hiding clusters; a short filter token may therefore
//! match an unrelated longer category.

use serde::Serialize;

use crate::models::ClusterPoint;

/// Filter labels offered when nothing else is configured.
pub const DEFAULT_FILTERS: &[&str] = &[
    "Water Supply",
    "Sanitation",
    "Roads",
    "Streetlights",
    "Electricity",
];

/// Lowercases and strips whitespace and `/`. Underscores and other
/// punctuation are kept.
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '/')
        .flat_map(char::to_lowercase)
        .collect()
}

/// A single toggle in the filter panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryFilter {
    pub label: String,
    pub enabled: bool,
}

/// Ordered set of category toggles. Insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryFilterState {
    filters: Vec<CategoryFilter>,
}

impl CategoryFilterState {
    /// Builds a state with every label enabled. Repeated labels keep their
    /// first position.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = Self::default();
        for label in labels {
            state.insert(label);
        }
        state
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_FILTERS.iter().copied())
    }

    /// Adds an enabled label if it is not already present.
    pub fn insert(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.filters.iter().any(|f| f.label == label) {
            self.filters.push(CategoryFilter {
                label,
                enabled: true,
            });
        }
    }

    /// Flips a label and returns its new state, or `None` if unknown.
    pub fn toggle(&mut self, label: &str) -> Option<bool> {
        let filter = self.filters.iter_mut().find(|f| f.label == label)?;
        filter.enabled = !filter.enabled;
        Some(filter.enabled)
    }

    /// Sets a label explicitly; returns `false` if the label is unknown.
    pub fn set_enabled(&mut self, label: &str, enabled: bool) -> bool {
        match self.filters.iter_mut().find(|f| f.label == label) {
            Some(filter) => {
                filter.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, label: &str) -> Option<bool> {
        self.filters
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryFilter> {
        self.filters.iter()
    }

    fn enabled_normalized(&self) -> Vec<String> {
        self.filters
            .iter()
            .filter(|f| f.enabled)
            .map(|f| normalize_label(&f.label))
            .collect()
    }

    /// True if any category of `point` overlaps any enabled filter.
    pub fn matches(&self, point: &ClusterPoint) -> bool {
        matches_any(&point.categories, &self.enabled_normalized())
    }

    /// Points that pass the filter, in batch order.
    pub fn apply(&self, points: &[ClusterPoint]) -> Vec<ClusterPoint> {
        let enabled = self.enabled_normalized();
        points
            .iter()
            .filter(|p| matches_any(&p.categories, &enabled))
            .cloned()
            .collect()
    }
}

fn matches_any(categories: &[String], enabled: &[String]) -> bool {
    categories.iter().any(|category| {
        let category = normalize_label(category);
        enabled
            .iter()
            .any(|filter| category.contains(filter.as_str()) || filter.contains(category.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClusterColor, Intensity};

    #[test]
    fn test_normalize_strips_whitespace_and_slash() {
        assert_eq!(normalize_label("Water Supply"), "watersupply");
        assert_eq!(normalize_label(" Roads / Potholes\t"), "roadspotholes");
        assert_eq!(normalize_label("water_supply"), "water_supply");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for label in ["Water Supply", "Roads/Footpaths", "water_supply", "  ", "ÉLECTRICITY"] {
            let once = normalize_label(label);
            assert_eq!(normalize_label(&once), once);
        }
    }

    #[test]
    fn test_bidirectional_substring_match() {
        let state = CategoryFilterState::new(["Roads"]);
        assert!(state.matches(&point(&["Roads And Footpaths"])));

        let state = CategoryFilterState::new(["Street Lights Broken"]);
        assert!(state.matches(&point(&["streetlights"])));
    }

    #[test]
    fn test_short_token_false_positive_is_accepted() {
        let state = CategoryFilterState::new(["Water"]);
        assert!(state.matches(&point(&["Wastewater Overflow"])));
    }

    #[test]
    fn test_underscore_label_does_not_match() {
        let state = CategoryFilterState::new(["Water Supply"]);
        assert!(!state.matches(&point(&["water_supply"])));
    }

    #[test]
    fn test_disabled_filter_is_skipped() {
        let mut state = CategoryFilterState::new(["Roads", "Sanitation"]);
        assert_eq!(state.toggle("Roads"), Some(false));

        assert!(!state.matches(&point(&["Roads"])));
        assert!(state.matches(&point(&["Sanitation"])));
        assert_eq!(state.toggle("Unknown"), None);
    }

    #[test]
    fn test_empty_categories_never_pass() {
        let state = CategoryFilterState::with_defaults();
        assert!(!state.matches(&point(&[])));
        assert!(!CategoryFilterState::default().matches(&point(&[])));
    }

    #[test]
    fn test_apply_keeps_batch_order() {
        let state = CategoryFilterState::with_defaults();
        let batch = vec![
            point_with_id("1", &["Roads"]),
            point_with_id("2", &["Noise"]),
            point_with_id("3", &["Sanitation"]),
        ];

        let ids: Vec<_> = state.apply(&batch).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_insertion_order_and_dedup() {
        let state = CategoryFilterState::new(["B", "A", "B"]);
        let labels: Vec<_> = state.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "A"]);
        assert_eq!(state.is_enabled("A"), Some(true));
    }

    fn point(categories: &[&str]) -> ClusterPoint {
        point_with_id("p", categories)
    }

    fn point_with_id(id: &str, categories: &[&str]) -> ClusterPoint {
        ClusterPoint {
            id: id.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            complaint_count: 1,
            priority_score: 1.0,
            intensity: Intensity::Low,
            color: ClusterColor::Green,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            summary: String::new(),
        }
    }
}
