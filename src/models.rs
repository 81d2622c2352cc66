//! Data model shared by every dashboard component.
//!
//! Wire records from the aggregation service are decoded here. Loosely typed
//! upstream fields (free-text tokens, optional coordinates) are folded into
//! closed Rust types at the decoding boundary so the rest of the crate can
//! match on them exhaustively.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A point on the map, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds coordinates only when both halves are present and finite.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Some(Self::new(lat, lng))
            }
            _ => None,
        }
    }
}

/// Camera center and zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Coordinates,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(center: Coordinates, zoom: f64) -> Self {
        Self { center, zoom }
    }
}

/// Severity label attached to a cluster by the aggregation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    Warning,
    High,
    Critical,
    Unknown,
}

impl From<String> for Intensity {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "low" => Intensity::Low,
            "medium" => Intensity::Medium,
            "warning" => Intensity::Warning,
            "high" => Intensity::High,
            "critical" => Intensity::Critical,
            _ => Intensity::Unknown,
        }
    }
}

/// Colour token used by the renderer for markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum ClusterColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Other,
}

impl From<String> for ClusterColor {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "red" => ClusterColor::Red,
            "orange" => ClusterColor::Orange,
            "yellow" => ClusterColor::Yellow,
            "green" => ClusterColor::Green,
            "blue" => ClusterColor::Blue,
            _ => ClusterColor::Other,
        }
    }
}

/// Urgency of a ranked issue.
///
/// Unrecognised tokens decode as [`Urgency::Low`], matching how the issue
/// list falls back when styling an unknown badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl From<String> for Urgency {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "critical" => Urgency::Critical,
            "high" => Urgency::High,
            "medium" => Urgency::Medium,
            _ => Urgency::Low,
        }
    }
}

impl Urgency {
    /// Derives urgency from a 0–10 priority score.
    ///
    /// | Score  | Urgency  |
    /// |--------|----------|
    /// | >= 8   | Critical |
    /// | >= 5   | High     |
    /// | < 5    | Medium   |
    pub fn from_priority(score: f64) -> Self {
        match score {
            s if s >= 8.0 => Urgency::Critical,
            s if s >= 5.0 => Urgency::High,
            _ => Urgency::Medium,
        }
    }
}

/// A pre-aggregated spatial group of complaints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterPoint {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub complaint_count: u32,
    pub priority_score: f64,
    pub intensity: Intensity,
    pub color: ClusterColor,
    // A point without categories still decodes; the filter rejects it.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

impl ClusterPoint {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Where a ranked issue can be placed on the map.
///
/// The three cases drive the correlator's tiers directly. An issue carrying
/// both a cluster reference and coordinates keeps the coordinates as the
/// fallback for a stale reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueLocation {
    Cluster {
        cluster_id: String,
        fallback: Option<Coordinates>,
    },
    Coordinates(Coordinates),
    Unlocated,
}

/// A ranked actionable item from the issue list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TopIssueWire")]
pub struct TopIssue {
    pub rank: u32,
    pub category: String,
    pub location: Option<String>,
    pub complaint_count: u32,
    pub priority_score: f64,
    pub urgency: Urgency,
    pub placement: IssueLocation,
}

#[derive(Deserialize)]
struct TopIssueWire {
    rank: u32,
    category: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    complaint_count: u32,
    #[serde(default)]
    priority_score: f64,
    #[serde(default)]
    urgency: Option<Urgency>,
    #[serde(default)]
    cluster_id: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

impl From<TopIssueWire> for TopIssue {
    fn from(wire: TopIssueWire) -> Self {
        let coordinates = Coordinates::from_parts(wire.latitude, wire.longitude);
        let placement = match (wire.cluster_id.filter(|id| !id.is_empty()), coordinates) {
            (Some(cluster_id), fallback) => IssueLocation::Cluster {
                cluster_id,
                fallback,
            },
            (None, Some(coords)) => IssueLocation::Coordinates(coords),
            (None, None) => IssueLocation::Unlocated,
        };

        TopIssue {
            rank: wire.rank,
            category: wire.category,
            location: wire.location.filter(|l| !l.trim().is_empty()),
            complaint_count: wire.complaint_count,
            priority_score: wire.priority_score,
            urgency: wire
                .urgency
                .unwrap_or_else(|| Urgency::from_priority(wire.priority_score)),
            placement,
        }
    }
}

/// Totals shown in the statistics panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub total_complaints: u64,
    #[serde(default)]
    pub by_category: HashMap<String, u64>,
}

/// One row of the per-category breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub count: u64,
    pub percent: f64,
}

impl StatisticsSnapshot {
    pub fn pct(part: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Categories by descending count; the share is relative to the sum of
    /// the category counts rather than `total_complaints`.
    pub fn category_breakdown(&self) -> Vec<CategoryShare> {
        let total: u64 = self.by_category.values().sum();
        let mut rows: Vec<CategoryShare> = self
            .by_category
            .iter()
            .map(|(category, &count)| CategoryShare {
                category: category.clone(),
                count,
                percent: Self::pct(count, total),
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        rows
    }
}

#[derive(Deserialize)]
pub(crate) struct HeatmapResponse {
    #[serde(default)]
    pub(crate) heatmap_points: Vec<ClusterPoint>,
}

#[derive(Deserialize)]
pub(crate) struct TopIssuesResponse {
    #[serde(default)]
    pub(crate) top_issues: Vec<TopIssue>,
}
