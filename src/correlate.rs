//! Maps a ranked issue back to a point on the map.
//!
//! Resolution is tiered and the first tier that yields a point wins:
//!
//! 1. the issue's `cluster_id` names a point in the batch;
//! 2. the issue carries its own coordinates, and a synthetic point is built;
//! 3. the batch is searched for points whose category normalizes equal to
//!    the issue's, preferring higher priority, then higher count, then the
//!    lowest id.
//!
//! The batch passed in is always the unfiltered one.

use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

use crate::filter::normalize_label;
use crate::models::{
    ClusterColor, ClusterPoint, Coordinates, Intensity, IssueLocation, TopIssue, Urgency, Viewport,
};

/// Zoom level used when focusing a single point.
pub const FOCUS_ZOOM: f64 = 15.0;

const PLACEHOLDER_SUMMARY: &str = "Reported issue location";

/// Which tier produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    ClusterId,
    Coordinates,
    Category,
    /// A point clicked directly on the map.
    Direct,
}

/// A point picked for focus plus the viewport to move to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub point: ClusterPoint,
    pub target: Viewport,
    pub tier: MatchTier,
    /// True when the point was built from the issue and is not in the batch.
    pub synthetic: bool,
}

impl Selection {
    fn focus(point: ClusterPoint, tier: MatchTier, synthetic: bool) -> Self {
        let target = Viewport::new(point.coordinates(), FOCUS_ZOOM);
        Self {
            point,
            target,
            tier,
            synthetic,
        }
    }

    /// Selection for a point the operator clicked on the map.
    pub fn from_point(point: ClusterPoint) -> Self {
        Self::focus(point, MatchTier::Direct, false)
    }
}

/// Resolves `issue` against `batch`. `None` means leave everything as is.
pub fn correlate(issue: &TopIssue, batch: &[ClusterPoint]) -> Option<Selection> {
    let selection = match &issue.placement {
        IssueLocation::Cluster {
            cluster_id,
            fallback,
        } => by_cluster_id(cluster_id, batch)
            .or_else(|| fallback.map(|coords| synthesize(issue, coords)))
            .or_else(|| by_category(issue, batch)),
        IssueLocation::Coordinates(coords) => Some(synthesize(issue, *coords)),
        IssueLocation::Unlocated => by_category(issue, batch),
    };

    match &selection {
        Some(s) => debug!(rank = issue.rank, tier = ?s.tier, point_id = %s.point.id, "Issue correlated"),
        None => debug!(rank = issue.rank, category = %issue.category, "Issue has no matching location"),
    }

    selection
}

fn by_cluster_id(cluster_id: &str, batch: &[ClusterPoint]) -> Option<Selection> {
    batch
        .iter()
        .find(|p| p.id == cluster_id)
        .map(|p| Selection::focus(p.clone(), MatchTier::ClusterId, false))
}

fn synthesize(issue: &TopIssue, coords: Coordinates) -> Selection {
    let point = ClusterPoint {
        id: format!("issue-{}", issue.rank),
        latitude: coords.latitude,
        longitude: coords.longitude,
        complaint_count: issue.complaint_count,
        priority_score: issue.priority_score,
        intensity: intensity_for(issue.urgency),
        color: color_for(issue.urgency),
        categories: vec![issue.category.clone()],
        summary: issue
            .location
            .clone()
            .unwrap_or_else(|| PLACEHOLDER_SUMMARY.to_string()),
    };
    Selection::focus(point, MatchTier::Coordinates, true)
}

fn by_category(issue: &TopIssue, batch: &[ClusterPoint]) -> Option<Selection> {
    let wanted = normalize_label(&issue.category);

    batch
        .iter()
        .filter(|p| p.categories.iter().any(|c| normalize_label(c) == wanted))
        .max_by(|a, b| rank_candidates(a, b))
        .map(|p| Selection::focus(p.clone(), MatchTier::Category, false))
}

/// Orders candidates so the preferred one compares greatest: priority, then
/// complaint count, then the lexicographically smallest id. A NaN priority
/// ranks below every real score.
fn rank_candidates(a: &ClusterPoint, b: &ClusterPoint) -> Ordering {
    rank_priority(a)
        .total_cmp(&rank_priority(b))
        .then_with(|| a.complaint_count.cmp(&b.complaint_count))
        .then_with(|| b.id.cmp(&a.id))
}

fn rank_priority(point: &ClusterPoint) -> f64 {
    if point.priority_score.is_nan() {
        f64::NEG_INFINITY
    } else {
        point.priority_score
    }
}

fn intensity_for(urgency: Urgency) -> Intensity {
    match urgency {
        Urgency::Critical => Intensity::Critical,
        Urgency::High => Intensity::High,
        Urgency::Medium => Intensity::Medium,
        Urgency::Low => Intensity::Low,
    }
}

fn color_for(urgency: Urgency) -> ClusterColor {
    match urgency {
        Urgency::Critical => ClusterColor::Red,
        Urgency::High => ClusterColor::Orange,
        Urgency::Medium => ClusterColor::Yellow,
        Urgency::Low => ClusterColor::Green,
    }
}
