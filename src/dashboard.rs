//! Event-driven dashboard state.
//!
//! All derived data is recomputed explicitly when a named event arrives:
//! a new cluster snapshot or a filter toggle re-filters and re-weights the
//! batch, an issue click runs the correlator against the unfiltered batch,
//! and the viewport controller turns the result into a camera move.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::correlate::{Selection, correlate};
use crate::filter::CategoryFilterState;
use crate::heat::{WeightedPoint, heat_weights};
use crate::models::{ClusterPoint, Coordinates, StatisticsSnapshot, TopIssue, Viewport};
use crate::refresh::{SnapshotKind, SnapshotPayload, SnapshotSlot};
use crate::viewport::{CameraTransition, ViewportController, ViewportState};

/// Inputs to the dashboard, from the pollers and from the operator.
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    SnapshotArrived { seq: u64, payload: SnapshotPayload },
    SnapshotFailed { kind: SnapshotKind, seq: u64, message: String },
    FilterToggled(String),
    IssueClicked { rank: u32 },
    PointClicked { id: String },
    SelectionCleared,
    TransitionFinished { generation: u64 },
    GeolocationResolved(Option<Coordinates>),
}

/// What the renderer has to do after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    Nothing,
    Redraw,
    Focus(CameraTransition),
    Reset(Viewport),
}

/// Non-blocking notice that a snapshot could not be refreshed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub kind: SnapshotKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Everything the rendering layer needs for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct HeatView {
    /// Clusters passing the category filters, in batch order.
    pub visible: Vec<ClusterPoint>,
    /// Heat weight of each visible cluster, index-aligned with `visible`.
    pub points: Vec<WeightedPoint>,
    pub selection: Option<Selection>,
    pub viewport: Viewport,
    pub state: ViewportState,
    pub advisories: Vec<Advisory>,
}

pub struct Dashboard {
    clusters: SnapshotSlot<Vec<ClusterPoint>>,
    issues: SnapshotSlot<Vec<TopIssue>>,
    statistics: SnapshotSlot<StatisticsSnapshot>,
    filters: CategoryFilterState,
    viewport: ViewportController,
    advisories: BTreeMap<SnapshotKind, Advisory>,
    visible: Vec<ClusterPoint>,
    weighted: Vec<WeightedPoint>,
}

impl Dashboard {
    pub fn new(filters: CategoryFilterState, viewport: ViewportController) -> Self {
        Self {
            clusters: SnapshotSlot::default(),
            issues: SnapshotSlot::default(),
            statistics: SnapshotSlot::default(),
            filters,
            viewport,
            advisories: BTreeMap::new(),
            visible: Vec::new(),
            weighted: Vec::new(),
        }
    }

    pub fn handle(&mut self, event: DashboardEvent, now: Instant) -> Reaction {
        match event {
            DashboardEvent::SnapshotArrived { seq, payload } => self.apply_snapshot(seq, payload),
            DashboardEvent::SnapshotFailed { kind, seq, message } => {
                if self.applied_seq(kind).is_some_and(|applied| seq <= applied) {
                    debug!(%kind, seq, error = %message, "Ignoring failure older than the data on screen");
                    return Reaction::Nothing;
                }
                warn!(%kind, seq, error = %message, "Snapshot refresh failed; keeping last good data");
                self.advisories.insert(
                    kind,
                    Advisory {
                        kind,
                        message,
                        at: Utc::now(),
                    },
                );
                Reaction::Redraw
            }
            DashboardEvent::FilterToggled(label) => match self.filters.toggle(&label) {
                Some(enabled) => {
                    info!(label = %label, enabled, "Category filter toggled");
                    self.recompute();
                    Reaction::Redraw
                }
                None => {
                    debug!(label = %label, "Toggle for unknown category ignored");
                    Reaction::Nothing
                }
            },
            DashboardEvent::IssueClicked { rank } => self.focus_issue(rank, now),
            DashboardEvent::PointClicked { id } => {
                let Some(point) = self.clusters.get().iter().find(|p| p.id == id) else {
                    debug!(point_id = %id, "Click on unknown point ignored");
                    return Reaction::Nothing;
                };
                let transition = self.viewport.select(Selection::from_point(point.clone()), now);
                Reaction::Focus(transition.clone())
            }
            DashboardEvent::SelectionCleared => Reaction::Reset(self.viewport.clear()),
            DashboardEvent::TransitionFinished { generation } => {
                if self.viewport.complete(generation) {
                    Reaction::Redraw
                } else {
                    Reaction::Nothing
                }
            }
            DashboardEvent::GeolocationResolved(position) => {
                if self.viewport.seed_geolocation(position) {
                    Reaction::Reset(self.viewport.viewport_at(now))
                } else {
                    Reaction::Nothing
                }
            }
        }
    }

    fn apply_snapshot(&mut self, seq: u64, payload: SnapshotPayload) -> Reaction {
        let kind = payload.kind();
        let applied = match payload {
            SnapshotPayload::Clusters(points) => {
                let count = points.len();
                let applied = self.clusters.apply(seq, points);
                if applied {
                    self.recompute();
                    info!(seq, cluster_count = count, visible = self.weighted.len(), "Cluster snapshot applied");
                }
                applied
            }
            SnapshotPayload::Issues(mut issues) => {
                issues.sort_by_key(|i| i.rank);
                let count = issues.len();
                let applied = self.issues.apply(seq, issues);
                if applied {
                    info!(seq, issue_count = count, "Issue snapshot applied");
                }
                applied
            }
            SnapshotPayload::Statistics(stats) => {
                let total = stats.total_complaints;
                let applied = self.statistics.apply(seq, stats);
                if applied {
                    info!(seq, total_complaints = total, "Statistics snapshot applied");
                }
                applied
            }
        };

        if !applied {
            debug!(%kind, seq, "Dropping out-of-order snapshot");
            return Reaction::Nothing;
        }
        self.advisories.remove(&kind);
        Reaction::Redraw
    }

    fn applied_seq(&self, kind: SnapshotKind) -> Option<u64> {
        match kind {
            SnapshotKind::Clusters => self.clusters.applied_seq(),
            SnapshotKind::Issues => self.issues.applied_seq(),
            SnapshotKind::Statistics => self.statistics.applied_seq(),
        }
    }

    fn focus_issue(&mut self, rank: u32, now: Instant) -> Reaction {
        let Some(issue) = self.issues.get().iter().find(|i| i.rank == rank) else {
            debug!(rank, "Click on unknown issue rank ignored");
            return Reaction::Nothing;
        };

        match correlate(issue, self.clusters.get()) {
            Some(selection) => Reaction::Focus(self.viewport.select(selection, now).clone()),
            None => {
                info!(rank, category = %issue.category, "No map location for issue");
                Reaction::Nothing
            }
        }
    }

    fn recompute(&mut self) {
        self.visible = self.filters.apply(self.clusters.get());
        self.weighted = heat_weights(&self.visible);
    }

    /// Completes the running camera transition once its time is up.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.viewport.advance(now)
    }

    pub fn view(&self, now: Instant) -> HeatView {
        HeatView {
            visible: self.visible.clone(),
            points: self.weighted.clone(),
            selection: self.viewport.selection().cloned(),
            viewport: self.viewport.viewport_at(now),
            state: self.viewport.state(),
            advisories: self.advisories.values().cloned().collect(),
        }
    }

    pub fn visible_clusters(&self) -> &[ClusterPoint] {
        &self.visible
    }

    pub fn weighted_points(&self) -> &[WeightedPoint] {
        &self.weighted
    }

    pub fn clusters(&self) -> &[ClusterPoint] {
        self.clusters.get()
    }

    pub fn issues(&self) -> &[TopIssue] {
        self.issues.get()
    }

    pub fn statistics(&self) -> &StatisticsSnapshot {
        self.statistics.get()
    }

    pub fn filters(&self) -> &CategoryFilterState {
        &self.filters
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn advisories(&self) -> impl Iterator<Item = &Advisory> {
        self.advisories.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClusterColor, Intensity, IssueLocation, Urgency};

    #[test]
    fn test_cluster_snapshot_filters_and_weights() {
        let mut dash = dashboard();
        let now = Instant::now();

        let reaction = dash.handle(clusters(1, vec![point("1", &["Roads"], 10), point("2", &["Noise"], 5)]), now);

        assert_eq!(reaction, Reaction::Redraw);
        assert_eq!(dash.clusters().len(), 2);
        let ids: Vec<_> = dash.weighted_points().iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);

        let view = dash.view(now);
        assert_eq!(view.visible.len(), view.points.len());
        assert_eq!(view.visible[0].id, "1");
        assert_eq!(view.visible[0].color, ClusterColor::Yellow);
        assert_eq!(view.visible[0].intensity, Intensity::Medium);
        assert_eq!(view.visible[0].categories, vec!["Roads".to_string()]);
    }

    #[test]
    fn test_filter_toggle_recomputes() {
        let mut dash = dashboard();
        let now = Instant::now();
        dash.handle(clusters(1, vec![point("1", &["Roads"], 10), point("2", &["Sanitation"], 5)]), now);

        dash.handle(DashboardEvent::FilterToggled("Roads".to_string()), now);
        let ids: Vec<_> = dash.weighted_points().iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["2"]);
        // Renormalised against the visible batch only.
        assert!((dash.weighted_points()[0].weight - 0.7 - 0.15).abs() < 1e-9);

        assert_eq!(
            dash.handle(DashboardEvent::FilterToggled("Parks".to_string()), now),
            Reaction::Nothing
        );
    }

    #[test]
    fn test_stale_snapshot_is_dropped() {
        let mut dash = dashboard();
        let now = Instant::now();
        dash.handle(clusters(2, vec![point("new", &["Roads"], 1)]), now);

        let reaction = dash.handle(clusters(1, vec![point("old", &["Roads"], 1)]), now);
        assert_eq!(reaction, Reaction::Nothing);
        assert_eq!(dash.clusters()[0].id, "new");
    }

    #[test]
    fn test_failure_keeps_last_good_and_advises() {
        let mut dash = dashboard();
        let now = Instant::now();
        dash.handle(clusters(1, vec![point("1", &["Roads"], 1)]), now);

        dash.handle(
            DashboardEvent::SnapshotFailed {
                kind: SnapshotKind::Clusters,
                seq: 2,
                message: "connection refused".to_string(),
            },
            now,
        );
        assert_eq!(dash.clusters().len(), 1);
        assert_eq!(dash.advisories().count(), 1);

        dash.handle(clusters(3, vec![]), now);
        assert_eq!(dash.advisories().count(), 0);
        assert!(dash.clusters().is_empty());
    }

    #[test]
    fn test_late_failure_after_newer_success_is_ignored() {
        let mut dash = dashboard();
        let now = Instant::now();
        dash.handle(clusters(5, vec![point("1", &["Roads"], 1)]), now);

        let reaction = dash.handle(
            DashboardEvent::SnapshotFailed {
                kind: SnapshotKind::Clusters,
                seq: 4,
                message: "timed out".to_string(),
            },
            now,
        );
        assert_eq!(reaction, Reaction::Nothing);
        assert_eq!(dash.advisories().count(), 0);

        // A failure for a different kind is unaffected.
        dash.handle(
            DashboardEvent::SnapshotFailed {
                kind: SnapshotKind::Issues,
                seq: 1,
                message: "timed out".to_string(),
            },
            now,
        );
        assert_eq!(dash.advisories().count(), 1);
    }

    #[test]
    fn test_issue_click_correlates_against_unfiltered_batch() {
        let mut dash = dashboard();
        let now = Instant::now();
        dash.handle(clusters(1, vec![point("hidden", &["Noise"], 3)]), now);
        dash.handle(issues(1, vec![issue(1, "Noise")]), now);
        assert!(dash.weighted_points().is_empty());

        let reaction = dash.handle(DashboardEvent::IssueClicked { rank: 1 }, now);
        let Reaction::Focus(transition) = reaction else {
            panic!("expected focus");
        };
        assert_eq!(dash.viewport().state(), ViewportState::Focusing);
        assert_eq!(dash.viewport().selection().unwrap().point.id, "hidden");

        dash.handle(DashboardEvent::TransitionFinished { generation: transition.generation }, now);
        assert_eq!(dash.viewport().state(), ViewportState::Settled);
    }

    #[test]
    fn test_issue_without_match_leaves_selection() {
        let mut dash = dashboard();
        let now = Instant::now();
        dash.handle(clusters(1, vec![point("1", &["Roads"], 3)]), now);
        dash.handle(issues(1, vec![issue(1, "Roads"), issue(2, "Parks")]), now);

        dash.handle(DashboardEvent::IssueClicked { rank: 1 }, now);
        let before = dash.view(now);

        let reaction = dash.handle(DashboardEvent::IssueClicked { rank: 2 }, now);
        assert_eq!(reaction, Reaction::Nothing);
        let after = dash.view(now);
        assert_eq!(before.selection, after.selection);
        assert_eq!(before.viewport, after.viewport);
        assert_eq!(
            dash.handle(DashboardEvent::IssueClicked { rank: 9 }, now),
            Reaction::Nothing
        );
    }

    #[test]
    fn test_issues_sorted_by_rank() {
        let mut dash = dashboard();
        dash.handle(issues(1, vec![issue(3, "A"), issue(1, "B"), issue(2, "C")]), Instant::now());
        let ranks: Vec<_> = dash.issues().iter().map(|i| i.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_point_click_and_clear() {
        let mut dash = dashboard();
        let now = Instant::now();
        dash.handle(clusters(1, vec![point("1", &["Roads"], 3)]), now);

        assert!(matches!(
            dash.handle(DashboardEvent::PointClicked { id: "1".to_string() }, now),
            Reaction::Focus(_)
        ));
        let reaction = dash.handle(DashboardEvent::SelectionCleared, now);
        assert_eq!(reaction, Reaction::Reset(home()));
        assert!(dash.view(now).selection.is_none());
    }

    #[test]
    fn test_geolocation_ignored_while_focused() {
        let mut dash = dashboard();
        let now = Instant::now();
        dash.handle(clusters(1, vec![point("1", &["Roads"], 3)]), now);
        dash.handle(DashboardEvent::PointClicked { id: "1".to_string() }, now);

        let reaction = dash.handle(
            DashboardEvent::GeolocationResolved(Some(Coordinates::new(0.0, 0.0))),
            now,
        );
        assert_eq!(reaction, Reaction::Nothing);
    }

    fn home() -> Viewport {
        Viewport::new(Coordinates::new(28.7041, 77.1025), 12.0)
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(
            CategoryFilterState::with_defaults(),
            ViewportController::new(home()),
        )
    }

    fn clusters(seq: u64, points: Vec<ClusterPoint>) -> DashboardEvent {
        DashboardEvent::SnapshotArrived {
            seq,
            payload: SnapshotPayload::Clusters(points),
        }
    }

    fn issues(seq: u64, issues: Vec<TopIssue>) -> DashboardEvent {
        DashboardEvent::SnapshotArrived {
            seq,
            payload: SnapshotPayload::Issues(issues),
        }
    }

    fn issue(rank: u32, category: &str) -> TopIssue {
        TopIssue {
            rank,
            category: category.to_string(),
            location: None,
            complaint_count: 1,
            priority_score: 5.0,
            urgency: Urgency::High,
            placement: IssueLocation::Unlocated,
        }
    }

    fn point(id: &str, categories: &[&str], count: u32) -> ClusterPoint {
        ClusterPoint {
            id: id.to_string(),
            latitude: 28.6,
            longitude: 77.2,
            complaint_count: count,
            priority_score: 5.0,
            intensity: Intensity::Medium,
            color: ClusterColor::Yellow,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            summary: String::new(),
        }
    }
}
