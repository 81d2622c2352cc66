//! Trait for the service that supplies dashboard snapshots.

use anyhow::Result;

use crate::models::{ClusterPoint, StatisticsSnapshot, TopIssue};

/// Abstraction over the upstream aggregation service.
///
/// Each call returns a complete snapshot; callers replace what they hold
/// rather than merging.
#[async_trait::async_trait]
pub trait DashboardApi: Send + Sync {
    /// Current cluster batch for the heat overlay.
    async fn heatmap(&self) -> Result<Vec<ClusterPoint>>;

    /// The `limit` most urgent issues, ascending by rank.
    async fn top_issues(&self, limit: u32) -> Result<Vec<TopIssue>>;

    /// Complaint totals for the statistics panel.
    async fn statistics(&self) -> Result<StatisticsSnapshot>;
}
