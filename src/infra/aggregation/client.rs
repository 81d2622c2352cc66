use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use crate::fetch::{BasicClient, HttpClient, fetch_json};
use crate::models::{
    ClusterPoint, HeatmapResponse, StatisticsSnapshot, TopIssue, TopIssuesResponse,
};
use crate::services::dashboard_api::DashboardApi;

/// [`DashboardApi`] over the aggregation service's JSON endpoints.
pub struct AggregationClient<C = BasicClient> {
    base_url: Url,
    http: C,
}

impl<C: HttpClient> AggregationClient<C> {
    pub fn new(base_url: &str, http: C) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid API base URL '{base_url}'"))?;
        // Relative joins keep any path prefix only when the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { base_url, http })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Cannot build URL for {path}"))
    }
}

#[async_trait]
impl<C: HttpClient> DashboardApi for AggregationClient<C> {
    async fn heatmap(&self) -> Result<Vec<ClusterPoint>> {
        let url = self.endpoint("api/dashboard/heatmap")?;
        let response: HeatmapResponse = fetch_json(&self.http, url).await?;
        debug!(points = response.heatmap_points.len(), "Heatmap fetched");
        Ok(response.heatmap_points)
    }

    async fn top_issues(&self, limit: u32) -> Result<Vec<TopIssue>> {
        let mut url = self.endpoint("api/dashboard/top-issues")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        let response: TopIssuesResponse = fetch_json(&self.http, url).await?;
        debug!(issues = response.top_issues.len(), "Top issues fetched");
        Ok(response.top_issues)
    }

    async fn statistics(&self) -> Result<StatisticsSnapshot> {
        let url = self.endpoint("api/dashboard/statistics")?;
        fetch_json(&self.http, url).await
    }
}
