//! Runtime configuration read from the environment.
//!
//! `main` loads a `.env` file first, so every value can live there too.

use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

use crate::filter::DEFAULT_FILTERS;
use crate::models::{Coordinates, Viewport};

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub api_url: String,
    pub api_timeout: Duration,
    pub home: Viewport,
    pub refresh_interval: Duration,
    pub issue_limit: u32,
    pub category_filters: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            api_timeout: Duration::from_millis(30_000),
            home: Viewport::new(Coordinates::new(28.7041, 77.1025), 12.0),
            refresh_interval: Duration::from_secs(30),
            issue_limit: 3,
            category_filters: DEFAULT_FILTERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Unset or blank variables
    /// take their default; set but unparseable ones are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let latitude = parse_or(get("MAP_CENTER_LAT"), "MAP_CENTER_LAT", defaults.home.center.latitude)?;
        let longitude = parse_or(get("MAP_CENTER_LNG"), "MAP_CENTER_LNG", defaults.home.center.longitude)?;
        let zoom = parse_or(get("MAP_ZOOM_LEVEL"), "MAP_ZOOM_LEVEL", defaults.home.zoom)?;
        let timeout_ms = parse_or(
            get("DASHBOARD_API_TIMEOUT_MS"),
            "DASHBOARD_API_TIMEOUT_MS",
            defaults.api_timeout.as_millis() as u64,
        )?;
        let refresh_secs = parse_or(
            get("REFRESH_INTERVAL_SECS"),
            "REFRESH_INTERVAL_SECS",
            defaults.refresh_interval.as_secs(),
        )?;
        if refresh_secs == 0 {
            anyhow::bail!("REFRESH_INTERVAL_SECS must be greater than zero");
        }

        let category_filters = match get("CATEGORY_FILTERS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.category_filters,
        };

        Ok(Self {
            api_url: get("DASHBOARD_API_URL").unwrap_or(defaults.api_url),
            api_timeout: Duration::from_millis(timeout_ms),
            home: Viewport::new(Coordinates::new(latitude, longitude), zoom),
            refresh_interval: Duration::from_secs(refresh_secs),
            issue_limit: parse_or(get("TOP_ISSUES_LIMIT"), "TOP_ISSUES_LIMIT", defaults.issue_limit)?,
            category_filters,
        })
    }
}

fn parse_or<T>(raw: Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{name} has invalid value '{value}'")),
        None => Ok(default),
    }
}
