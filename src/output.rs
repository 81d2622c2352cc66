//! Output formatting and persistence for rendered heat views.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::dashboard::HeatView;
use crate::heat::{WeightedPoint, gradient_color};
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// One CSV row per weighted point.
#[derive(Debug, Serialize)]
pub struct HeatRecord<'a> {
    pub timestamp: DateTime<Utc>,
    pub id: &'a str,
    pub latitude: f64,
    pub longitude: f64,
    pub weight: f64,
    pub color: &'static str,
}

impl<'a> HeatRecord<'a> {
    pub fn from_point(point: &'a WeightedPoint, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            id: &point.id,
            latitude: point.position.latitude,
            longitude: point.position.longitude,
            weight: point.weight,
            color: gradient_color(point.weight),
        }
    }
}

/// Logs a view using Rust's debug pretty-print format.
pub fn print_pretty(view: &HeatView) {
    debug!("{:#?}", view);
}

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends one row per weighted point to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records(path: &str, points: &[WeightedPoint]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = points.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    let now = Utc::now();
    for point in points {
        writer.serialize(HeatRecord::from_point(point, now))?;
    }
    writer.flush()?;

    Ok(())
}
