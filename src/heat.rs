//! Heat-overlay weighting.
//!
//! Converts a batch of [`ClusterPoint`]s into per-point intensities in
//! `[0, 1]`. Density dominates; priority adds secondary emphasis so that a
//! lone high-priority report does not outshine a dense routine cluster.

use serde::Serialize;

use crate::models::{ClusterPoint, Coordinates};

/// Share of the weight taken by relative complaint density.
pub const DENSITY_WEIGHT: f64 = 0.7;
/// Share of the weight taken by the priority score.
pub const PRIORITY_WEIGHT: f64 = 0.3;
/// Upper bound of the upstream priority scale.
pub const PRIORITY_SCALE: f64 = 10.0;

/// Colour stops handed to the heat layer, ascending by weight.
static GRADIENT: &[(f64, &str)] = &[
    (0.0, "#0a3b69"),
    (0.2, "#2563eb"),
    (0.4, "#22c55e"),
    (0.7, "#f59e0b"),
    (1.0, "#ef4444"),
];

/// A cluster paired with the weight the heat layer should paint it with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedPoint {
    pub id: String,
    pub position: Coordinates,
    pub weight: f64,
}

/// Rendering options for the heat layer.
#[derive(Debug, Clone, Serialize)]
pub struct HeatLayerOptions {
    pub radius: u32,
    pub blur: u32,
    pub max_zoom: u32,
    pub gradient: Vec<(f64, String)>,
}

impl Default for HeatLayerOptions {
    fn default() -> Self {
        Self {
            radius: 28,
            blur: 18,
            max_zoom: 17,
            gradient: GRADIENT.iter().map(|(s, c)| (*s, c.to_string())).collect(),
        }
    }
}

/// Largest complaint count in the batch, floored at 1 so an empty or
/// all-zero batch never divides by zero.
pub fn max_count(points: &[ClusterPoint]) -> u32 {
    points
        .iter()
        .map(|p| p.complaint_count)
        .max()
        .unwrap_or(0)
        .max(1)
}

/// Weight of a single point given the batch maximum.
pub fn heat_weight(point: &ClusterPoint, max_count: u32) -> f64 {
    let density = point.complaint_count as f64 / max_count.max(1) as f64;
    // NaN priority falls to the lower bound.
    let priority = (point.priority_score / PRIORITY_SCALE).clamp(0.0, 1.0);
    let priority = if priority.is_nan() { 0.0 } else { priority };

    (density * DENSITY_WEIGHT + priority * PRIORITY_WEIGHT).min(1.0)
}

/// Weights for every point of the batch, in batch order.
pub fn heat_weights(points: &[ClusterPoint]) -> Vec<WeightedPoint> {
    let max = max_count(points);

    points
        .iter()
        .map(|p| WeightedPoint {
            id: p.id.clone(),
            position: p.coordinates(),
            weight: heat_weight(p, max),
        })
        .collect()
}

/// Gradient colour of the highest stop at or below `weight`.
pub fn gradient_color(weight: f64) -> &'static str {
    GRADIENT
        .iter()
        .rev()
        .find(|(stop, _)| weight >= *stop)
        .map(|(_, color)| *color)
        .unwrap_or(GRADIENT[0].1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClusterColor, Intensity};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_density_dominates_priority() {
        let batch = vec![point("A", 10, 9.0), point("B", 100, 1.0)];
        let weights = heat_weights(&batch);

        assert!(approx(weights[0].weight, 0.34));
        assert!(approx(weights[1].weight, 0.73));
    }

    #[test]
    fn test_weight_never_exceeds_one() {
        let batch = vec![point("A", 50, 10.0), point("B", 50, 25.0)];
        for w in heat_weights(&batch) {
            assert!(w.weight <= 1.0);
            assert!(w.weight >= 0.0);
        }
    }

    #[test]
    fn test_negative_priority_clamped_to_zero() {
        let batch = vec![point("A", 0, -4.0)];
        assert_eq!(heat_weights(&batch)[0].weight, 0.0);
    }

    #[test]
    fn test_single_zero_count_uses_priority_only() {
        let batch = vec![point("A", 0, 5.0)];
        let weights = heat_weights(&batch);

        assert!(approx(weights[0].weight, 0.15));
    }

    #[test]
    fn test_empty_batch() {
        assert!(heat_weights(&[]).is_empty());
        assert_eq!(max_count(&[]), 1);
    }

    #[test]
    fn test_monotonic_in_count() {
        let others = point("B", 80, 3.0);
        let mut last = -1.0;
        for count in [0, 10, 40, 80, 120, 500] {
            let batch = vec![point("A", count, 4.0), others.clone()];
            let w = heat_weights(&batch)[0].weight;
            assert!(w >= last, "count {count} gave {w} < {last}");
            last = w;
        }
    }

    #[test]
    fn test_monotonic_in_priority() {
        let mut last = -1.0;
        for priority in [0.0, 2.5, 5.0, 7.5, 10.0, 12.0] {
            let w = heat_weight(&point("A", 10, priority), 20);
            assert!(w >= last);
            last = w;
        }
    }

    #[test]
    fn test_gradient_color_stops() {
        assert_eq!(gradient_color(0.0), "#0a3b69");
        assert_eq!(gradient_color(0.39), "#2563eb");
        assert_eq!(gradient_color(0.7), "#f59e0b");
        assert_eq!(gradient_color(1.0), "#ef4444");
        assert_eq!(gradient_color(-0.5), "#0a3b69");
    }

    #[test]
    fn test_default_layer_options() {
        let opts = HeatLayerOptions::default();
        assert_eq!(opts.radius, 28);
        assert_eq!(opts.gradient.len(), 5);
    }

    fn point(id: &str, count: u32, priority: f64) -> ClusterPoint {
        ClusterPoint {
            id: id.to_string(),
            latitude: 28.7,
            longitude: 77.1,
            complaint_count: count,
            priority_score: priority,
            intensity: Intensity::Low,
            color: ClusterColor::Green,
            categories: vec!["Roads".to_string()],
            summary: String::new(),
        }
    }
}
