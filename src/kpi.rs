//! Dashboard KPI tiles
//!
//! One tile per metric: the latest wearable reading, trailing rolling
//! averages, and the latest lab panel markers. Missing data stays `None`
//! so consumers can render a dash instead of a number.

use serde::{Deserialize, Serialize};

use crate::bundle::Dataset;
use crate::metrics::{MetricId, SeriesSource, ALL_METRICS};
use crate::types::WearableReading;

/// A single dashboard tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub metric: MetricId,
    pub label: String,
    pub value: Option<f64>,
}

fn round_dp(value: f64, decimals: u32) -> f64 {
    let f = 10f64.powi(decimals as i32);
    (value * f).round() / f
}

/// Average of the present values in the trailing `n` readings.
fn avg_last(readings: &[WearableReading], field: MetricId, n: usize) -> Option<f64> {
    let start = readings.len().saturating_sub(n);
    let vals: Vec<f64> = readings[start..]
        .iter()
        .filter_map(|r| r.field(field))
        .filter(|v| v.is_finite())
        .collect();
    if vals.is_empty() {
        return None;
    }
    let avg = vals.iter().sum::<f64>() / vals.len() as f64;
    Some(round_dp(avg, field.decimals()))
}

/// Current tile values for all twelve metrics, in dashboard order.
pub fn kpi_snapshot(dataset: &Dataset) -> Vec<Kpi> {
    let last_reading = dataset.wearable_daily.last();
    let latest_panel = dataset.diagnostics.last();

    ALL_METRICS
        .iter()
        .map(|&metric| {
            let value = match metric.source() {
                SeriesSource::Wearable => last_reading.and_then(|r| r.field(metric)),
                SeriesSource::Rolling { field, window } => {
                    avg_last(&dataset.wearable_daily, field, window)
                }
                SeriesSource::Lab | SeriesSource::LabLdl => {
                    latest_panel.and_then(|p| p.field(metric))
                }
            };
            Kpi {
                metric,
                label: metric.label().to_string(),
                value,
            }
        })
        .collect()
}
