//! Time-series derivation
//!
//! Builds one aligned daily series per metric from three heterogeneous
//! sources: direct wearable reads, rolling windows over wearable reads,
//! and sparse lab draws interpolated to a daily grid. Every series spans
//! the wearable readings' date range so the chart layer can plot metrics
//! jointly; a day with no derivable value is `None`, never omitted and
//! never zero.

use std::collections::{BTreeMap, VecDeque};

use chrono::{Datelike, NaiveDate};

use crate::metrics::{MetricId, SeriesSource};
use crate::types::{DiagnosticPanel, MetricSeriesPoint, WearableReading};

/// Round to the metric's display precision.
fn round_dp(value: f64, decimals: u32) -> f64 {
    let f = 10f64.powi(decimals as i32);
    (value * f).round() / f
}

/// Deterministic perturbation applied to interpolated lab values so the
/// chart does not read as a ruler-flat line between draws.
fn wiggle(day_index: i64) -> f64 {
    (day_index as f64 * 0.25).sin() * 2.0
}

/// Simple moving average over the last `window` wearable values of
/// `field`, one output point per input day. The first `window - 1` days
/// are `None` regardless of data availability; a window containing a
/// missing value yields `None` for that day.
pub fn rolling(
    readings: &[WearableReading],
    field: MetricId,
    window: usize,
) -> Vec<MetricSeriesPoint> {
    let mut out = Vec::with_capacity(readings.len());
    let mut queue: VecDeque<Option<f64>> = VecDeque::with_capacity(window);

    for reading in readings {
        queue.push_back(reading.field(field).filter(|v| v.is_finite()));
        if queue.len() > window {
            queue.pop_front();
        }

        let value = if queue.len() == window && queue.iter().all(Option::is_some) {
            let sum: f64 = queue.iter().flatten().sum();
            Some(round_dp(sum / window as f64, field.decimals()))
        } else {
            None
        };

        out.push(MetricSeriesPoint {
            date: reading.date,
            value,
        });
    }

    out
}

/// Interpolation anchors: `(day number, value)` pairs from panels where
/// the field is present and finite, sorted ascending.
fn anchors(diagnostics: &[DiagnosticPanel], field: MetricId) -> Vec<(i64, f64)> {
    let mut pts: Vec<(i64, f64)> = diagnostics
        .iter()
        .filter_map(|d| {
            d.field(field)
                .filter(|v| v.is_finite())
                .map(|v| (i64::from(d.date.num_days_from_ce()), v))
        })
        .collect();
    pts.sort_by_key(|p| p.0);
    pts
}

/// Linearly interpolate `t` between the bracketing anchors, holding the
/// nearest anchor when `t` precedes the first or follows the last draw.
/// `cursor` is the advancing anchor index shared across the day loop.
fn interpolate_at(pts: &[(i64, f64)], t: i64, cursor: &mut usize) -> f64 {
    if t <= pts[0].0 {
        return pts[0].1;
    }
    while *cursor < pts.len() - 1 && t > pts[*cursor + 1].0 {
        *cursor += 1;
    }
    let a = pts[*cursor];
    let b = pts[(*cursor + 1).min(pts.len() - 1)];
    if b.0 == a.0 {
        return a.1;
    }
    let r = (t - a.0) as f64 / (b.0 - a.0) as f64;
    a.1 + (b.1 - a.1) * r
}

/// Daily values for a sparse diagnostic field other than LDL-C, keyed by
/// date over `[start, end]` inclusive. Zero qualifying panels yield an
/// empty map.
pub fn lab_day_map(
    diagnostics: &[DiagnosticPanel],
    field: MetricId,
    start: NaiveDate,
    end: NaiveDate,
) -> BTreeMap<NaiveDate, f64> {
    let pts = anchors(diagnostics, field);
    if pts.is_empty() {
        return BTreeMap::new();
    }

    // hs-CRP lives on a much smaller scale than the lipid markers.
    let wiggle_scale = if field == MetricId::HsCrp { 0.15 } else { 1.0 };

    let mut out = BTreeMap::new();
    let mut cursor = 0usize;
    for (day_idx, d) in start.iter_days().take_while(|d| *d <= end).enumerate() {
        let t = i64::from(d.num_days_from_ce());
        let val = interpolate_at(&pts, t, &mut cursor);
        out.insert(d, (val + wiggle(day_idx as i64) * wiggle_scale).round());
    }
    out
}

/// Daily LDL-C values interpolated between lab draws. Same
/// anchor/hold/interpolate/perturb/round contract as [`lab_day_map`],
/// kept as its own routine.
pub fn ldl_day_map(
    diagnostics: &[DiagnosticPanel],
    start: NaiveDate,
    end: NaiveDate,
) -> BTreeMap<NaiveDate, f64> {
    let pts = anchors(diagnostics, MetricId::LdlC);
    if pts.is_empty() {
        return BTreeMap::new();
    }

    let mut out = BTreeMap::new();
    let mut cursor = 0usize;
    for (day_idx, d) in start.iter_days().take_while(|d| *d <= end).enumerate() {
        let t = i64::from(d.num_days_from_ce());
        let val = interpolate_at(&pts, t, &mut cursor);
        out.insert(d, (val + wiggle(day_idx as i64)).round());
    }
    out
}

/// Build the daily series for `metric`, one point per wearable day in
/// date order. Output length equals the wearable timeline length for
/// every source strategy, so all series are date-aligned for joint
/// charting. An empty wearable timeline yields an empty series.
pub fn build_series(
    metric: MetricId,
    wearable: &[WearableReading],
    diagnostics: &[DiagnosticPanel],
) -> Vec<MetricSeriesPoint> {
    if wearable.is_empty() {
        return Vec::new();
    }
    let start = wearable[0].date;
    let end = wearable[wearable.len() - 1].date;

    match metric.source() {
        SeriesSource::Wearable => wearable
            .iter()
            .map(|r| MetricSeriesPoint {
                date: r.date,
                value: r.field(metric).filter(|v| v.is_finite()),
            })
            .collect(),
        SeriesSource::Rolling { field, window } => rolling(wearable, field, window),
        SeriesSource::Lab => {
            let map = lab_day_map(diagnostics, metric, start, end);
            wearable
                .iter()
                .map(|r| MetricSeriesPoint {
                    date: r.date,
                    value: map.get(&r.date).copied(),
                })
                .collect()
        }
        SeriesSource::LabLdl => {
            let map = ldl_day_map(diagnostics, start, end);
            wearable
                .iter()
                .map(|r| MetricSeriesPoint {
                    date: r.date,
                    value: map.get(&r.date).copied(),
                })
                .collect()
        }
    }
}
