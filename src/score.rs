//! Segmentation and outcome scoring
//!
//! Two pure classification passes over derived data: splitting a daily
//! series into in-range and direction-aware out-of-range points for
//! chart coloring, and grading an intervention's actual metric delta
//! against its free-text expectation.

use serde::{Deserialize, Serialize};

use crate::metrics::{Direction, MetricId};
use crate::types::{DeltaField, MetricChange, MetricSeriesPoint, SegmentPoint};

/// Split a series against a target band. For every valued point exactly
/// one of `in_range`/`good_out`/`bad_out` carries the value; out-of-band
/// values are "good" when the excursion agrees with the metric's
/// direction (steps above target, LDL-C below target). Null points stay
/// null in all three fields.
pub fn segment(
    series: &[MetricSeriesPoint],
    lo: f64,
    hi: f64,
    direction: Direction,
) -> Vec<SegmentPoint> {
    series
        .iter()
        .map(|p| {
            let mut seg = SegmentPoint {
                date: p.date,
                in_range: None,
                good_out: None,
                bad_out: None,
            };
            if let Some(v) = p.value {
                if (lo..=hi).contains(&v) {
                    seg.in_range = Some(v);
                } else {
                    let favorable = match direction {
                        Direction::Up => v > hi,
                        Direction::Down => v < lo,
                    };
                    if favorable {
                        seg.good_out = Some(v);
                    } else {
                        seg.bad_out = Some(v);
                    }
                }
            }
            seg
        })
        .collect()
}

/// A parsed expected-delta range. A single number yields `min == max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaRange {
    pub min: f64,
    pub max: f64,
}

/// Parse a free-text delta such as `"+4 to +6"` or `"−8"` into a numeric
/// range: signed numeric tokens are extracted (en/em-dashes and the
/// Unicode minus normalize to ASCII `-` first) and the range is their
/// min/max. Strings containing no parseable number yield `None`; the
/// scoring fallback for that case is `Na`.
pub fn parse_delta(text: &str) -> Option<DeltaRange> {
    let norm: String = text
        .chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            c => c,
        })
        .collect();

    let mut nums: Vec<f64> = Vec::new();
    let mut chars = norm.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c == '+' || c == '-' || c.is_ascii_digit() || c == '.' {
            let mut token = String::new();
            if c == '+' || c == '-' {
                token.push(c);
                chars.next();
            }
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    token.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            if let Ok(n) = token.parse::<f64>() {
                if n.is_finite() {
                    nums.push(n);
                }
            }
        } else {
            chars.next();
        }
    }

    let (mut min, mut max) = (*nums.first()?, *nums.first()?);
    for &n in &nums[1..] {
        min = min.min(n);
        max = max.max(n);
    }
    Some(DeltaRange { min, max })
}

fn expected_range(delta: Option<&DeltaField>) -> Option<DeltaRange> {
    match delta? {
        DeltaField::Number(n) if n.is_finite() => Some(DeltaRange { min: *n, max: *n }),
        DeltaField::Number(_) => None,
        DeltaField::Text(s) => parse_delta(s),
    }
}

/// Outcome classification for one scored metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Met,
    Partial,
    Missed,
    Na,
}

/// Result of comparing an intervention's actual delta to its expectation.
/// Values are direction-normalized so that larger always means better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: OutcomeStatus,
    pub norm_actual: f64,
    pub norm_expected: f64,
}

/// Score one metric's actual change against its expected delta.
///
/// The actual delta prefers an explicit numeric `actual.delta` and falls
/// back to `after - before` when both are finite. For down-is-good
/// metrics both sides are negated so the comparison is uniform. `met` at
/// or above the expected minimum, `partial` at 60% of it, `missed`
/// below, `na` when either side is missing or unparseable.
pub fn score_outcome(metric: MetricId, expected: &MetricChange, actual: &MetricChange) -> Outcome {
    let e = expected_range(expected.delta.as_ref());
    let a = actual
        .delta
        .as_ref()
        .and_then(DeltaField::as_number)
        .or_else(|| match (actual.before, actual.after) {
            (Some(b), Some(f)) if b.is_finite() && f.is_finite() => Some(f - b),
            _ => None,
        });

    let (a, e) = match (a, e) {
        (Some(a), Some(e)) => (a, e),
        _ => {
            return Outcome {
                status: OutcomeStatus::Na,
                norm_actual: 0.0,
                norm_expected: 0.0,
            }
        }
    };

    let (norm_actual, norm_expected) = match metric.direction() {
        Direction::Up => (a, e.min),
        Direction::Down => (-a, -e.min),
    };

    let status = if norm_actual >= norm_expected {
        OutcomeStatus::Met
    } else if norm_actual >= 0.6 * norm_expected {
        OutcomeStatus::Partial
    } else {
        OutcomeStatus::Missed
    };

    Outcome {
        status,
        norm_actual,
        norm_expected,
    }
}
