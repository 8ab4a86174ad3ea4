//! Metric definitions: identifiers, target bands, and directions
//!
//! The metric set is a closed enum; every chartable series the
//! presentation layer can request is one of these ids. Bands are the
//! fixed target ranges used for segmentation, and the direction flag
//! says which way out of band is still a good excursion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::Sex;

/// Which direction is "good" for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Higher is better (HRV, recovery, sleep, steps, HDL-C).
    Up,
    /// Lower is better (LDL-C, ApoB, hs-CRP).
    Down,
}

/// How a metric's daily series is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSource {
    /// Read straight off the wearable day record.
    Wearable,
    /// Simple moving average of the last `window` wearable values.
    Rolling { field: MetricId, window: usize },
    /// Interpolated between sparse lab draws.
    Lab,
    /// LDL-C keeps its own interpolation routine (same contract).
    LabLdl,
}

/// Canonical metric identifier, matching the wire keys of the bundle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum MetricId {
    #[serde(rename = "HRV_ms")]
    HrvMs,
    #[serde(rename = "recovery_pct")]
    RecoveryPct,
    #[serde(rename = "deep_sleep_min")]
    DeepSleepMin,
    #[serde(rename = "rem_sleep_min")]
    RemSleepMin,
    #[serde(rename = "steps")]
    Steps,
    #[serde(rename = "HRV_7d")]
    Hrv7d,
    #[serde(rename = "REC_7d")]
    Rec7d,
    #[serde(rename = "HRV_30d")]
    Hrv30d,
    #[serde(rename = "ApoB")]
    ApoB,
    #[serde(rename = "LDL_C")]
    LdlC,
    #[serde(rename = "HDL_C")]
    HdlC,
    #[serde(rename = "hsCRP")]
    HsCrp,
}

/// All metric ids, in dashboard tile order.
pub const ALL_METRICS: [MetricId; 12] = [
    MetricId::HrvMs,
    MetricId::RecoveryPct,
    MetricId::DeepSleepMin,
    MetricId::RemSleepMin,
    MetricId::Steps,
    MetricId::Hrv7d,
    MetricId::Rec7d,
    MetricId::Hrv30d,
    MetricId::ApoB,
    MetricId::LdlC,
    MetricId::HdlC,
    MetricId::HsCrp,
];

impl MetricId {
    /// Wire key as it appears in the bundle and the chart API.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::HrvMs => "HRV_ms",
            MetricId::RecoveryPct => "recovery_pct",
            MetricId::DeepSleepMin => "deep_sleep_min",
            MetricId::RemSleepMin => "rem_sleep_min",
            MetricId::Steps => "steps",
            MetricId::Hrv7d => "HRV_7d",
            MetricId::Rec7d => "REC_7d",
            MetricId::Hrv30d => "HRV_30d",
            MetricId::ApoB => "ApoB",
            MetricId::LdlC => "LDL_C",
            MetricId::HdlC => "HDL_C",
            MetricId::HsCrp => "hsCRP",
        }
    }

    /// Human-readable tile label.
    pub fn label(&self) -> &'static str {
        match self {
            MetricId::HrvMs => "HRV (ms)",
            MetricId::RecoveryPct => "Recovery (%)",
            MetricId::DeepSleepMin => "Deep Sleep (min)",
            MetricId::RemSleepMin => "REM Sleep (min)",
            MetricId::Steps => "Steps",
            MetricId::Hrv7d => "HRV 7d avg",
            MetricId::Rec7d => "Recovery 7d avg",
            MetricId::Hrv30d => "HRV 30d avg",
            MetricId::ApoB => "ApoB",
            MetricId::LdlC => "LDL-C",
            MetricId::HdlC => "HDL-C",
            MetricId::HsCrp => "hs-CRP",
        }
    }

    /// Display unit, empty when the value is unitless.
    pub fn unit(&self) -> &'static str {
        match self {
            MetricId::HrvMs | MetricId::Hrv7d | MetricId::Hrv30d => "ms",
            MetricId::RecoveryPct | MetricId::Rec7d => "%",
            MetricId::DeepSleepMin | MetricId::RemSleepMin => "min",
            MetricId::LdlC => "mg/dL",
            MetricId::HsCrp => "mg/L",
            MetricId::Steps | MetricId::ApoB | MetricId::HdlC => "",
        }
    }

    /// Target band `(lo, hi)`. Bounds are fixed per metric; only the
    /// HDL-C floor depends on the member's sex. Rolling averages inherit
    /// the band of their underlying field.
    pub fn band(&self, sex: Sex) -> (f64, f64) {
        match self {
            MetricId::HrvMs | MetricId::Hrv7d | MetricId::Hrv30d => (38.0, 65.0),
            MetricId::RecoveryPct | MetricId::Rec7d => (55.0, 90.0),
            MetricId::DeepSleepMin => (75.0, 110.0),
            MetricId::RemSleepMin => (90.0, 140.0),
            MetricId::Steps => (8000.0, 11000.0),
            MetricId::ApoB => (60.0, 90.0),
            MetricId::LdlC => (60.0, 100.0),
            MetricId::HdlC => {
                let lo = if sex == Sex::Female { 50.0 } else { 40.0 };
                (lo, 80.0)
            }
            MetricId::HsCrp => (0.2, 2.0),
        }
    }

    /// Good direction for the metric.
    pub fn direction(&self) -> Direction {
        match self {
            MetricId::ApoB | MetricId::LdlC | MetricId::HsCrp => Direction::Down,
            _ => Direction::Up,
        }
    }

    /// Source strategy for the daily series.
    pub fn source(&self) -> SeriesSource {
        match self {
            MetricId::HrvMs
            | MetricId::RecoveryPct
            | MetricId::DeepSleepMin
            | MetricId::RemSleepMin
            | MetricId::Steps => SeriesSource::Wearable,
            MetricId::Hrv7d => SeriesSource::Rolling {
                field: MetricId::HrvMs,
                window: 7,
            },
            MetricId::Rec7d => SeriesSource::Rolling {
                field: MetricId::RecoveryPct,
                window: 7,
            },
            MetricId::Hrv30d => SeriesSource::Rolling {
                field: MetricId::HrvMs,
                window: 30,
            },
            MetricId::ApoB | MetricId::HdlC | MetricId::HsCrp => SeriesSource::Lab,
            MetricId::LdlC => SeriesSource::LabLdl,
        }
    }

    /// Display decimals: HRV metrics keep one decimal, everything else
    /// rounds to whole numbers.
    pub fn decimals(&self) -> u32 {
        match self {
            MetricId::HrvMs | MetricId::Hrv7d | MetricId::Hrv30d => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_METRICS
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CoreError::UnknownMetric(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_lookup() {
        assert_eq!(MetricId::HrvMs.band(Sex::Male), (38.0, 65.0));
        assert_eq!(MetricId::Steps.band(Sex::Male), (8000.0, 11000.0));
        assert_eq!(MetricId::HsCrp.band(Sex::Male), (0.2, 2.0));
    }

    #[test]
    fn test_hdl_floor_depends_on_sex() {
        assert_eq!(MetricId::HdlC.band(Sex::Male), (40.0, 80.0));
        assert_eq!(MetricId::HdlC.band(Sex::Female), (50.0, 80.0));
    }

    #[test]
    fn test_rolling_metrics_inherit_band_and_direction() {
        assert_eq!(
            MetricId::Hrv7d.band(Sex::Male),
            MetricId::HrvMs.band(Sex::Male)
        );
        assert_eq!(MetricId::Hrv30d.direction(), Direction::Up);
        assert_eq!(MetricId::Rec7d.band(Sex::Male), (55.0, 90.0));
    }

    #[test]
    fn test_directions() {
        assert_eq!(MetricId::LdlC.direction(), Direction::Down);
        assert_eq!(MetricId::ApoB.direction(), Direction::Down);
        assert_eq!(MetricId::HsCrp.direction(), Direction::Down);
        assert_eq!(MetricId::HdlC.direction(), Direction::Up);
        assert_eq!(MetricId::Steps.direction(), Direction::Up);
    }

    #[test]
    fn test_wire_name_round_trip() {
        for m in ALL_METRICS {
            assert_eq!(m.as_str().parse::<MetricId>().unwrap(), m);
        }
        assert!("VO2max".parse::<MetricId>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&MetricId::HsCrp).unwrap();
        assert_eq!(json, "\"hsCRP\"");
        let back: MetricId = serde_json::from_str("\"HRV_7d\"").unwrap();
        assert_eq!(back, MetricId::Hrv7d);
    }
}
