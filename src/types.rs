//! Core types for the coachtrace derivation pipeline
//!
//! This module defines the entities loaded from a dataset bundle
//! (wearable readings, diagnostic panels, interventions, rationales) and
//! the derived shapes handed to the presentation layer (series points,
//! segment points, decisions).

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::metrics::MetricId;

/// Member sex, used only for the HDL-C band floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[default]
    Male,
    Female,
}

/// The member this bundle describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub member_id: String,
    pub preferred_name: String,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Sex,
    #[serde(default)]
    pub primary_residence: Option<String>,
    #[serde(default)]
    pub travel_hubs: Vec<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub assistant: Option<String>,
    #[serde(default)]
    pub chronic_condition: Option<String>,
    #[serde(default)]
    pub wearables: Vec<String>,
}

/// A coaching episode (a titled span of the program).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub episode_id: String,
    pub title: String,
    pub start_at: String,
    pub end_at: String,
    #[serde(default)]
    pub summary: Option<String>,
}

/// A member trip; travel days depress the synthetic wearable signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    #[serde(default)]
    pub member_id: Option<String>,
    pub trip_id: String,
    pub location: String,
    pub start_at: DateTime<FixedOffset>,
    pub end_at: DateTime<FixedOffset>,
}

impl Trip {
    /// Whether `date` falls inside the trip, inclusive on both ends.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_at.date_naive() && date <= self.end_at.date_naive()
    }
}

/// One calendar day of wearable data. The sequence is contiguous and
/// sorted ascending by date; it is the canonical timeline every other
/// series is aligned against.
///
/// Metric fields are optional so that missing or non-numeric input
/// degrades to `None` at the parse boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WearableReading {
    pub date: NaiveDate,
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(rename = "HRV_ms", default)]
    pub hrv_ms: Option<f64>,
    #[serde(default)]
    pub recovery_pct: Option<f64>,
    #[serde(default)]
    pub deep_sleep_min: Option<f64>,
    #[serde(default)]
    pub rem_sleep_min: Option<f64>,
    #[serde(default)]
    pub steps: Option<f64>,
}

impl WearableReading {
    /// Look up a wearable field by metric id. Non-wearable metrics
    /// always yield `None`.
    pub fn field(&self, metric: MetricId) -> Option<f64> {
        match metric {
            MetricId::HrvMs => self.hrv_ms,
            MetricId::RecoveryPct => self.recovery_pct,
            MetricId::DeepSleepMin => self.deep_sleep_min,
            MetricId::RemSleepMin => self.rem_sleep_min,
            MetricId::Steps => self.steps,
            _ => None,
        }
    }
}

/// A sparse lab draw (roughly every 1-3 months). Never mutated after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticPanel {
    #[serde(default)]
    pub member_id: Option<String>,
    pub diagnostic_id: String,
    pub date: NaiveDate,
    #[serde(rename = "ApoB", default)]
    pub apo_b: Option<f64>,
    #[serde(rename = "LDL_C", default)]
    pub ldl_c: Option<f64>,
    #[serde(rename = "HDL_C", default)]
    pub hdl_c: Option<f64>,
    #[serde(rename = "TG", default)]
    pub tg: Option<f64>,
    #[serde(rename = "hsCRP", default)]
    pub hs_crp: Option<f64>,
    #[serde(rename = "Notes", default)]
    pub notes: Option<String>,
}

impl DiagnosticPanel {
    /// Look up a lab field by metric id.
    pub fn field(&self, metric: MetricId) -> Option<f64> {
        match metric {
            MetricId::ApoB => self.apo_b,
            MetricId::LdlC => self.ldl_c,
            MetricId::HdlC => self.hdl_c,
            MetricId::HsCrp => self.hs_crp,
            _ => None,
        }
    }
}

/// A delta as stored in the bundle: expected deltas are free text
/// (`"+4 to +6"`, `"−8"`) while actual deltas are numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeltaField {
    Number(f64),
    Text(String),
}

impl DeltaField {
    /// The delta as a plain number, if it is one (or plain numeric text).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            DeltaField::Number(n) if n.is_finite() => Some(*n),
            DeltaField::Number(_) => None,
            DeltaField::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

/// Per-metric change inside an expected or actual outcome block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<DeltaField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
}

/// The expected or actual outcome of an intervention.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<MetricId, MetricChange>,
}

/// A coach-authored intervention. `start_at`/`end_at` are kept as-is;
/// the first 10 characters are the ISO date used for ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    #[serde(default)]
    pub member_id: Option<String>,
    pub intervention_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub start_at: String,
    #[serde(default)]
    pub end_at: Option<String>,
    #[serde(default)]
    pub adherence: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub expected: OutcomeSpec,
    #[serde(default)]
    pub actual: OutcomeSpec,
}

/// Why a decision was made, with pointers into the chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rationale {
    #[serde(default)]
    pub decision_type: Option<String>,
    pub decision_id: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub member_id: Option<String>,
    pub reason_summary: String,
    #[serde(default)]
    pub evidence_message_ids: Vec<String>,
}

/// Weekly hours a team member spent on this member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalMetric {
    pub week_start: NaiveDate,
    #[serde(default)]
    pub member_id: Option<String>,
    pub team_member: String,
    pub role: String,
    pub hours: f64,
}

/// One daily point of a derived metric series. `None` means "no data for
/// this day" and propagates through every downstream stage; it is never
/// coerced to zero and never omitted from the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// A series point split for direction-aware chart coloring. For a valued
/// point exactly one of the three fields is set; for a null point all
/// three are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentPoint {
    pub date: NaiveDate,
    pub in_range: Option<f64>,
    pub good_out: Option<f64>,
    pub bad_out: Option<f64>,
}

/// Presentation type of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionKind {
    Exercise,
    Nutrition,
    Medication,
    Diagnostic,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Exercise => "Exercise",
            DecisionKind::Nutrition => "Nutrition",
            DecisionKind::Medication => "Medication",
            DecisionKind::Diagnostic => "Diagnostic",
        }
    }
}

/// Unified view of an intervention or diagnostic panel, normalized for
/// chronological display and rationale linkage. Rebuilt from the source
/// lists on demand; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DecisionKind,
    #[serde(rename = "dateISO")]
    pub date: NaiveDate,
    #[serde(rename = "dateLabel")]
    pub date_label: String,
    pub label: String,
    pub owner: String,
    pub expected: OutcomeSpec,
    pub actual: OutcomeSpec,
}
