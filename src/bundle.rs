//! Dataset bundle loading and snapshot semantics
//!
//! A bundle is the whole input dataset for one member. Loading it (or
//! replacing the chat/rationale keys from a JSONL upload) always
//! produces a complete new [`Snapshot`] value with a fresh identity;
//! nothing is merged in place. Derived views can use the snapshot id as
//! a memoization key because equal ids imply identical source data.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::{normalize_chat, ChatNormalization, RawChatRecord};
use crate::error::CoreError;
use crate::types::{
    DiagnosticPanel, Episode, InternalMetric, Intervention, Member, Rationale, Trip,
    WearableReading,
};

/// The input dataset shape: one member plus everything recorded about
/// them. Collections default to empty so partial bundles still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub member: Member,
    #[serde(default)]
    pub episodes: Vec<Episode>,
    #[serde(default)]
    pub trips: Vec<Trip>,
    #[serde(default)]
    pub diagnostics: Vec<DiagnosticPanel>,
    #[serde(default)]
    pub interventions: Vec<Intervention>,
    #[serde(default)]
    pub chat: Vec<RawChatRecord>,
    #[serde(default)]
    pub rationales: Vec<Rationale>,
    #[serde(default)]
    pub internal_metrics: Vec<InternalMetric>,
    #[serde(default)]
    pub wearable_daily: Vec<WearableReading>,
}

/// Result of parsing a JSONL upload: decoded records plus the 1-based
/// line numbers that failed to decode. Bad lines are flagged, not
/// silently dropped and not fatal.
#[derive(Debug, Clone)]
pub struct JsonlBatch<T> {
    pub records: Vec<T>,
    pub skipped_lines: Vec<usize>,
}

/// Parse newline-delimited JSON, one record per non-empty line.
pub fn load_jsonl<T: DeserializeOwned>(text: &str) -> JsonlBatch<T> {
    let mut records = Vec::new();
    let mut skipped_lines = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str(trimmed) {
            Ok(record) => records.push(record),
            Err(_) => skipped_lines.push(i + 1),
        }
    }
    JsonlBatch {
        records,
        skipped_lines,
    }
}

/// An immutable loaded dataset with normalized chat and a unique
/// identity. All derivation functions take the snapshot (or slices of
/// it) by reference; replacing any part builds a new snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: Uuid,
    pub dataset: Dataset,
    pub chat: ChatNormalization,
    /// Line numbers skipped by the chat JSONL upload that produced this
    /// snapshot's transcript. Empty when the chat came from a full bundle.
    pub chat_skipped_lines: Vec<usize>,
    /// Line numbers skipped by the rationale JSONL upload that produced
    /// this snapshot's rationales.
    pub rationale_skipped_lines: Vec<usize>,
}

impl Snapshot {
    /// Build a snapshot from an already-parsed dataset.
    pub fn new(dataset: Dataset) -> Self {
        let chat = normalize_chat(&dataset.chat, &dataset.member);
        Self {
            id: Uuid::new_v4(),
            dataset,
            chat,
            chat_skipped_lines: Vec::new(),
            rationale_skipped_lines: Vec::new(),
        }
    }

    /// Parse a full bundle from JSON.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let dataset: Dataset = serde_json::from_str(json)?;
        Ok(Self::new(dataset))
    }

    /// Replace the chat transcript from a JSONL upload. The whole key is
    /// swapped; the previous snapshot is untouched. Undecodable lines are
    /// carried on the new snapshot, not silently dropped.
    pub fn with_chat_jsonl(&self, text: &str) -> Self {
        let batch: JsonlBatch<RawChatRecord> = load_jsonl(text);
        let mut dataset = self.dataset.clone();
        dataset.chat = batch.records;
        let mut snap = Self::new(dataset);
        snap.chat_skipped_lines = batch.skipped_lines;
        snap.rationale_skipped_lines = self.rationale_skipped_lines.clone();
        snap
    }

    /// Replace the rationale records from a JSONL upload.
    pub fn with_rationales_jsonl(&self, text: &str) -> Self {
        let batch: JsonlBatch<Rationale> = load_jsonl(text);
        let mut dataset = self.dataset.clone();
        dataset.rationales = batch.records;
        let mut snap = Self::new(dataset);
        snap.chat_skipped_lines = self.chat_skipped_lines.clone();
        snap.rationale_skipped_lines = batch.skipped_lines;
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_bundle() -> String {
        r#"{
            "member": { "member_id": "M0001", "preferred_name": "Rohan Patel", "age": 46, "gender": "Male" },
            "diagnostics": [
                { "diagnostic_id": "D00", "date": "2025-02-12", "ApoB": 112, "LDL_C": 132, "HDL_C": 48, "TG": 160, "hsCRP": 2.1, "Notes": "Baseline prior to plan" }
            ],
            "wearable_daily": [
                { "date": "2025-03-01", "HRV_ms": 43.2, "recovery_pct": 55, "deep_sleep_min": 70, "rem_sleep_min": 95, "steps": 9100 }
            ],
            "chat": [
                { "message_id": "R001", "timestamp": "2025-01-29T09:10:00+08:00",
                  "sender_id": "U_Rachel", "sender": "Rachel", "sender_role": "physio",
                  "receiver_id": "M0001", "receiver": "Rohan Patel", "receiver_role": "member",
                  "topic": "Kickoff", "text": "Morning Rohan" }
            ]
        }"#
        .to_string()
    }

    #[test]
    fn test_load_bundle() {
        let snap = Snapshot::from_json(&minimal_bundle()).unwrap();
        assert_eq!(snap.dataset.member.member_id, "M0001");
        assert_eq!(snap.dataset.diagnostics.len(), 1);
        assert_eq!(snap.dataset.wearable_daily[0].hrv_ms, Some(43.2));
        assert_eq!(snap.chat.messages.len(), 1);
        assert!(snap.chat.rejected.is_empty());
    }

    #[test]
    fn test_invalid_bundle_is_an_error() {
        assert!(Snapshot::from_json("not json").is_err());
        assert!(Snapshot::from_json("{}").is_err());
    }

    #[test]
    fn test_jsonl_counts_bad_lines() {
        let text = "\
{\"decision_id\": \"I0001\", \"reason_summary\": \"tone\"}\n\
this is not json\n\
\n\
{\"decision_id\": \"I0002\", \"reason_summary\": \"lipids\"}\n";
        let batch: JsonlBatch<Rationale> = load_jsonl(text);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped_lines, vec![2]);
    }

    #[test]
    fn test_chat_replacement_is_whole_value() {
        let snap = Snapshot::from_json(&minimal_bundle()).unwrap();
        let jsonl = r#"{"message_id": "C001", "timestamp": "2025-02-03T10:00:00+08:00", "sender": "Carla", "role": "nutrition", "text": "Add 2g EPA+DHA"}"#;
        let replaced = snap.with_chat_jsonl(jsonl);

        // New snapshot carries only the uploaded transcript.
        assert_eq!(replaced.chat.messages.len(), 1);
        assert_eq!(replaced.chat.messages[0].message_id, "C001");
        // The original is untouched and the identity changed.
        assert_eq!(snap.chat.messages[0].message_id, "R001");
        assert_ne!(snap.id, replaced.id);
    }

    #[test]
    fn test_upload_skipped_lines_reach_the_snapshot() {
        let snap = Snapshot::from_json(&minimal_bundle()).unwrap();
        assert!(snap.chat_skipped_lines.is_empty());

        let jsonl = "\
not json at all\n\
{\"message_id\": \"C001\", \"timestamp\": \"2025-02-03T10:00:00+08:00\", \"sender\": \"Carla\", \"role\": \"nutrition\", \"text\": \"Add 2g EPA+DHA\"}\n\
{broken\n";
        let replaced = snap.with_chat_jsonl(jsonl);
        assert_eq!(replaced.chat.messages.len(), 1);
        assert_eq!(replaced.chat_skipped_lines, vec![1, 3]);

        // A later rationale upload keeps the chat skip record.
        let again = replaced.with_rationales_jsonl("also not json\n");
        assert_eq!(again.chat_skipped_lines, vec![1, 3]);
        assert_eq!(again.rationale_skipped_lines, vec![1]);
        assert!(again.dataset.rationales.is_empty());
    }

    #[test]
    fn test_rationale_replacement() {
        let snap = Snapshot::from_json(&minimal_bundle()).unwrap();
        let jsonl = r#"{"decision_id": "I0005", "reason_summary": "ARB trial", "evidence_message_ids": ["W001"]}"#;
        let replaced = snap.with_rationales_jsonl(jsonl);
        assert_eq!(replaced.dataset.rationales.len(), 1);
        assert_eq!(replaced.dataset.rationales[0].decision_id, "I0005");
        assert!(snap.dataset.rationales.is_empty());
    }
}
