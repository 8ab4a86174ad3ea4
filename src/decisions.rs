//! Decision aggregation
//!
//! Merges interventions and diagnostic panels into one chronologically
//! ordered decision list for the flow view, and joins decisions to the
//! chat evidence that motivated them via the rationale records.

use chrono::NaiveDate;

use crate::chat::Message;
use crate::metrics::MetricId;
use crate::types::{
    Decision, DecisionKind, DiagnosticPanel, Intervention, MetricChange, OutcomeSpec, Rationale,
};

/// Classify an intervention's free-text type into a presentation kind.
/// Case-insensitive substring match; anything unrecognized falls back to
/// Exercise.
pub fn classify_kind(kind_text: &str) -> DecisionKind {
    let t = kind_text.to_lowercase();
    if t.contains("exercise") {
        DecisionKind::Exercise
    } else if t.contains("nutrition") {
        DecisionKind::Nutrition
    } else if t.contains("medication") || t.contains("drug") || t.contains("rx") {
        DecisionKind::Medication
    } else {
        DecisionKind::Exercise
    }
}

/// Derive the decision date from a timestamp-or-date string: the first
/// 10 characters read as an ISO date.
pub fn decision_date(s: &str) -> Option<NaiveDate> {
    s.get(0..10).and_then(|d| d.parse().ok())
}

fn date_label(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

fn fmt_marker(v: Option<f64>) -> String {
    match v {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => format!("{v}"),
        None => "\u{2014}".to_string(),
    }
}

fn owner_fallback(kind: DecisionKind) -> &'static str {
    match kind {
        DecisionKind::Medication | DecisionKind::Diagnostic => "Physician",
        DecisionKind::Nutrition => "Nutritionist",
        DecisionKind::Exercise => "Coach",
    }
}

/// Merge interventions and diagnostics into one normalized decision
/// list, ascending by date. The sort is stable, so same-day entries keep
/// their source order (interventions ahead of diagnostics). Entries with
/// an unparseable date are skipped; a pure function of its arguments.
pub fn build_decisions(
    interventions: &[Intervention],
    diagnostics: &[DiagnosticPanel],
) -> Vec<Decision> {
    let mut all: Vec<Decision> = Vec::new();

    for iv in interventions {
        let date = match decision_date(&iv.start_at)
            .or_else(|| iv.end_at.as_deref().and_then(decision_date))
        {
            Some(d) => d,
            None => continue,
        };
        let kind = classify_kind(&iv.kind);
        all.push(Decision {
            id: iv.intervention_id.clone(),
            kind,
            date,
            date_label: date_label(date),
            label: iv.title.clone(),
            owner: iv
                .owner
                .clone()
                .unwrap_or_else(|| owner_fallback(kind).to_string()),
            expected: iv.expected.clone(),
            actual: iv.actual.clone(),
        });
    }

    for dx in diagnostics {
        let date = dx.date;
        let mut expected = OutcomeSpec {
            note: Some("Quantify risk markers".to_string()),
            metrics: Default::default(),
        };
        for m in [MetricId::ApoB, MetricId::LdlC, MetricId::HsCrp] {
            expected.metrics.insert(m, MetricChange::default());
        }
        let actual = OutcomeSpec {
            note: Some(format!(
                "ApoB {}, LDL-C {}, hsCRP {}",
                fmt_marker(dx.apo_b),
                fmt_marker(dx.ldl_c),
                fmt_marker(dx.hs_crp)
            )),
            metrics: Default::default(),
        };
        all.push(Decision {
            id: dx.diagnostic_id.clone(),
            kind: DecisionKind::Diagnostic,
            date,
            date_label: date_label(date),
            label: dx
                .notes
                .clone()
                .unwrap_or_else(|| "Diagnostic panel".to_string()),
            owner: owner_fallback(DecisionKind::Diagnostic).to_string(),
            expected,
            actual,
        });
    }

    all.sort_by_key(|d| d.date);
    all
}

/// The display name of an owner string, dropping any parenthesized role
/// suffix ("Rachel (Physiotherapist)" is owned by "Rachel").
pub fn owner_name(owner: &str) -> &str {
    owner.split('(').next().unwrap_or(owner).trim()
}

/// Filter the decision list for the decisions panel: free-text query
/// over label, kind, owner, and date label, plus an owner multi-select
/// (empty selection shows all). Returns newest-first.
pub fn filter_decisions(
    decisions: &[Decision],
    query: &str,
    owners: &[String],
) -> Vec<Decision> {
    let q = query.trim().to_lowercase();
    let selected: Vec<String> = owners.iter().map(|o| o.to_lowercase()).collect();

    let mut out: Vec<Decision> = decisions
        .iter()
        .filter(|d| {
            if q.is_empty() {
                return true;
            }
            let hay = format!(
                "{} {} {} {}",
                d.label,
                d.kind.as_str(),
                d.owner,
                d.date_label
            )
            .to_lowercase();
            hay.contains(&q)
        })
        .filter(|d| {
            selected.is_empty() || selected.contains(&owner_name(&d.owner).to_lowercase())
        })
        .cloned()
        .collect();
    out.sort_by(|a, b| b.date.cmp(&a.date));
    out
}

/// Look up the rationale for a decision id, case-insensitively.
pub fn find_rationale<'a>(rationales: &'a [Rationale], decision_id: &str) -> Option<&'a Rationale> {
    rationales
        .iter()
        .find(|r| r.decision_id.eq_ignore_ascii_case(decision_id))
}

/// Resolve a rationale's evidence pointers into chat messages, keeping
/// the rationale's ordering. Dangling ids are dropped.
pub fn evidence_messages<'a>(rationale: &Rationale, chat: &'a [Message]) -> Vec<&'a Message> {
    rationale
        .evidence_message_ids
        .iter()
        .filter_map(|id| chat.iter().find(|m| &m.message_id == id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn intervention(id: &str, kind: &str, start: &str) -> Intervention {
        Intervention {
            member_id: None,
            intervention_id: id.into(),
            kind: kind.into(),
            title: format!("{kind} plan"),
            start_at: start.into(),
            end_at: None,
            adherence: None,
            status: None,
            owner: Some("Rachel (Physiotherapist)".into()),
            expected: OutcomeSpec::default(),
            actual: OutcomeSpec::default(),
        }
    }

    fn panel(id: &str, date: &str) -> DiagnosticPanel {
        DiagnosticPanel {
            member_id: None,
            diagnostic_id: id.into(),
            date: date.parse().unwrap(),
            apo_b: Some(112.0),
            ldl_c: Some(132.0),
            hdl_c: Some(48.0),
            tg: Some(160.0),
            hs_crp: Some(2.1),
            notes: Some("Baseline prior to plan".into()),
        }
    }

    #[test]
    fn test_classify_kind_keywords() {
        assert_eq!(classify_kind("Exercise"), DecisionKind::Exercise);
        assert_eq!(classify_kind("nutrition coaching"), DecisionKind::Nutrition);
        assert_eq!(classify_kind("Medication"), DecisionKind::Medication);
        assert_eq!(classify_kind("Rx adjustment"), DecisionKind::Medication);
        assert_eq!(classify_kind("drug trial"), DecisionKind::Medication);
        assert_eq!(classify_kind("Sleep"), DecisionKind::Exercise);
        assert_eq!(classify_kind(""), DecisionKind::Exercise);
    }

    #[test]
    fn test_decision_date_truncates_timestamps() {
        assert_eq!(
            decision_date("2025-01-30T09:00:00+08:00"),
            Some("2025-01-30".parse().unwrap())
        );
        assert_eq!(
            decision_date("2025-01-30"),
            Some("2025-01-30".parse().unwrap())
        );
        assert_eq!(decision_date("soon"), None);
        assert_eq!(decision_date(""), None);
    }

    #[test]
    fn test_merge_orders_ascending_by_date() {
        let ivs = vec![
            intervention("I0002", "Exercise", "2025-02-01"),
            intervention("I0001", "Nutrition", "2025-01-30"),
        ];
        let dxs = vec![panel("D00", "2025-02-12")];
        let decisions = build_decisions(&ivs, &dxs);
        let ids: Vec<&str> = decisions.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["I0001", "I0002", "D00"]);
    }

    #[test]
    fn test_same_day_ties_keep_source_order() {
        let ivs = vec![
            intervention("I0001", "Exercise", "2025-02-12"),
            intervention("I0002", "Nutrition", "2025-02-12"),
        ];
        let dxs = vec![panel("D00", "2025-02-12")];
        let decisions = build_decisions(&ivs, &dxs);
        let ids: Vec<&str> = decisions.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["I0001", "I0002", "D00"]);
    }

    #[test]
    fn test_unparseable_dates_are_skipped() {
        let ivs = vec![
            intervention("I0001", "Exercise", "when convenient"),
            intervention("I0002", "Exercise", "2025-02-01"),
        ];
        let decisions = build_decisions(&ivs, &[]);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].id, "I0002");
    }

    #[test]
    fn test_diagnostic_gets_synthesized_blocks() {
        let decisions = build_decisions(&[], &[panel("D00", "2025-02-12")]);
        let d = &decisions[0];
        assert_eq!(d.kind, DecisionKind::Diagnostic);
        assert_eq!(d.label, "Baseline prior to plan");
        assert_eq!(
            d.actual.note.as_deref(),
            Some("ApoB 112, LDL-C 132, hsCRP 2.1")
        );
        assert!(d.expected.metrics.contains_key(&MetricId::ApoB));
        assert!(d.expected.metrics.contains_key(&MetricId::LdlC));
        assert!(d.expected.metrics.contains_key(&MetricId::HsCrp));
    }

    #[test]
    fn test_idempotent_for_equal_inputs() {
        let ivs = vec![intervention("I0001", "Exercise", "2025-01-30")];
        let dxs = vec![panel("D00", "2025-02-12")];
        let a = build_decisions(&ivs, &dxs);
        let b = build_decisions(&ivs.clone(), &dxs.clone());
        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            serde_json::to_value(&b).unwrap()
        );
    }

    #[test]
    fn test_filter_by_query_and_owner() {
        let ivs = vec![
            intervention("I0001", "Exercise", "2025-01-30"),
            Intervention {
                owner: Some("Carla (Nutritionist)".into()),
                ..intervention("I0002", "Nutrition", "2025-02-01")
            },
        ];
        let decisions = build_decisions(&ivs, &[]);

        let hits = filter_decisions(&decisions, "nutrition", &[]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "I0002");

        let hits = filter_decisions(&decisions, "", &["rachel".to_string()]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "I0001");

        // Newest first.
        let all = filter_decisions(&decisions, "", &[]);
        assert_eq!(all[0].id, "I0002");
    }

    #[test]
    fn test_owner_name_strips_role_suffix() {
        assert_eq!(owner_name("Rachel (Physiotherapist)"), "Rachel");
        assert_eq!(owner_name("Dr. Warren"), "Dr. Warren");
    }

    #[test]
    fn test_rationale_lookup_and_evidence_join() {
        let rationales = vec![Rationale {
            decision_type: Some("Exercise".into()),
            decision_id: "I0001".into(),
            date: None,
            member_id: None,
            reason_summary: "Improve autonomic tone.".into(),
            evidence_message_ids: vec!["R001".into(), "R999".into()],
        }];
        let rat = find_rationale(&rationales, "i0001").unwrap();
        assert_eq!(rat.reason_summary, "Improve autonomic tone.");

        let chat = vec![Message {
            message_id: "R001".into(),
            timestamp: chrono::DateTime::parse_from_rfc3339("2025-01-29T09:10:00+08:00").unwrap(),
            sender_id: "U_Rachel".into(),
            sender: "Rachel".into(),
            sender_role: "physio".into(),
            receiver_id: "M0001".into(),
            receiver: "Rohan Patel".into(),
            receiver_role: "member".into(),
            topic: None,
            text: "How are sessions feeling?".into(),
        }];
        let evidence = evidence_messages(rat, &chat);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].message_id, "R001");
    }
}
