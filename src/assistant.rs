//! In-page assistant: a deterministic keyword matcher
//!
//! Pattern-matches a free-text question against a handful of canned
//! answer shapes: "why <decision id>" lookups with chat evidence,
//! HRV/recovery window averages, the latest diagnostic panel, and a
//! fallback transcript search. No NLP, no state, no randomness.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::bundle::Snapshot;
use crate::chat::{simple_search, Message};
use crate::decisions::{decision_date, find_rationale};

/// Maximum chat hits returned by the fallback search.
const MAX_HITS: usize = 6;

/// An assistant reply: text plus optional chat evidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hits: Vec<Message>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Reply {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Parse a "last N days/weeks/months" phrase into a date window ending
/// at `end`. Falls back to the trailing `days_default` days.
pub fn parse_window(query: &str, end: NaiveDate, days_default: u64) -> (NaiveDate, NaiveDate) {
    let q = query.to_lowercase();
    let tokens: Vec<&str> = q.split_whitespace().collect();
    for w in tokens.windows(3) {
        if w[0] != "last" {
            continue;
        }
        let Ok(n) = w[1].parse::<u64>() else { continue };
        let mult = if w[2].starts_with("day") {
            1
        } else if w[2].starts_with("week") {
            7
        } else if w[2].starts_with("month") {
            30
        } else {
            continue;
        };
        return (end - chrono::Days::new(n * mult), end);
    }
    (end - chrono::Days::new(days_default), end)
}

/// Find a decision-id-shaped token in the query: `I` followed by 3-4
/// digits or `D` followed by 2-3 digits, case-insensitive.
fn find_decision_id(query: &str) -> Option<String> {
    for token in query.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = token.chars();
        let Some(head) = chars.next() else { continue };
        let digits = chars.as_str();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let ok = match head.to_ascii_lowercase() {
            'i' => (3..=4).contains(&digits.len()),
            'd' => (2..=3).contains(&digits.len()),
            _ => false,
        };
        if ok {
            return Some(token.to_uppercase());
        }
    }
    None
}

fn fmt_date(d: NaiveDate) -> String {
    d.format("%b %-d, %Y").to_string()
}

fn why_answer(snapshot: &Snapshot, id: &str) -> Reply {
    let ds = &snapshot.dataset;
    let iv_date = ds
        .interventions
        .iter()
        .find(|iv| iv.intervention_id.eq_ignore_ascii_case(id))
        .and_then(|iv| decision_date(&iv.start_at));
    let dx_date = ds
        .diagnostics
        .iter()
        .find(|dx| dx.diagnostic_id.eq_ignore_ascii_case(id))
        .map(|dx| dx.date);

    let Some(date) = iv_date.or(dx_date) else {
        return Reply::text(format!("I couldn't find a decision {id}."));
    };

    let rationale = find_rationale(&ds.rationales, id);
    let reason = rationale
        .map(|r| r.reason_summary.as_str())
        .unwrap_or("No rationale available.");
    Reply {
        text: format!("Decision {id} on {}: {reason}", fmt_date(date)),
        evidence_ids: rationale
            .map(|r| r.evidence_message_ids.clone())
            .unwrap_or_default(),
        hits: Vec::new(),
    }
}

fn wearable_answer(snapshot: &Snapshot, query: &str) -> Reply {
    let series = &snapshot.dataset.wearable_daily;
    let Some(last) = series.last() else {
        return Reply::text("No wearable data yet.");
    };
    let (start, end) = parse_window(query, last.date, 14);
    let in_window: Vec<_> = series
        .iter()
        .filter(|r| r.date >= start && r.date <= end)
        .collect();
    if in_window.is_empty() {
        return Reply::text("No data in that window.");
    }
    let avg = |f: &dyn Fn(&&crate::types::WearableReading) -> Option<f64>| {
        let vals: Vec<f64> = in_window.iter().filter_map(f).collect();
        if vals.is_empty() {
            None
        } else {
            Some(vals.iter().sum::<f64>() / vals.len() as f64)
        }
    };
    let hrv = avg(&|r| r.hrv_ms);
    let rec = avg(&|r| r.recovery_pct);
    Reply::text(format!(
        "From {} to {}: HRV avg {} ms; Recovery avg {}%.",
        fmt_date(start),
        fmt_date(end),
        hrv.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".into()),
        rec.map(|v| format!("{v:.0}")).unwrap_or_else(|| "-".into()),
    ))
}

fn diagnostics_answer(snapshot: &Snapshot) -> Reply {
    let Some(latest) = snapshot.dataset.diagnostics.last() else {
        return Reply::text("No diagnostics yet.");
    };
    let fmt = |v: Option<f64>| v.map(|v| format!("{v}")).unwrap_or_else(|| "-".into());
    Reply::text(format!(
        "Latest panel ({}): ApoB {}, LDL-C {}, hs-CRP {}.",
        fmt_date(latest.date),
        fmt(latest.apo_b),
        fmt(latest.ldl_c),
        fmt(latest.hs_crp),
    ))
}

const HELP: &str = "Ask me about diagnostics, HRV, adherence, travel, or say 'Why I0005?'";
const FALLBACK: &str = "I couldn't find that. Try: 'Why I0005', 'adherence last month', \
'travel last 60 days', or 'latest diagnostics'.";

/// Answer a free-text question against the loaded snapshot.
pub fn answer(query: &str, snapshot: &Snapshot) -> Reply {
    let q = query.trim();
    if q.is_empty() {
        return Reply::text(HELP);
    }
    let lower = q.to_lowercase();

    if lower.contains("why") {
        if let Some(id) = find_decision_id(&lower) {
            return why_answer(snapshot, &id);
        }
    }

    if lower.contains("hrv") || lower.contains("recovery") {
        return wearable_answer(snapshot, &lower);
    }

    if lower.contains("diagnostic")
        || lower.contains("apo")
        || lower.contains("ldl")
        || lower.contains("crp")
    {
        return diagnostics_answer(snapshot);
    }

    let hits: Vec<Message> = simple_search(&snapshot.chat.messages, q)
        .into_iter()
        .take(MAX_HITS)
        .cloned()
        .collect();
    if !hits.is_empty() {
        return Reply {
            text: format!("Here are {} relevant messages:", hits.len()),
            evidence_ids: Vec::new(),
            hits,
        };
    }

    Reply::text(FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_dataset;

    fn snapshot() -> Snapshot {
        Snapshot::new(demo_dataset().unwrap())
    }

    #[test]
    fn test_empty_query_prompts() {
        let reply = answer("", &snapshot());
        assert!(reply.text.contains("Ask me"));
    }

    #[test]
    fn test_why_lookup_returns_rationale_and_evidence() {
        let reply = answer("Why I0005?", &snapshot());
        assert!(reply.text.starts_with("Decision I0005"));
        assert!(reply.text.contains("ARB trial"));
        assert_eq!(reply.evidence_ids, vec!["W001", "W002"]);
    }

    #[test]
    fn test_why_unknown_id() {
        let reply = answer("why I9999", &snapshot());
        assert_eq!(reply.text, "I couldn't find a decision I9999.");
        assert!(reply.evidence_ids.is_empty());
    }

    #[test]
    fn test_hrv_window_average() {
        let reply = answer("hrv last 2 weeks", &snapshot());
        assert!(reply.text.contains("HRV avg"));
        assert!(reply.text.contains("Recovery avg"));
    }

    #[test]
    fn test_diagnostics_answer_uses_latest_panel() {
        let reply = answer("latest diagnostics", &snapshot());
        assert!(reply.text.starts_with("Latest panel"));
        assert!(reply.text.contains("ApoB"));
    }

    #[test]
    fn test_chat_search_fallback_caps_hits() {
        let reply = answer("Rohan", &snapshot());
        assert!(reply.hits.len() <= MAX_HITS);
        assert!(!reply.hits.is_empty());
    }

    #[test]
    fn test_unmatched_query_gets_help() {
        let reply = answer("xyzzy plugh", &snapshot());
        assert!(reply.text.contains("Try:"));
    }

    #[test]
    fn test_parse_window() {
        let end: NaiveDate = "2025-05-01".parse().unwrap();
        let (start, _) = parse_window("hrv last 10 days", end, 14);
        assert_eq!(start, "2025-04-21".parse::<NaiveDate>().unwrap());
        let (start, _) = parse_window("recovery last 2 weeks", end, 14);
        assert_eq!(start, "2025-04-17".parse::<NaiveDate>().unwrap());
        let (start, _) = parse_window("hrv trend", end, 14);
        assert_eq!(start, "2025-04-17".parse::<NaiveDate>().unwrap());
        let (start, _) = parse_window("last 1 month", end, 14);
        assert_eq!(start, "2025-04-01".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn test_find_decision_id_shapes() {
        assert_eq!(find_decision_id("why i0005"), Some("I0005".into()));
        assert_eq!(find_decision_id("why d01"), Some("D01".into()));
        assert_eq!(find_decision_id("why indeed"), None);
        assert_eq!(find_decision_id("i12345 overflow"), None);
    }
}
