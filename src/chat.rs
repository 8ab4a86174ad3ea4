//! Chat transcript normalization
//!
//! Uploaded chat logs arrive in two shapes: the current two-party form
//! (explicit sender and receiver) and a legacy form carrying only a
//! `role`/`member_id` hint plus a sender name. Records are classified
//! into one of the known shapes once, at the loading boundary; anything
//! that fits neither is rejected and counted rather than guessed at.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::types::Member;

/// Canonical two-party chat message. Everything downstream (evidence
/// lookup, roster, search) works on this shape only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub timestamp: DateTime<FixedOffset>,
    pub sender_id: String,
    pub sender: String,
    pub sender_role: String,
    pub receiver_id: String,
    pub receiver: String,
    pub receiver_role: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub text: String,
}

/// A chat record as it appears on the wire, before shape classification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawChatRecord {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub sender_role: Option<String>,
    #[serde(default)]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub receiver_role: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    // Legacy-shape hints.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub member_id: Option<String>,
}

/// The known record shapes a raw record can classify into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawShape {
    /// Already two-party: both endpoints fully identified.
    Full,
    /// Legacy member-authored line; the member side is synthesized.
    LegacyMember,
    /// Legacy team-authored line; the member is the implied receiver.
    LegacyTeam,
}

/// A record that fit no known shape, with the index it had in the input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub index: usize,
    pub reason: String,
}

/// Result of normalizing a chat upload: canonical messages sorted by
/// timestamp, plus the records that were rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatNormalization {
    pub messages: Vec<Message>,
    pub rejected: Vec<RejectedRecord>,
}

fn classify(raw: &RawChatRecord, member: &Member) -> Option<RawShape> {
    if raw.sender_id.is_some()
        && raw.receiver_id.is_some()
        && raw.sender.is_some()
        && raw.receiver.is_some()
    {
        return Some(RawShape::Full);
    }
    let is_member = raw
        .role
        .as_deref()
        .map(|r| r.eq_ignore_ascii_case("member"))
        .unwrap_or(false)
        || raw.member_id.as_deref() == Some(member.member_id.as_str())
        || raw.sender.as_deref() == Some(member.preferred_name.as_str());
    if is_member {
        return Some(RawShape::LegacyMember);
    }
    if raw.sender.is_some() || raw.sender_id.is_some() {
        return Some(RawShape::LegacyTeam);
    }
    None
}

fn normalize_record(raw: &RawChatRecord, member: &Member) -> Result<Message, String> {
    let message_id = raw
        .message_id
        .clone()
        .ok_or_else(|| "missing message_id".to_string())?;
    let timestamp = raw.timestamp.ok_or_else(|| "missing timestamp".to_string())?;
    let text = raw.text.clone().ok_or_else(|| "missing text".to_string())?;

    let shape = classify(raw, member).ok_or_else(|| "no sender identification".to_string())?;

    let msg = match shape {
        RawShape::Full => Message {
            message_id,
            timestamp,
            sender_id: raw.sender_id.clone().unwrap_or_default(),
            sender: raw.sender.clone().unwrap_or_default(),
            sender_role: raw.sender_role.clone().unwrap_or_else(|| "team".into()),
            receiver_id: raw.receiver_id.clone().unwrap_or_default(),
            receiver: raw.receiver.clone().unwrap_or_default(),
            receiver_role: raw.receiver_role.clone().unwrap_or_else(|| "team".into()),
            topic: raw.topic.clone(),
            text,
        },
        RawShape::LegacyMember => {
            // A member line with no counterparty cannot be threaded.
            let receiver_id = raw
                .receiver_id
                .clone()
                .ok_or_else(|| "member record without receiver".to_string())?;
            let receiver = raw
                .receiver
                .clone()
                .ok_or_else(|| "member record without receiver".to_string())?;
            Message {
                message_id,
                timestamp,
                sender_id: member.member_id.clone(),
                sender: member.preferred_name.clone(),
                sender_role: "member".into(),
                receiver_id,
                receiver,
                receiver_role: raw.receiver_role.clone().unwrap_or_else(|| "team".into()),
                topic: raw.topic.clone(),
                text,
            }
        }
        RawShape::LegacyTeam => {
            let sender = raw.sender.clone().unwrap_or_else(|| "Unknown".into());
            Message {
                message_id,
                timestamp,
                sender_id: raw
                    .sender_id
                    .clone()
                    .unwrap_or_else(|| format!("U_{}", sender.replace(' ', "_"))),
                sender_role: raw
                    .sender_role
                    .clone()
                    .or_else(|| raw.role.clone())
                    .unwrap_or_else(|| "team".into()),
                sender,
                receiver_id: raw
                    .receiver_id
                    .clone()
                    .unwrap_or_else(|| member.member_id.clone()),
                receiver: raw
                    .receiver
                    .clone()
                    .unwrap_or_else(|| member.preferred_name.clone()),
                receiver_role: raw
                    .receiver_role
                    .clone()
                    .unwrap_or_else(|| "member".into()),
                topic: raw.topic.clone(),
                text,
            }
        }
    };
    Ok(msg)
}

/// Normalize a batch of raw chat records into canonical messages sorted
/// ascending by timestamp. Records that fit no known shape are returned
/// in `rejected` with their input index.
pub fn normalize_chat(records: &[RawChatRecord], member: &Member) -> ChatNormalization {
    let mut out = ChatNormalization::default();
    for (index, raw) in records.iter().enumerate() {
        match normalize_record(raw, member) {
            Ok(msg) => out.messages.push(msg),
            Err(reason) => out.rejected.push(RejectedRecord { index, reason }),
        }
    }
    out.messages.sort_by_key(|m| m.timestamp);
    out
}

/// Whether a normalized message was authored by the member.
pub fn is_member_message(msg: &Message, member: &Member) -> bool {
    let first = member
        .preferred_name
        .split_whitespace()
        .next()
        .unwrap_or(member.preferred_name.as_str());
    msg.sender_role.eq_ignore_ascii_case("member")
        || msg.sender_id == member.member_id
        || msg.sender == member.preferred_name
        || msg.sender == first
}

/// A non-member chat participant derived from the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    pub id: String,
    pub name: String,
    pub role: String,
}

/// Unique non-member participants in first-appearance order.
pub fn roster(messages: &[Message], member_id: &str) -> Vec<Peer> {
    let mut peers: Vec<Peer> = Vec::new();
    for m in messages {
        let (id, name, role) = if m.sender_id != member_id {
            (&m.sender_id, &m.sender, &m.sender_role)
        } else {
            (&m.receiver_id, &m.receiver, &m.receiver_role)
        };
        if id == member_id {
            continue;
        }
        if !peers.iter().any(|p| &p.id == id) {
            peers.push(Peer {
                id: id.clone(),
                name: name.clone(),
                role: role.clone(),
            });
        }
    }
    peers
}

/// Case-insensitive substring search over text, topic, and sender name.
pub fn simple_search<'a>(messages: &'a [Message], query: &str) -> Vec<&'a Message> {
    let q = query.to_lowercase();
    messages
        .iter()
        .filter(|m| {
            m.text.to_lowercase().contains(&q)
                || m.topic
                    .as_deref()
                    .map(|t| t.to_lowercase().contains(&q))
                    .unwrap_or(false)
                || m.sender.to_lowercase().contains(&q)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> Member {
        Member {
            member_id: "M0001".into(),
            preferred_name: "Rohan Patel".into(),
            dob: None,
            age: Some(46),
            gender: Default::default(),
            primary_residence: None,
            travel_hubs: vec![],
            occupation: None,
            assistant: None,
            chronic_condition: None,
            wearables: vec![],
        }
    }

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn full_record(id: &str, at: &str) -> RawChatRecord {
        RawChatRecord {
            message_id: Some(id.into()),
            timestamp: Some(ts(at)),
            sender_id: Some("U_Rachel".into()),
            sender: Some("Rachel".into()),
            sender_role: Some("physio".into()),
            receiver_id: Some("M0001".into()),
            receiver: Some("Rohan Patel".into()),
            receiver_role: Some("member".into()),
            topic: Some("Kickoff cardio plan".into()),
            text: Some("How are Zone 2 sessions feeling?".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_full_shape_passes_through() {
        let norm = normalize_chat(&[full_record("R001", "2025-01-29T09:10:00+08:00")], &member());
        assert_eq!(norm.rejected.len(), 0);
        assert_eq!(norm.messages.len(), 1);
        assert_eq!(norm.messages[0].sender_id, "U_Rachel");
        assert_eq!(norm.messages[0].receiver_role, "member");
    }

    #[test]
    fn test_legacy_member_shape_synthesizes_sender() {
        let raw = RawChatRecord {
            message_id: Some("L001".into()),
            timestamp: Some(ts("2025-02-01T10:00:00+08:00")),
            role: Some("member".into()),
            receiver_id: Some("U_Carla".into()),
            receiver: Some("Carla".into()),
            receiver_role: Some("nutrition".into()),
            text: Some("Starting today.".into()),
            ..Default::default()
        };
        let norm = normalize_chat(&[raw], &member());
        assert_eq!(norm.rejected.len(), 0);
        let m = &norm.messages[0];
        assert_eq!(m.sender_id, "M0001");
        assert_eq!(m.sender, "Rohan Patel");
        assert_eq!(m.sender_role, "member");
    }

    #[test]
    fn test_legacy_member_without_receiver_is_rejected() {
        let raw = RawChatRecord {
            message_id: Some("L002".into()),
            timestamp: Some(ts("2025-02-01T10:00:00+08:00")),
            role: Some("member".into()),
            text: Some("orphaned line".into()),
            ..Default::default()
        };
        let norm = normalize_chat(&[raw], &member());
        assert_eq!(norm.messages.len(), 0);
        assert_eq!(norm.rejected.len(), 1);
        assert_eq!(norm.rejected[0].index, 0);
    }

    #[test]
    fn test_legacy_team_shape_fills_member_receiver() {
        let raw = RawChatRecord {
            message_id: Some("L003".into()),
            timestamp: Some(ts("2025-02-02T10:00:00+08:00")),
            sender: Some("Carla".into()),
            role: Some("nutrition".into()),
            text: Some("Add 2g EPA+DHA.".into()),
            ..Default::default()
        };
        let norm = normalize_chat(&[raw], &member());
        let m = &norm.messages[0];
        assert_eq!(m.sender_id, "U_Carla");
        assert_eq!(m.sender_role, "nutrition");
        assert_eq!(m.receiver_id, "M0001");
        assert_eq!(m.receiver_role, "member");
    }

    #[test]
    fn test_unidentifiable_record_is_rejected_not_guessed() {
        let raw = RawChatRecord {
            message_id: Some("X001".into()),
            timestamp: Some(ts("2025-02-02T10:00:00+08:00")),
            text: Some("who sent this?".into()),
            ..Default::default()
        };
        let norm = normalize_chat(&[raw], &member());
        assert_eq!(norm.messages.len(), 0);
        assert_eq!(norm.rejected.len(), 1);
    }

    #[test]
    fn test_messages_sorted_by_timestamp() {
        let norm = normalize_chat(
            &[
                full_record("B", "2025-01-30T09:00:00+08:00"),
                full_record("A", "2025-01-29T09:00:00+08:00"),
            ],
            &member(),
        );
        assert_eq!(norm.messages[0].message_id, "A");
        assert_eq!(norm.messages[1].message_id, "B");
    }

    #[test]
    fn test_roster_unique_peers() {
        let mut second = full_record("R002", "2025-01-29T09:12:00+08:00");
        second.sender_id = Some("M0001".into());
        second.sender = Some("Rohan Patel".into());
        second.sender_role = Some("member".into());
        second.receiver_id = Some("U_Rachel".into());
        second.receiver = Some("Rachel".into());
        second.receiver_role = Some("physio".into());

        let norm = normalize_chat(
            &[full_record("R001", "2025-01-29T09:10:00+08:00"), second],
            &member(),
        );
        let peers = roster(&norm.messages, "M0001");
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].name, "Rachel");
        assert_eq!(peers[0].role, "physio");
    }

    #[test]
    fn test_simple_search_is_case_insensitive() {
        let norm = normalize_chat(&[full_record("R001", "2025-01-29T09:10:00+08:00")], &member());
        assert_eq!(simple_search(&norm.messages, "zone 2").len(), 1);
        assert_eq!(simple_search(&norm.messages, "rachel").len(), 1);
        assert_eq!(simple_search(&norm.messages, "losartan").len(), 0);
    }

    #[test]
    fn test_is_member_message() {
        let norm = normalize_chat(&[full_record("R001", "2025-01-29T09:10:00+08:00")], &member());
        assert!(!is_member_message(&norm.messages[0], &member()));
    }
}
