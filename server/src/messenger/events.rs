//! Messenger Webhook Events
//!
//! Wire types for the webhook envelope and the sub-events the dispatcher
//! acts on.
//!
//! Every field defaults when absent so that an event carrying none of the
//! known payloads still parses; such events are classified as unhandled
//! rather than rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Webhook payload parse errors.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Top-level webhook envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub object: String,
    #[serde(default, rename = "entry")]
    pub entries: Vec<EventEntry>,
}

/// One page entry of the envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub messaging: Vec<MessageEvent>,
}

/// A single messaging event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub sender: Participant,
    #[serde(default)]
    pub recipient: Participant,
    #[serde(default)]
    pub timestamp: i64,
    pub message: Option<ReceivedMessage>,
    pub read: Option<Read>,
    #[serde(rename = "messaging_feedback")]
    pub feedback: Option<Feedback>,
}

/// Sender or recipient of an event (channel-scoped ID).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub id: String,
}

/// An inbound text message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceivedMessage {
    #[serde(default)]
    pub mid: String,
    #[serde(default)]
    pub seq: i64,
    #[serde(default)]
    pub text: String,
}

/// Read receipt: everything sent before `watermark` (epoch ms) was seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Read {
    #[serde(default)]
    pub watermark: i64,
}

/// Feedback submitted through a customer feedback template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub feedback_screens: Vec<FeedbackScreen>,
}

/// One screen of a feedback form; questions are keyed by question ID.
///
/// Questions decode into an ordered map so question selection does not
/// depend on hash iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackScreen {
    #[serde(default)]
    pub screen_id: i64,
    #[serde(default)]
    pub questions: BTreeMap<String, FeedbackQuestion>,
}

/// Answer to a feedback question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackQuestion {
    #[serde(default)]
    pub payload: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    pub follow_up: Option<FeedbackFollowUp>,
}

/// Free-form follow-up to a feedback question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackFollowUp {
    #[serde(default)]
    pub payload: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// A classified unit of work extracted from a webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubEvent {
    Read { sender_id: String, read: Read },
    Feedback { sender_id: String, feedback: Feedback },
}

impl SubEvent {
    /// Classify a messaging event. Read receipts take precedence over
    /// feedback; events with neither are unhandled (`None`).
    pub fn classify(event: MessageEvent) -> Option<Self> {
        let sender_id = event.sender.id;
        if let Some(read) = event.read {
            Some(Self::Read { sender_id, read })
        } else {
            event
                .feedback
                .map(|feedback| Self::Feedback { sender_id, feedback })
        }
    }

    /// Short kind label for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Feedback { .. } => "feedback",
        }
    }

    pub fn sender_id(&self) -> &str {
        match self {
            Self::Read { sender_id, .. } | Self::Feedback { sender_id, .. } => sender_id,
        }
    }
}

impl Event {
    /// Flatten all entries' messaging events, preserving payload order.
    pub fn into_message_events(self) -> Vec<MessageEvent> {
        self.entries
            .into_iter()
            .flat_map(|entry| entry.messaging)
            .collect()
    }
}

/// Decode a raw webhook body into its ordered messaging events.
pub fn parse_events(raw: &[u8]) -> Result<Vec<MessageEvent>, ParseError> {
    let event: Event = serde_json::from_slice(raw)?;
    Ok(event.into_message_events())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn to_bytes(value: &serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn flattens_entries_in_order() {
        let payload = json!({
            "object": "page",
            "entry": [
                {"id": "p1", "time": 1, "messaging": [
                    {"sender": {"id": "a"}, "read": {"watermark": 1}},
                    {"sender": {"id": "b"}, "message": {"mid": "m", "text": "hi"}}
                ]},
                {"id": "p2", "time": 2, "messaging": []},
                {"id": "p3", "time": 3, "messaging": [
                    {"sender": {"id": "c"}}
                ]}
            ]
        });

        let events = parse_events(&to_bytes(&payload)).unwrap();
        let senders: Vec<_> = events.iter().map(|e| e.sender.id.as_str()).collect();
        assert_eq!(senders, ["a", "b", "c"]);
    }

    #[test]
    fn flattened_length_is_sum_of_messaging_lengths() {
        let sizes = [0usize, 3, 1, 5];
        let entries: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                json!({
                    "id": i.to_string(),
                    "messaging": (0..n)
                        .map(|j| json!({"sender": {"id": format!("{i}-{j}")}, "timestamp": j}))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let events = parse_events(&to_bytes(&json!({"entry": entries}))).unwrap();
        assert_eq!(events.len(), sizes.iter().sum::<usize>());
        assert_eq!(events[0].sender.id, "1-0");
        assert_eq!(events[3].sender.id, "2-0");
        assert_eq!(events[8].sender.id, "3-4");
    }

    #[test]
    fn rejects_structural_errors() {
        assert!(parse_events(b"not json").is_err());
        assert!(parse_events(br#"{"entry": {"messaging": []}}"#).is_err());
        assert!(parse_events(br#"{"entry": [{"messaging": [{"read": {"watermark": "x"}}]}]}"#).is_err());
    }

    #[test]
    fn empty_envelope_has_no_events() {
        assert!(parse_events(b"{}").unwrap().is_empty());
    }

    #[test]
    fn decodes_feedback_payload() {
        let payload = json!({"entry": [{"messaging": [{
            "sender": {"id": "psid"},
            "recipient": {"id": "page"},
            "timestamp": 1_700_000_000_000_i64,
            "messaging_feedback": {"feedback_screens": [{
                "screen_id": 0,
                "questions": {
                    "q-1": {
                        "type": "csat",
                        "payload": "4",
                        "follow_up": {"type": "free_form", "payload": "Good service"}
                    }
                }
            }]}
        }]}]});

        let events = parse_events(&to_bytes(&payload)).unwrap();
        let feedback = events[0].feedback.as_ref().unwrap();
        let question = &feedback.feedback_screens[0].questions["q-1"];
        assert_eq!(question.payload, "4");
        assert_eq!(question.kind, "csat");
        assert_eq!(question.follow_up.as_ref().unwrap().payload, "Good service");
    }

    #[test]
    fn classify_prefers_read_over_feedback() {
        let event = MessageEvent {
            sender: Participant { id: "s".into() },
            read: Some(Read { watermark: 5 }),
            feedback: Some(Feedback::default()),
            ..MessageEvent::default()
        };
        assert_eq!(
            SubEvent::classify(event),
            Some(SubEvent::Read {
                sender_id: "s".into(),
                read: Read { watermark: 5 }
            })
        );
    }

    #[test]
    fn classify_ignores_text_only_and_empty_events() {
        let text = MessageEvent {
            message: Some(ReceivedMessage {
                text: "hello".into(),
                ..ReceivedMessage::default()
            }),
            ..MessageEvent::default()
        };
        assert_eq!(SubEvent::classify(text), None);
        assert_eq!(SubEvent::classify(MessageEvent::default()), None);
    }

    #[test]
    fn classify_feedback() {
        let event = MessageEvent {
            sender: Participant { id: "s".into() },
            feedback: Some(Feedback::default()),
            ..MessageEvent::default()
        };
        let sub = SubEvent::classify(event).unwrap();
        assert_eq!(sub.kind(), "feedback");
        assert_eq!(sub.sender_id(), "s");
    }
}
