//! Message Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messaging channel a message was delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Facebook Messenger (Graph API send + webhook callbacks).
    #[serde(rename = "fbmessenger")]
    FbMessenger,
}

impl Channel {
    /// Parse from the stored string form (e.g., `"fbmessenger"`).
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "fbmessenger" => Some(Self::FbMessenger),
            _ => None,
        }
    }

    /// Convert to the stored string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FbMessenger => "fbmessenger",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message sent to a recipient, together with its read and response state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message ID (also used as the feedback question ID).
    pub id: Uuid,
    /// Channel the message went out on.
    pub channel: Channel,
    /// Channel-scoped recipient ID.
    #[serde(rename = "recipientID")]
    pub recipient_id: String,
    /// Template used to build the message (e.g., `customer_feedback`).
    pub template_type: String,
    /// Message body as sent to the channel.
    pub body: serde_json::Value,
    /// Recipient's reply, if any.
    pub response: Option<MessageResponse>,
    /// When the recipient read the message (`None` while unread).
    pub read_at: Option<DateTime<Utc>>,
    /// When the message was persisted.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Whether a read receipt has covered this message.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// A recipient's reply to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    /// Satisfaction score, when the reply carried one.
    pub score: Option<MessageResponseScore>,
    /// Free-text commentary.
    pub text: String,
    /// When the response was attached.
    pub created_at: DateTime<Utc>,
}

/// Score out of a range, e.g. 4 of 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponseScore {
    pub value: i32,
    pub range: i32,
}

impl MessageResponseScore {
    /// `value / range` as a real number, or `None` if the range is not positive.
    #[must_use]
    pub fn ratio(&self) -> Option<f64> {
        (self.range > 0).then(|| f64::from(self.value) / f64::from(self.range))
    }
}

/// A response as submitted by a handler, before the store timestamps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSubmission {
    pub text: String,
    pub score: Option<MessageResponseScore>,
}

impl ResponseSubmission {
    /// Stamp the submission with the time it was attached.
    #[must_use]
    pub fn into_response(self, created_at: DateTime<Utc>) -> MessageResponse {
        MessageResponse {
            score: self.score,
            text: self.text,
            created_at,
        }
    }
}

/// A message ready to be persisted; the store assigns `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub id: Uuid,
    pub channel: Channel,
    pub recipient_id: String,
    pub template_type: String,
    pub body: serde_json::Value,
}

impl NewMessage {
    /// Build the stored message, unread and without a response.
    #[must_use]
    pub fn into_message(self, created_at: DateTime<Utc>) -> Message {
        Message {
            id: self.id,
            channel: self.channel,
            recipient_id: self.recipient_id,
            template_type: self.template_type,
            body: self.body,
            response: None,
            read_at: None,
            created_at,
        }
    }
}
