//! Outbound Messages
//!
//! Builds the customer feedback survey and posts it to the channel's send
//! endpoint.

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use super::events::Participant;
use crate::config::Config;

/// Template type of the satisfaction survey.
pub const CUSTOMER_FEEDBACK_TEMPLATE: &str = "customer_feedback";

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Channel send failures.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Channel rejected message with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Message envelope accepted by the channel's send endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub messaging_type: String,
    pub recipient: Participant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub message: Value,
}

/// Customer feedback survey for one recipient.
///
/// The survey's single question uses `message_id` as its ID, so the
/// feedback that comes back names the message it answers.
pub fn customer_feedback_request(message_id: &str, recipient_id: &str) -> OutboundMessage {
    let message = json!({
        "attachment": {
            "type": "template",
            "payload": {
                "template_type": CUSTOMER_FEEDBACK_TEMPLATE,
                "title": "Rate your recent shopping experience.",
                "subtitle": "Let us know how we are doing by answering two questions",
                "button_title": "Rate Experience",
                "feedback_screens": [{
                    "questions": [{
                        "id": message_id,
                        "type": "csat",
                        "title": "How would you rate your recent shopping experience with us?",
                        "score_label": "neg_pos",
                        "score_option": "five_stars",
                        "follow_up": {
                            "type": "free_form",
                            "placeholder": "Give additional feedback"
                        }
                    }]
                }],
                "business_privacy": {
                    "url": "https://www.example.com"
                }
            }
        }
    });

    OutboundMessage {
        messaging_type: "MESSAGE_TAG".to_string(),
        recipient: Participant {
            id: recipient_id.to_string(),
        },
        tag: Some("CUSTOMER_FEEDBACK".to_string()),
        message,
    }
}

/// HTTP client for the channel's send endpoint.
#[derive(Debug, Clone)]
pub struct ChannelClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl ChannelClient {
    pub fn new(
        endpoint: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, ChannelError> {
        let http = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            access_token: access_token.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ChannelError> {
        Self::new(&config.send_message_endpoint, &config.access_token)
    }

    /// Post a message. Any non-2xx status is a failure.
    ///
    /// Returns the channel's response body.
    pub async fn send(&self, message: &OutboundMessage) -> Result<String, ChannelError> {
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("access_token", self.access_token.as_str())])
            .json(message)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ChannelError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(recipient_id = %message.recipient.id, status = status.as_u16(), "Channel accepted message");
        Ok(body)
    }
}
