//! Messenger HTTP Types
//!
//! Request/response bodies of the messenger endpoints and their error
//! mapping.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use super::events::ParseError;
use super::send::{ChannelError, CUSTOMER_FEEDBACK_TEMPLATE};
use super::signing::SignatureError;
use crate::messages::StoreError;

/// Query of the webhook verification handshake.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    pub mode: String,
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: String,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: String,
}

impl VerifyParams {
    /// A subscribe request presenting the expected token.
    pub fn is_valid(&self, verify_token: &str) -> bool {
        self.mode == "subscribe" && self.verify_token == verify_token
    }
}

/// Request to send a survey to a recipient.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendMessageRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "missing recipient id"))]
    pub recipient_id: String,
    #[serde(default)]
    pub template_type: String,
    /// Accepted for compatibility; the survey content is fixed.
    #[serde(default)]
    pub payload: Option<String>,
}

impl SendMessageRequest {
    /// Field validation plus the supported template check.
    pub fn check(&self) -> Result<(), MessengerError> {
        self.validate()
            .map_err(|e| MessengerError::InvalidRequest(e.to_string()))?;

        if self.template_type != CUSTOMER_FEEDBACK_TEMPLATE {
            return Err(MessengerError::InvalidRequest(format!(
                "unsupported template type {:?}",
                self.template_type
            )));
        }
        Ok(())
    }
}

/// Response of a successful send.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub id: String,
}

/// Messenger endpoint errors.
#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("Unauthorized webhook: {0}")]
    Signature(#[from] SignatureError),
    #[error("Bad webhook payload: {0}")]
    Parse(#[from] ParseError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid verification token")]
    VerificationFailed,
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for MessengerError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            Self::Signature(e) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", e.to_string()),
            Self::Parse(_) => (
                StatusCode::BAD_REQUEST,
                "MALFORMED_PAYLOAD",
                "Webhook payload is not a valid event".to_string(),
            ),
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            Self::VerificationFailed => (
                StatusCode::FORBIDDEN,
                "VERIFICATION_FAILED",
                "Invalid verification token".to_string(),
            ),
            Self::Channel(e) => {
                tracing::error!("Channel send failed: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "CHANNEL_ERROR",
                    "Failed to send message".to_string(),
                )
            }
            Self::Store(e) => {
                tracing::error!("Store error in messenger: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(serde_json::json!({ "error": code, "message": message })),
        )
            .into_response()
    }
}
