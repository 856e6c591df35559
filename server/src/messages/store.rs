//! Message store interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mp_common::{Message, NewMessage, ResponseSubmission};
use thiserror::Error;
use uuid::Uuid;

/// Message store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid message identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("Message not found: {0}")]
    NotFound(Uuid),
    #[error("Message already exists: {0}")]
    AlreadyExists(Uuid),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for messages and their read/response state.
///
/// Each mutating call is a single atomic update of the affected rows; there
/// is no transaction spanning calls, so concurrent writers to the same
/// message race and the last write wins.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Short backend name for health reporting.
    fn backend(&self) -> &'static str;

    /// Generate an identifier for a message that is about to be sent.
    fn new_identifier(&self) -> Uuid {
        Uuid::now_v7()
    }

    /// Persist a message, stamping its creation time.
    async fn create(&self, message: NewMessage) -> Result<Uuid, StoreError>;

    /// Attach (or overwrite) the response of a message, stamping its time.
    async fn attach_response(
        &self,
        message_id: &str,
        response: ResponseSubmission,
    ) -> Result<(), StoreError>;

    /// Mark every unread message of `recipient_id` created at or before
    /// `read_at` as read. Returns the number of messages updated.
    async fn mark_read(&self, recipient_id: &str, read_at: DateTime<Utc>)
        -> Result<u64, StoreError>;

    /// Every stored message. The body may be omitted.
    async fn snapshot(&self) -> Result<Vec<Message>, StoreError>;
}

/// Parse a message identifier as carried in channel callbacks.
pub fn parse_message_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw.trim()).map_err(|_| StoreError::InvalidIdentifier(raw.to_string()))
}
