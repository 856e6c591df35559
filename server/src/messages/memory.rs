//! In-memory message store.
//!
//! Same semantics as the Postgres store; used when no database is
//! configured and by tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mp_common::{Message, NewMessage, ResponseSubmission};
use uuid::Uuid;

use super::store::{parse_message_id, MessageStore, StoreError};

/// Message store held in a concurrent map keyed by message ID.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: DashMap<Uuid, Message>,
}

impl InMemoryMessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed message, replacing any message with the same ID.
    pub fn insert(&self, message: Message) {
        self.messages.insert(message.id, message);
    }

    /// Look up a message by ID.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Message> {
        self.messages.get(&id).map(|m| m.value().clone())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, message: NewMessage) -> Result<Uuid, StoreError> {
        match self.messages.entry(message.id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(message.id)),
            Entry::Vacant(slot) => {
                let id = message.id;
                slot.insert(message.into_message(Utc::now()));
                Ok(id)
            }
        }
    }

    async fn attach_response(
        &self,
        message_id: &str,
        response: ResponseSubmission,
    ) -> Result<(), StoreError> {
        let id = parse_message_id(message_id)?;
        let mut message = self.messages.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        message.response = Some(response.into_response(Utc::now()));
        Ok(())
    }

    async fn mark_read(
        &self,
        recipient_id: &str,
        read_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut updated = 0;
        for mut message in self.messages.iter_mut() {
            if message.recipient_id == recipient_id
                && message.read_at.is_none()
                && message.created_at <= read_at
            {
                message.read_at = Some(read_at);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn snapshot(&self) -> Result<Vec<Message>, StoreError> {
        Ok(self.messages.iter().map(|m| m.value().clone()).collect())
    }
}
