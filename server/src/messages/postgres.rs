//! Postgres message store.
//!
//! Uses runtime queries (`sqlx::query` / `sqlx::query_as`) to avoid
//! requiring a live database at compile time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mp_common::{Channel, Message, MessageResponse, NewMessage, ResponseSubmission};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::store::{parse_message_id, MessageStore, StoreError};

/// Message store backed by the `messages` table.
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row shape of the analytics projection (no body).
#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    channel: String,
    recipient_id: String,
    template_type: String,
    response: Option<Json<MessageResponse>>,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let channel = Channel::parse_str(&row.channel).ok_or_else(|| {
            StoreError::Database(sqlx::Error::Decode(
                format!("unknown channel {:?} on message {}", row.channel, row.id).into(),
            ))
        })?;

        Ok(Self {
            id: row.id,
            channel,
            recipient_id: row.recipient_id,
            template_type: row.template_type,
            body: serde_json::Value::Null,
            response: row.response.map(|r| r.0),
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn create(&self, message: NewMessage) -> Result<Uuid, StoreError> {
        let result = sqlx::query(
            r"
            INSERT INTO messages (id, channel, recipient_id, template_type, body, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(message.id)
        .bind(message.channel.as_str())
        .bind(&message.recipient_id)
        .bind(&message.template_type)
        .bind(Json(&message.body))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(message.id));
        }

        Ok(message.id)
    }

    async fn attach_response(
        &self,
        message_id: &str,
        response: ResponseSubmission,
    ) -> Result<(), StoreError> {
        let id = parse_message_id(message_id)?;
        let response = response.into_response(Utc::now());

        let result = sqlx::query("UPDATE messages SET response = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(&response))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }

    async fn mark_read(
        &self,
        recipient_id: &str,
        read_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE messages
            SET read_at = $2
            WHERE recipient_id = $1
              AND read_at IS NULL
              AND created_at <= $2
            ",
        )
        .bind(recipient_id)
        .bind(read_at)
        .execute(&self.pool)
        .await?;

        debug!(
            recipient_id,
            updated = result.rows_affected(),
            "Marked messages as read"
        );
        Ok(result.rows_affected())
    }

    async fn snapshot(&self) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r"
            SELECT id, channel, recipient_id, template_type,
                   response, read_at, created_at
            FROM messages
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }
}
