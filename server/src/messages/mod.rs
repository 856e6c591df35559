//! Message Store
//!
//! Persistence of sent messages and the read/response state that channel
//! webhooks mutate. Postgres in production, in-memory for development and
//! tests.

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::InMemoryMessageStore;
pub use postgres::PgMessageStore;
pub use store::{parse_message_id, MessageStore, StoreError};
