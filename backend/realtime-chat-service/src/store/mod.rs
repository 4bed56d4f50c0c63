//! Conversation/message persistence.
//!
//! Everything above this module talks to a [`ChatStore`]; the PostgreSQL
//! implementation backs the running service and [`MemoryStore`] backs the
//! test-suite with the same constraints (canonical pair ordering, unique
//! pair, non-decreasing `created_at`).

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Conversation, ConversationSummary, Message, UserSummary};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unique constraint violated (a concurrent insert won the race)
    #[error("unique constraint violation")]
    UniqueViolation,

    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserSummary>>;

    async fn find_conversation(&self, conversation_id: Uuid) -> StoreResult<Option<Conversation>>;

    /// Lookup by participant pair. Callers pass the canonical ordering.
    async fn find_conversation_by_pair(
        &self,
        user1_id: Uuid,
        user2_id: Uuid,
    ) -> StoreResult<Option<Conversation>>;

    /// Insert a conversation for a canonical pair.
    ///
    /// Fails with [`StoreError::UniqueViolation`] when the pair already exists.
    async fn insert_conversation(&self, user1_id: Uuid, user2_id: Uuid)
        -> StoreResult<Conversation>;

    /// Ids of every user sharing a conversation with `user_id`
    async fn counterpart_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>>;

    async fn list_conversations(&self, user_id: Uuid) -> StoreResult<Vec<ConversationSummary>>;

    /// Persist a message and bump the conversation's `updated_at` to the
    /// message's `created_at` in one atomic step.
    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> StoreResult<Message>;

    /// Messages of a conversation in persistence order
    async fn list_messages(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>>;

    /// Flip `read` to true for unread messages of `conversation_id` not sent
    /// by `reader_id`, restricted to `message_ids` when given.
    ///
    /// Returns the ids that actually changed.
    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        message_ids: Option<&[Uuid]>,
    ) -> StoreResult<Vec<Uuid>>;
}
