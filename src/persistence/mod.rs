//! Persistence layer: durable storage of conversations and messages.
//!
//! [`ConversationStore`] is the port the relay core depends on. The
//! PostgreSQL implementation backs production deployments; the in-memory
//! implementation backs tests and database-less development. The store is
//! the sole authority for message identifiers and `sentAt` timestamps, and
//! its write order is the source of truth for history ordering.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{ChatMessage, Conversation};
use crate::error::ChatError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Durable storage port for conversations and messages.
///
/// Shared process-wide by all sessions and ingest calls; implementations
/// must be safe for concurrent independent use without external locking.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Returns the conversation for the ordered `(client_id, provider_id)`
    /// pair, creating it atomically if absent. The boolean is `true` when
    /// a new record was created by this call.
    ///
    /// Concurrent first-contact calls for the same pair must converge on a
    /// single record; the uniqueness of the pair is enforced here, not by
    /// the caller.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Storage`] on storage failure.
    async fn find_or_create_conversation(
        &self,
        client_id: &str,
        provider_id: &str,
        scheduling_ref: Option<&str>,
    ) -> Result<(Conversation, bool), ChatError>;

    /// Looks up a conversation by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NotFound`] when absent, [`ChatError::Storage`]
    /// on storage failure.
    async fn get_conversation(&self, id: Uuid) -> Result<Conversation, ChatError>;

    /// Lists conversations where `user_id` is a participant, most recently
    /// active first.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Storage`] on storage failure.
    async fn list_conversations_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Conversation>, ChatError>;

    /// Inserts a message, assigning its identifier and `sent_at` timestamp,
    /// and returns the fully-populated record.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Storage`] on storage failure.
    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        text: &str,
    ) -> Result<ChatMessage, ChatError>;

    /// Returns up to `limit` messages of a conversation in chronological
    /// ascending order. When `before` is set, only messages sent strictly
    /// earlier are considered (cursor for paging backwards).
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Storage`] on storage failure.
    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChatMessage>, ChatError>;
}
