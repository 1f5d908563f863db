//! In-memory implementation of the persistence layer.
//!
//! Backs database-less development and the test suite. Semantics mirror
//! the PostgreSQL store: identifiers and timestamps are assigned at insert
//! time, the participant pair is unique, and history pages are served
//! most-recent-first internally and returned ascending.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::ConversationStore;
use crate::domain::{ChatMessage, Conversation};
use crate::error::ChatError;

#[derive(Debug, Default)]
struct StoreInner {
    conversations: HashMap<Uuid, Conversation>,
    /// Ordered (client, provider) pair → conversation id.
    pair_index: HashMap<(String, String), Uuid>,
    /// Messages per conversation in insertion order (chronological).
    messages: HashMap<Uuid, Vec<ChatMessage>>,
}

/// In-memory conversation store guarded by a single `RwLock`.
///
/// The lock serializes find-or-create, so concurrent first-contact calls
/// for the same pair converge on one record without a database constraint.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn find_or_create_conversation(
        &self,
        client_id: &str,
        provider_id: &str,
        scheduling_ref: Option<&str>,
    ) -> Result<(Conversation, bool), ChatError> {
        let mut inner = self.inner.write().await;
        let key = (client_id.to_string(), provider_id.to_string());

        if let Some(id) = inner.pair_index.get(&key) {
            let conversation = inner
                .conversations
                .get(id)
                .cloned()
                .ok_or_else(|| ChatError::Storage("pair index out of sync".to_string()))?;
            return Ok((conversation, false));
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            client_id: client_id.to_string(),
            provider_id: provider_id.to_string(),
            scheduling_ref: scheduling_ref.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        inner.pair_index.insert(key, conversation.id);
        inner.conversations.insert(conversation.id, conversation.clone());
        Ok((conversation, true))
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Conversation, ChatError> {
        let inner = self.inner.read().await;
        inner
            .conversations
            .get(&id)
            .cloned()
            .ok_or(ChatError::NotFound(id))
    }

    async fn list_conversations_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Conversation>, ChatError> {
        let inner = self.inner.read().await;
        let mut list: Vec<Conversation> = inner
            .conversations
            .values()
            .filter(|c| c.has_participant(user_id))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        list.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(list)
    }

    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        text: &str,
    ) -> Result<ChatMessage, ChatError> {
        let mut inner = self.inner.write().await;
        if !inner.conversations.contains_key(&conversation_id) {
            return Err(ChatError::Storage(format!(
                "insert into unknown conversation {conversation_id}"
            )));
        }

        let message = ChatMessage {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            sent_at: Utc::now(),
            read: false,
        };
        inner
            .messages
            .entry(conversation_id)
            .or_default()
            .push(message.clone());
        if let Some(conversation) = inner.conversations.get_mut(&conversation_id) {
            conversation.updated_at = message.sent_at;
        }
        Ok(message)
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        let inner = self.inner.read().await;
        let all = inner.messages.get(&conversation_id);
        let Some(all) = all else {
            return Ok(Vec::new());
        };

        let eligible: Vec<ChatMessage> = all
            .iter()
            .filter(|m| before.is_none_or(|cutoff| m.sent_at < cutoff))
            .cloned()
            .collect();

        // Insertion order is chronological; serve the tail of the eligible
        // window, ascending, like the SQL desc-limit-reverse page.
        let limit = usize::try_from(limit).unwrap_or(0);
        let skip = eligible.len().saturating_sub(limit);
        Ok(eligible.into_iter().skip(skip).collect())
    }
}
