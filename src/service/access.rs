//! Access gate: participant authorization for every relay operation.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::Conversation;
use crate::error::ChatError;
use crate::persistence::ConversationStore;

/// Authorizes a principal against a conversation.
///
/// Called before any ingest on the one-shot path and before the WebSocket
/// upgrade completes, so conversation existence is never leaked to — and
/// no event is ever relayed toward — an unauthorized listener. Pure check:
/// no side effects.
#[derive(Clone)]
pub struct AccessGate {
    store: Arc<dyn ConversationStore>,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}

impl AccessGate {
    /// Creates a gate over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// Returns the conversation when `principal` is one of its two
    /// participants.
    ///
    /// # Errors
    ///
    /// [`ChatError::NotFound`] when the conversation does not exist,
    /// [`ChatError::Forbidden`] when the principal is not a participant,
    /// [`ChatError::Storage`] when the lookup itself fails.
    pub async fn authorize(
        &self,
        principal: &str,
        conversation_id: Uuid,
    ) -> Result<Conversation, ChatError> {
        let conversation = self.store.get_conversation(conversation_id).await?;
        if !conversation.has_participant(principal) {
            return Err(ChatError::Forbidden);
        }
        Ok(conversation)
    }
}
