//! PostgreSQL implementation of the persistence layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::ConversationStore;
use crate::domain::{ChatMessage, Conversation};
use crate::error::ChatError;

type ConversationRow = (
    Uuid,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

type MessageRow = (Uuid, Uuid, String, String, DateTime<Utc>, bool);

/// PostgreSQL-backed conversation store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn conversation_from_row(row: ConversationRow) -> Conversation {
    let (id, client_id, provider_id, scheduling_ref, created_at, updated_at) = row;
    Conversation {
        id,
        client_id,
        provider_id,
        scheduling_ref,
        created_at,
        updated_at,
    }
}

fn message_from_row(row: MessageRow) -> ChatMessage {
    let (id, conversation_id, sender_id, text, sent_at, read) = row;
    ChatMessage {
        id,
        conversation_id,
        sender_id,
        text,
        sent_at,
        read,
    }
}

#[async_trait]
impl ConversationStore for PostgresStore {
    async fn find_or_create_conversation(
        &self,
        client_id: &str,
        provider_id: &str,
        scheduling_ref: Option<&str>,
    ) -> Result<(Conversation, bool), ChatError> {
        // Atomic insert-if-absent on the pair constraint. RETURNING yields
        // a row only when this call created the record; concurrent
        // first-contact callers converge on the existing one via the
        // fallback SELECT.
        let inserted = sqlx::query_as::<_, ConversationRow>(
            "INSERT INTO conversations (client_id, provider_id, scheduling_ref) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (client_id, provider_id) DO NOTHING \
             RETURNING id, client_id, provider_id, scheduling_ref, created_at, updated_at",
        )
        .bind(client_id)
        .bind(provider_id)
        .bind(scheduling_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChatError::Storage(e.to_string()))?;

        if let Some(row) = inserted {
            return Ok((conversation_from_row(row), true));
        }

        let existing = sqlx::query_as::<_, ConversationRow>(
            "SELECT id, client_id, provider_id, scheduling_ref, created_at, updated_at \
             FROM conversations WHERE client_id = $1 AND provider_id = $2",
        )
        .bind(client_id)
        .bind(provider_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ChatError::Storage(e.to_string()))?;

        Ok((conversation_from_row(existing), false))
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Conversation, ChatError> {
        let row = sqlx::query_as::<_, ConversationRow>(
            "SELECT id, client_id, provider_id, scheduling_ref, created_at, updated_at \
             FROM conversations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChatError::Storage(e.to_string()))?;

        row.map(conversation_from_row).ok_or(ChatError::NotFound(id))
    }

    async fn list_conversations_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Conversation>, ChatError> {
        let rows = sqlx::query_as::<_, ConversationRow>(
            "SELECT id, client_id, provider_id, scheduling_ref, created_at, updated_at \
             FROM conversations WHERE client_id = $1 OR provider_id = $1 \
             ORDER BY updated_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChatError::Storage(e.to_string()))?;

        Ok(rows.into_iter().map(conversation_from_row).collect())
    }

    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        text: &str,
    ) -> Result<ChatMessage, ChatError> {
        let row = sqlx::query_as::<_, MessageRow>(
            "INSERT INTO messages (conversation_id, sender_id, text) \
             VALUES ($1, $2, $3) \
             RETURNING id, conversation_id, sender_id, text, sent_at, read",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ChatError::Storage(e.to_string()))?;

        // Advisory last-activity touch; history correctness never depends
        // on it, so a failure here only gets a debug log.
        if let Err(err) = sqlx::query("UPDATE conversations SET updated_at = now() WHERE id = $1")
            .bind(conversation_id)
            .execute(&self.pool)
            .await
        {
            tracing::debug!(%conversation_id, error = %err, "updated_at touch failed");
        }

        Ok(message_from_row(row))
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        // Most-recent page first, then reversed so the caller always sees
        // chronological ascending order.
        let rows = if let Some(before) = before {
            sqlx::query_as::<_, MessageRow>(
                "SELECT id, conversation_id, sender_id, text, sent_at, read \
                 FROM messages WHERE conversation_id = $1 AND sent_at < $2 \
                 ORDER BY sent_at DESC LIMIT $3",
            )
            .bind(conversation_id)
            .bind(before)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, MessageRow>(
                "SELECT id, conversation_id, sender_id, text, sent_at, read \
                 FROM messages WHERE conversation_id = $1 \
                 ORDER BY sent_at DESC LIMIT $2",
            )
            .bind(conversation_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| ChatError::Storage(e.to_string()))?;

        let mut messages: Vec<ChatMessage> = rows.into_iter().map(message_from_row).collect();
        messages.reverse();
        Ok(messages)
    }
}
