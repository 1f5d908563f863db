//! Durable text message belonging to one conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A single durable text unit belonging to one conversation and
/// attributable to one participant.
///
/// `id` and `sent_at` are assigned by the persistence layer at insert
/// time, never by the client. The same serialized form travels over the
/// broadcast bus and down every WebSocket, so a relayed message always
/// carries its durable identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Message identifier, assigned at persistence time.
    pub id: Uuid,
    /// Owning conversation.
    pub conversation_id: Uuid,
    /// Authenticated identity of the sender; always one of the owning
    /// conversation's two participants.
    pub sender_id: String,
    /// Message text, stored untrimmed. Never empty.
    pub text: String,
    /// Server-side insert timestamp.
    pub sent_at: DateTime<Utc>,
    /// Read flag; defaults to `false`. Set by a separate mutation that is
    /// not part of the relay.
    #[serde(default)]
    pub read: bool,
}
