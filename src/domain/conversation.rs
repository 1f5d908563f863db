//! Durable conversation record pairing one client and one provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A durable record pairing exactly one client and one provider for
/// message exchange.
///
/// Exactly one conversation exists per ordered `(clientId, providerId)`
/// pair; the persistence layer enforces this with a uniqueness constraint
/// and an atomic insert-if-absent. Conversations are created lazily on
/// first contact and never deleted by the relay.
///
/// `updated_at` is advisory: it is touched on message activity but is not
/// transactionally consistent with message writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Globally unique conversation identifier.
    pub id: Uuid,
    /// Identity of the client participant.
    pub client_id: String,
    /// Identity of the service-provider participant.
    pub provider_id: String,
    /// Optional reference to the scheduling record that prompted the
    /// conversation. Absent round-trips as "not set", never as `""`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub scheduling_ref: Option<String>,
    /// Creation timestamp (assigned by the store).
    pub created_at: DateTime<Utc>,
    /// Last-activity timestamp (advisory).
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Returns `true` if `principal` is one of the two participants.
    #[must_use]
    pub fn has_participant(&self, principal: &str) -> bool {
        self.client_id == principal || self.provider_id == principal
    }
}
