//! Conversation request DTOs.

use serde::Deserialize;
use utoipa::ToSchema;

/// Body of `POST /api/chat/conversations`.
///
/// The caller is the client side of the pair; the principal identity from
/// the request supplies `clientId`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenConversationRequest {
    /// Provider to converse with.
    pub provider_id: String,
    /// Optional scheduling record that prompted the conversation.
    #[serde(default)]
    pub scheduling_ref: Option<String>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn scheduling_ref_is_optional() {
        let Ok(req) =
            serde_json::from_str::<OpenConversationRequest>(r#"{"providerId":"p-1"}"#)
        else {
            panic!("parse failed");
        };
        assert_eq!(req.provider_id, "p-1");
        assert_eq!(req.scheduling_ref, None);
    }
}
