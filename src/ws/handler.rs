//! Axum WebSocket upgrade handler.
//!
//! Ordering matters here: the access gate runs first, so a denied or
//! unknown conversation is answered with the corresponding HTTP rejection
//! and the transport is never upgraded; then the bus subscription is
//! established, so the session is relay-ready before the upgrade completes
//! and no delivery gap opens before the first inbound frame.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::Response;
use uuid::Uuid;

use crate::api::principal::Principal;
use crate::app_state::AppState;
use crate::error::ChatError;
use crate::ws::ConnectionSession;

/// `GET /api/chat/conversations/{id}/ws` — upgrade to a WebSocket and run
/// the connection session until either side closes.
///
/// # Errors
///
/// [`ChatError::NotFound`] / [`ChatError::Forbidden`] before any upgrade,
/// [`ChatError::Bus`] when the subscription cannot be established.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(conversation_id): Path<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Response, ChatError> {
    let conversation = state
        .chat_service
        .authorize(principal.as_str(), conversation_id)
        .await?;

    let subscription = state.chat_service.subscribe(conversation.id).await?;
    let session = ConnectionSession::new(
        conversation.id,
        principal.into_inner(),
        subscription,
        state.shutdown.child_token(),
    );

    let service = Arc::clone(&state.chat_service);
    Ok(ws.on_upgrade(move |socket| session.run(socket, service)))
}
