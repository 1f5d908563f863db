//! Message handlers: history page and one-shot send.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{HistoryParams, SendMessageRequest};
use crate::api::principal::Principal;
use crate::app_state::AppState;
use crate::domain::ChatMessage;
use crate::error::{ChatError, ErrorResponse};

/// `GET /conversations/{id}/messages` — authorized history page in
/// chronological ascending order.
///
/// # Errors
///
/// Returns [`ChatError`] when the gate rejects the principal or the
/// storage read fails.
#[utoipa::path(
    get,
    path = "/api/chat/conversations/{id}/messages",
    tag = "Messages",
    summary = "Page through message history",
    description = "Returns up to `limit` messages, ascending by send time. Use `before` to page backwards.",
    params(
        ("id" = Uuid, Path, description = "Conversation identifier"),
        HistoryParams,
    ),
    responses(
        (status = 200, description = "Message page", body = Vec<ChatMessage>),
        (status = 403, description = "Principal is not a participant", body = ErrorResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse),
    )
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    principal: Principal,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ChatError> {
    let limit = params.effective_limit(state.config.message_page_limit);
    let page = state
        .chat_service
        .history(principal.as_str(), conversation_id, limit, params.before)
        .await?;
    Ok(Json(page))
}

/// `POST /conversations/{id}/messages` — one-shot send: gate, ingest,
/// return the created message. Open sessions for the conversation receive
/// it through the ingest publish; this path never subscribes.
///
/// # Errors
///
/// Returns [`ChatError`] on gate rejection, empty text, or storage
/// failure. A broadcast failure is not an error: the message counts as
/// sent once persisted.
#[utoipa::path(
    post,
    path = "/api/chat/conversations/{id}/messages",
    tag = "Messages",
    summary = "Send a message",
    request_body = SendMessageRequest,
    params(
        ("id" = Uuid, Path, description = "Conversation identifier"),
    ),
    responses(
        (status = 201, description = "Message persisted", body = ChatMessage),
        (status = 400, description = "Empty message text", body = ErrorResponse),
        (status = 403, description = "Principal is not a participant", body = ErrorResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse),
        (status = 500, description = "Storage failure; nothing was sent", body = ErrorResponse),
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    principal: Principal,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ChatError> {
    let message = state
        .chat_service
        .send(principal.as_str(), conversation_id, &req.text)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Message routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/conversations/{id}/messages", get(list_messages))
        .route("/conversations/{id}/messages", post(send_message))
}
