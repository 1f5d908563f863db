//! Conversation handlers: list and find-or-create.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::OpenConversationRequest;
use crate::api::principal::Principal;
use crate::app_state::AppState;
use crate::domain::Conversation;
use crate::error::{ChatError, ErrorResponse};

/// `GET /conversations` — list the principal's conversations, most
/// recently active first.
///
/// # Errors
///
/// Returns [`ChatError`] when the listing fails.
#[utoipa::path(
    get,
    path = "/api/chat/conversations",
    tag = "Conversations",
    summary = "List conversations",
    description = "Returns the authenticated principal's conversations ordered by recency, descending.",
    responses(
        (status = 200, description = "Conversation list", body = Vec<Conversation>),
        (status = 401, description = "Missing principal identity", body = ErrorResponse),
    )
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, ChatError> {
    let list = state
        .chat_service
        .conversations_for(principal.as_str(), state.config.conversation_list_limit)
        .await?;
    Ok(Json(list))
}

/// `POST /conversations` — find or lazily create the conversation with a
/// provider. Returns 201 when this call created it, 200 otherwise.
///
/// # Errors
///
/// Returns [`ChatError`] on invalid input or storage failure.
#[utoipa::path(
    post,
    path = "/api/chat/conversations",
    tag = "Conversations",
    summary = "Find or create a conversation",
    description = "The principal is the client side of the pair. Exactly one conversation exists per (client, provider) pair; repeated calls return the same record.",
    request_body = OpenConversationRequest,
    responses(
        (status = 201, description = "Conversation created", body = Conversation),
        (status = 200, description = "Conversation already existed", body = Conversation),
        (status = 400, description = "Missing provider", body = ErrorResponse),
        (status = 401, description = "Missing principal identity", body = ErrorResponse),
    )
)]
pub async fn open_conversation(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<OpenConversationRequest>,
) -> Result<impl IntoResponse, ChatError> {
    let (conversation, created) = state
        .chat_service
        .open_conversation(
            principal.as_str(),
            &req.provider_id,
            req.scheduling_ref.as_deref(),
        )
        .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(conversation)))
}

/// Conversation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/conversations", get(list_conversations))
        .route("/conversations", post(open_conversation))
}
