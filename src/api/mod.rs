//! REST API layer: principal extraction, DTOs, handlers, and router
//! composition.
//!
//! All endpoints are mounted under `/api/chat`.

pub mod dto;
pub mod handlers;
pub mod principal;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new().nest("/api/chat", handlers::routes())
}

/// OpenAPI document for the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "chat-relay",
        description = "REST API and WebSocket relay gateway for two-party conversation messaging."
    ),
    paths(
        handlers::system::health_handler,
        handlers::conversations::list_conversations,
        handlers::conversations::open_conversation,
        handlers::messages::list_messages,
        handlers::messages::send_message,
    ),
    components(schemas(
        handlers::system::HealthResponse,
        crate::domain::Conversation,
        crate::domain::ChatMessage,
        dto::OpenConversationRequest,
        dto::SendMessageRequest,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "Conversations", description = "Conversation lookup and lazy creation"),
        (name = "Messages", description = "History paging and one-shot send"),
        (name = "System", description = "Health and diagnostics"),
    )
)]
pub struct ApiDoc;
