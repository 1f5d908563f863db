//! REST endpoint handlers organized by resource.

pub mod conversations;
pub mod messages;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/chat`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(conversations::routes())
        .merge(messages::routes())
        .merge(system::routes())
}
