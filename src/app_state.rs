//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::service::ChatService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Chat service for all relay logic.
    pub chat_service: Arc<ChatService>,
    /// Loaded configuration (page limits, addresses).
    pub config: Arc<RelayConfig>,
    /// Server-wide shutdown token; sessions run under child tokens.
    pub shutdown: CancellationToken,
}
