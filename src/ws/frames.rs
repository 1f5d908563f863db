//! Inbound WebSocket frame format.
//!
//! Clients send `{"text": "..."}` text frames. The sender identity is
//! never part of the frame; it is always the session's authenticated
//! principal. Outbound frames are the JSON wire form of
//! [`crate::domain::ChatMessage`].

use serde::Deserialize;

/// A client-sent message frame.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    /// Message text to ingest.
    pub text: String,
}
