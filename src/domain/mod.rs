//! Domain layer: the durable conversation and message records.
//!
//! These types double as the wire format: they serialize with the exact
//! camelCase field names the REST and WebSocket surfaces expose, and the
//! Postgres and in-memory stores both produce them.

pub mod conversation;
pub mod message;

pub use conversation::Conversation;
pub use message::ChatMessage;
