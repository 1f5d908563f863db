//! Data Transfer Objects for REST request/response serialization.
//!
//! Responses reuse the domain types directly, since those already carry
//! the wire field names; the DTOs here cover request bodies and query
//! parameters.

pub mod conversation_dto;
pub mod message_dto;

pub use conversation_dto::*;
pub use message_dto::*;
