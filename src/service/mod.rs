//! Service layer: authorization and message orchestration.
//!
//! [`AccessGate`] authorizes a principal against a conversation;
//! [`ChatService`] owns the ingest path (persist, then publish) and the
//! read operations both entry points share.

pub mod access;
pub mod chat_service;

pub use access::AccessGate;
pub use chat_service::ChatService;
