//! # chat-relay
//!
//! REST API and WebSocket relay gateway for two-party conversation
//! messaging: a client and a service provider exchange text messages tied
//! to a conversation record, through polling or a live connection.
//!
//! The core is the real-time delivery relay. A message accepted through
//! any entry point is persisted first and then published to the
//! conversation's broadcast-bus topic; every open connection session for
//! that conversation — on any server instance — subscribes to the topic
//! and writes relayed messages to its own socket. Persist-before-publish
//! is the one cross-component ordering rule: a subscriber that sees a live
//! event can immediately page the history and find it present.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler + ConnectionSession (ws/)
//!     │
//!     ├── AccessGate + ChatService (service/)
//!     │
//!     ├── BroadcastBus: in-process | Redis pub/sub (bus/)
//!     └── ConversationStore: PostgreSQL | in-memory (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod bus;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
