//! WebSocket layer: upgrade handling and the connection session.
//!
//! One session per accepted socket. The session owns a bus subscription
//! and two concurrently scheduled flows — relay (bus → socket) and inbound
//! (socket → ingest) — joined by a single cancellation token so that
//! either flow failing, or a server shutdown, tears the whole session down
//! promptly and exactly once.

pub mod frames;
pub mod handler;
pub mod session;

pub use session::ConnectionSession;
