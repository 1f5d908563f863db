//! Broadcast bus: cross-instance publish/subscribe for relayed messages.
//!
//! The bus is the sole coupling point between server instances: a message
//! ingested anywhere is published to its conversation's topic, and every
//! open session for that conversation — on any instance — holds a
//! [`Subscription`] to the topic. Delivery is best-effort; a publisher's
//! own event order is preserved, but streams from independent publishers
//! may interleave.
//!
//! Two implementations: [`memory::MemoryBus`] (single-instance, tests) and
//! [`redis::RedisBus`] (Redis pub/sub, multi-instance).

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::ChatMessage;
use crate::error::ChatError;

pub use memory::MemoryBus;
pub use redis::RedisBus;

/// Fixed namespace prefix for conversation topics.
const TOPIC_PREFIX: &str = "chat:conversation:";

/// Returns the bus topic for a conversation.
#[must_use]
pub fn conversation_topic(conversation_id: Uuid) -> String {
    format!("{TOPIC_PREFIX}{conversation_id}")
}

/// Publish/subscribe port shared process-wide by all sessions and ingest
/// calls. Implementations must be safe for concurrent independent use.
#[async_trait]
pub trait BroadcastBus: Send + Sync {
    /// Publishes a message to a topic. Fire-and-forget: delivery to any
    /// particular subscriber is not guaranteed.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Bus`] when the transport rejects the publish.
    /// Callers on the ingest path treat this as non-fatal.
    async fn publish(&self, topic: &str, message: &ChatMessage) -> Result<(), ChatError>;

    /// Opens a subscription to a topic. Events published after this call
    /// are delivered in publisher order until the subscription is released.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Bus`] when the subscription cannot be
    /// established.
    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChatError>;
}

/// A live subscription to one bus topic.
///
/// Backed by a channel that an implementation-owned pump task feeds.
/// Releasing stops the pump and closes the channel; release is idempotent
/// and also runs on drop, so a session teardown racing an explicit release
/// never double-frees the underlying transport resources.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    rx: mpsc::Receiver<ChatMessage>,
    stop: CancellationToken,
    released: bool,
}

impl Subscription {
    /// Creates a subscription from its receiving half and the pump's stop
    /// token. Used by bus implementations.
    #[must_use]
    pub(crate) fn new(topic: String, rx: mpsc::Receiver<ChatMessage>, stop: CancellationToken) -> Self {
        Self {
            topic,
            rx,
            stop,
            released: false,
        }
    }

    /// Topic this subscription is bound to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receives the next message, or `None` once the subscription is
    /// released or the pump has stopped.
    pub async fn recv(&mut self) -> Option<ChatMessage> {
        self.rx.recv().await
    }

    /// Releases the subscription. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.stop.cancel();
        self.rx.close();
        tracing::debug!(topic = %self.topic, "subscription released");
    }

    /// Returns `true` once [`Subscription::release`] has run.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
