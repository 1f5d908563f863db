//! Redis pub/sub implementation of the broadcast bus.
//!
//! The cross-instance path: every instance publishes ingested messages to
//! `chat:conversation:<id>` channels and subscribes on behalf of its open
//! sessions. Redis preserves a single publisher's order per channel, which
//! is exactly the ordering contract the bus port promises. Payloads are the
//! JSON wire form of [`ChatMessage`]; frames that fail to decode are
//! skipped, matching best-effort delivery.

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{BroadcastBus, Subscription};
use crate::domain::ChatMessage;
use crate::error::ChatError;

/// Redis-backed publish/subscribe bus.
///
/// Publishing goes through a shared [`ConnectionManager`] (auto-reconnect,
/// cheap to clone); each subscription opens its own pub/sub connection,
/// released when the subscription is.
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    conn: ConnectionManager,
    channel_capacity: usize,
}

impl std::fmt::Debug for RedisBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBus").finish_non_exhaustive()
    }
}

impl RedisBus {
    /// Connects to Redis and verifies the connection with a `PING`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Bus`] when the URL is invalid or Redis is
    /// unreachable.
    pub async fn connect(redis_url: &str, channel_capacity: usize) -> Result<Self, ChatError> {
        let is_tls = redis_url.starts_with("rediss://");
        tracing::debug!(tls = is_tls, "opening Redis client");

        let client = redis::Client::open(redis_url)
            .map_err(|e| ChatError::Bus(format!("invalid Redis URL: {e}")))?;

        let mut conn = client
            .get_connection_manager()
            .await
            .map_err(|e| ChatError::Bus(format!("failed to connect to Redis: {e}")))?;

        let _: () = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| ChatError::Bus(format!("Redis ping failed: {e}")))?;

        tracing::info!("connected to Redis broadcast bus");
        Ok(Self {
            client,
            conn,
            channel_capacity,
        })
    }
}

#[async_trait]
impl BroadcastBus for RedisBus {
    async fn publish(&self, topic: &str, message: &ChatMessage) -> Result<(), ChatError> {
        let payload = serde_json::to_string(message)
            .map_err(|e| ChatError::Bus(format!("encode message: {e}")))?;

        let mut conn = self.conn.clone();
        let _: i64 = conn
            .publish(topic, payload)
            .await
            .map_err(|e| ChatError::Bus(format!("publish to {topic}: {e}")))?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChatError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| ChatError::Bus(format!("open pub/sub connection: {e}")))?;
        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| ChatError::Bus(format!("subscribe to {topic}: {e}")))?;

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let stop = CancellationToken::new();

        let pump_stop = stop.clone();
        let pump_topic = topic.to_string();
        tokio::spawn(async move {
            {
                let mut stream = pubsub.on_message();
                loop {
                    tokio::select! {
                        () = pump_stop.cancelled() => break,
                        frame = stream.next() => {
                            let Some(frame) = frame else { break };
                            let Ok(payload) = frame.get_payload::<String>() else {
                                continue;
                            };
                            match serde_json::from_str::<ChatMessage>(&payload) {
                                Ok(message) => {
                                    if tx.send(message).await.is_err() {
                                        break;
                                    }
                                }
                                Err(err) => {
                                    tracing::warn!(topic = %pump_topic, error = %err, "undecodable bus payload skipped");
                                }
                            }
                        }
                    }
                }
            }
            if let Err(err) = pubsub.unsubscribe(&pump_topic).await {
                tracing::debug!(topic = %pump_topic, error = %err, "pub/sub unsubscribe failed");
            }
        });

        Ok(Subscription::new(topic.to_string(), rx, stop))
    }
}
