//! In-process broadcast bus backed by per-topic `tokio::broadcast` channels.
//!
//! Suitable for single-instance deployments and tests. Each topic maps to
//! one broadcast channel; a subscription spawns a pump task that forwards
//! broadcast events into the subscription's own channel until released.
//! When the ring buffer overtakes a slow subscriber the lag is logged and
//! the subscriber skips ahead — live delivery is best-effort by contract.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::{BroadcastBus, Subscription};
use crate::domain::ChatMessage;
use crate::error::ChatError;

/// In-process publish/subscribe bus.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    topics: Arc<DashMap<String, broadcast::Sender<ChatMessage>>>,
    capacity: usize,
}

impl MemoryBus {
    /// Creates a bus whose per-topic ring buffers and subscription
    /// channels hold `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity,
        }
    }

    fn sender_for(&self, topic: &str) -> broadcast::Sender<ChatMessage> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Number of live subscribers across all topics (test/observability
    /// helper).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.topics
            .iter()
            .map(|entry| entry.value().receiver_count())
            .sum()
    }
}

#[async_trait]
impl BroadcastBus for MemoryBus {
    async fn publish(&self, topic: &str, message: &ChatMessage) -> Result<(), ChatError> {
        // A send error only means no subscriber is currently listening.
        let _ = self.sender_for(topic).send(message.clone());
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChatError> {
        // Attach while holding the entry guard: an exiting pump's eviction
        // of a drained topic serializes against this on the same shard, so
        // the receiver can never land on an orphaned channel.
        let mut broadcast_rx = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        let (tx, rx) = mpsc::channel(self.capacity);
        let stop = CancellationToken::new();

        let pump_stop = stop.clone();
        let pump_topic = topic.to_string();
        let topics = Arc::clone(&self.topics);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = pump_stop.cancelled() => break,
                    event = broadcast_rx.recv() => match event {
                        Ok(message) => {
                            if tx.send(message).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(topic = %pump_topic, lagged = n, "subscriber lagged behind bus");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            drop(broadcast_rx);
            // Reclaim the topic entry once the last subscriber is gone.
            topics.remove_if(&pump_topic, |_, sender| sender.receiver_count() == 0);
        });

        Ok(Subscription::new(topic.to_string(), rx, stop))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn make_message(text: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: "c1".to_string(),
            text: text.to_string(),
            sent_at: Utc::now(),
            read: false,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_message() {
        let bus = MemoryBus::new(16);
        let Ok(mut sub) = bus.subscribe("topic-a").await else {
            panic!("subscribe failed");
        };

        let message = make_message("hello");
        let Ok(()) = bus.publish("topic-a", &message).await else {
            panic!("publish failed");
        };

        let received = sub.recv().await;
        assert_eq!(received.map(|m| m.id), Some(message.id));
    }

    #[tokio::test]
    async fn publisher_order_is_preserved() {
        let bus = MemoryBus::new(16);
        let Ok(mut sub) = bus.subscribe("topic-a").await else {
            panic!("subscribe failed");
        };

        for text in ["one", "two", "three"] {
            let Ok(()) = bus.publish("topic-a", &make_message(text)).await else {
                panic!("publish failed");
            };
        }

        let mut received = Vec::new();
        for _ in 0..3 {
            let Some(message) = sub.recv().await else {
                panic!("stream ended early");
            };
            received.push(message.text);
        }
        assert_eq!(received, ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = MemoryBus::new(16);
        let Ok(mut sub_a) = bus.subscribe("topic-a").await else {
            panic!("subscribe failed");
        };
        let Ok(mut sub_b) = bus.subscribe("topic-b").await else {
            panic!("subscribe failed");
        };

        let Ok(()) = bus.publish("topic-b", &make_message("for b")).await else {
            panic!("publish failed");
        };

        let Some(got) = sub_b.recv().await else {
            panic!("subscriber b got nothing");
        };
        assert_eq!(got.text, "for b");

        // topic-a subscriber must see nothing.
        sub_a.release();
        assert_eq!(sub_a.recv().await, None);
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let bus = MemoryBus::new(16);
        let Ok(()) = bus.publish("empty-topic", &make_message("void")).await else {
            panic!("publish failed");
        };
    }

    #[tokio::test]
    async fn released_subscription_stops_yielding() {
        let bus = MemoryBus::new(16);
        let Ok(mut sub) = bus.subscribe("topic-a").await else {
            panic!("subscribe failed");
        };
        sub.release();
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn resubscribe_racing_topic_eviction_still_receives() {
        let bus = MemoryBus::new(16);
        for i in 0..50 {
            let Ok(mut first) = bus.subscribe("topic-a").await else {
                panic!("subscribe failed");
            };
            first.release();
            // The released pump may be evicting the drained topic right
            // now; the new subscriber must still end up on a live channel.
            let Ok(mut second) = bus.subscribe("topic-a").await else {
                panic!("subscribe failed");
            };

            let message = make_message(&format!("m{i}"));
            let Ok(()) = bus.publish("topic-a", &message).await else {
                panic!("publish failed");
            };
            let received =
                tokio::time::timeout(std::time::Duration::from_secs(1), second.recv()).await;
            let Ok(Some(received)) = received else {
                panic!("subscriber attached to an orphaned channel");
            };
            assert_eq!(received.id, message.id);
        }
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive() {
        let bus = MemoryBus::new(16);
        let Ok(mut sub1) = bus.subscribe("topic-a").await else {
            panic!("subscribe failed");
        };
        let Ok(mut sub2) = bus.subscribe("topic-a").await else {
            panic!("subscribe failed");
        };

        let message = make_message("fan-out");
        let Ok(()) = bus.publish("topic-a", &message).await else {
            panic!("publish failed");
        };

        assert_eq!(sub1.recv().await.map(|m| m.id), Some(message.id));
        assert_eq!(sub2.recv().await.map(|m| m.id), Some(message.id));
    }
}
