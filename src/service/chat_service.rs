//! Chat service: the ingest path and the operations both entry points share.
//!
//! [`ChatService`] is a stateless coordinator over the two ports: the
//! [`ConversationStore`] for durable state and the [`BroadcastBus`] for
//! live fan-out. The single load-bearing rule lives in [`ChatService::ingest`]:
//! persist happens-before publish, on every call, on every instance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::bus::{BroadcastBus, Subscription, conversation_topic};
use crate::domain::{ChatMessage, Conversation};
use crate::error::ChatError;
use crate::persistence::ConversationStore;

use super::AccessGate;

/// Orchestration layer for conversations and message delivery.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    bus: Arc<dyn BroadcastBus>,
    gate: AccessGate,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService").finish_non_exhaustive()
    }
}

impl ChatService {
    /// Creates a service over the given ports.
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>, bus: Arc<dyn BroadcastBus>) -> Self {
        let gate = AccessGate::new(Arc::clone(&store));
        Self { store, bus, gate }
    }

    /// Authorizes `principal` against a conversation via the access gate.
    ///
    /// # Errors
    ///
    /// See [`AccessGate::authorize`].
    pub async fn authorize(
        &self,
        principal: &str,
        conversation_id: Uuid,
    ) -> Result<Conversation, ChatError> {
        self.gate.authorize(principal, conversation_id).await
    }

    /// Finds or lazily creates the conversation between a client and a
    /// provider. The boolean is `true` when this call created it.
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidArgument`] when `provider_id` is empty,
    /// [`ChatError::Storage`] on storage failure.
    pub async fn open_conversation(
        &self,
        client_id: &str,
        provider_id: &str,
        scheduling_ref: Option<&str>,
    ) -> Result<(Conversation, bool), ChatError> {
        if provider_id.trim().is_empty() {
            return Err(ChatError::InvalidArgument(
                "providerId must not be empty".to_string(),
            ));
        }
        self.store
            .find_or_create_conversation(client_id, provider_id, scheduling_ref)
            .await
    }

    /// Lists the principal's conversations, most recently active first.
    ///
    /// # Errors
    ///
    /// [`ChatError::Storage`] on storage failure.
    pub async fn conversations_for(
        &self,
        principal: &str,
        limit: i64,
    ) -> Result<Vec<Conversation>, ChatError> {
        self.store.list_conversations_for_user(principal, limit).await
    }

    /// Returns an authorized page of a conversation's history in
    /// chronological ascending order.
    ///
    /// # Errors
    ///
    /// Gate errors plus [`ChatError::Storage`] on storage failure.
    pub async fn history(
        &self,
        principal: &str,
        conversation_id: Uuid,
        limit: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        self.gate.authorize(principal, conversation_id).await?;
        self.store.list_messages(conversation_id, limit, before).await
    }

    /// One-shot send path: gate, ingest, return the created message.
    ///
    /// Does not subscribe to anything; already-open sessions learn about
    /// the message through the ingest publish.
    ///
    /// # Errors
    ///
    /// Gate errors plus the ingest errors below.
    pub async fn send(
        &self,
        principal: &str,
        conversation_id: Uuid,
        text: &str,
    ) -> Result<ChatMessage, ChatError> {
        self.gate.authorize(principal, conversation_id).await?;
        self.ingest(conversation_id, principal, text).await
    }

    /// The single ingest path both entry points funnel into: validate,
    /// persist, then publish.
    ///
    /// Persist happens-before publish, so any subscriber that receives the
    /// live event can immediately page the history and find it present.
    /// A publish failure is reported to the log and otherwise swallowed:
    /// the message counts as sent once persisted, and live delivery is a
    /// best-effort enhancement.
    ///
    /// # Errors
    ///
    /// [`ChatError::InvalidArgument`] for empty or whitespace-only text,
    /// [`ChatError::Storage`] when persistence fails (nothing published).
    pub async fn ingest(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        text: &str,
    ) -> Result<ChatMessage, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::InvalidArgument(
                "message text must not be empty".to_string(),
            ));
        }

        let message = self
            .store
            .insert_message(conversation_id, sender_id, text)
            .await?;

        let topic = conversation_topic(conversation_id);
        if let Err(err) = self.bus.publish(&topic, &message).await {
            tracing::warn!(%conversation_id, message_id = %message.id, error = %err, "message publish failed");
        }

        Ok(message)
    }

    /// Opens a bus subscription for a conversation's topic.
    ///
    /// # Errors
    ///
    /// [`ChatError::Bus`] when the subscription cannot be established.
    pub async fn subscribe(&self, conversation_id: Uuid) -> Result<Subscription, ChatError> {
        self.bus.subscribe(&conversation_topic(conversation_id)).await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::bus::MemoryBus;
    use crate::persistence::MemoryStore;

    async fn service_with_conversation() -> (ChatService, Conversation) {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(MemoryBus::new(16));
        let service = ChatService::new(store, bus);
        let Ok((conversation, _)) = service.open_conversation("c1", "p1", None).await else {
            panic!("setup failed");
        };
        (service, conversation)
    }

    #[tokio::test]
    async fn ingest_is_immediately_visible_in_history() {
        let (service, conversation) = service_with_conversation().await;
        let Ok(sent) = service.ingest(conversation.id, "c1", "hello").await else {
            panic!("ingest failed");
        };
        let Ok(history) = service.history("c1", conversation.id, 100, None).await else {
            panic!("history failed");
        };
        assert_eq!(history.len(), 1);
        assert_eq!(history.first().map(|m| m.id), Some(sent.id));
        assert_eq!(history.first().map(|m| m.text.as_str()), Some("hello"));
    }

    #[tokio::test]
    async fn empty_and_whitespace_text_is_rejected_without_side_effects() {
        let (service, conversation) = service_with_conversation().await;
        let Ok(mut sub) = service.subscribe(conversation.id).await else {
            panic!("subscribe failed");
        };

        for text in ["", "   ", "\n\t"] {
            let result = service.ingest(conversation.id, "c1", text).await;
            assert!(matches!(result, Err(ChatError::InvalidArgument(_))));
            let result = service.send("c1", conversation.id, text).await;
            assert!(matches!(result, Err(ChatError::InvalidArgument(_))));
        }

        let Ok(history) = service.history("c1", conversation.id, 100, None).await else {
            panic!("history failed");
        };
        assert!(history.is_empty());

        sub.release();
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn text_is_stored_untrimmed() {
        let (service, conversation) = service_with_conversation().await;
        let Ok(sent) = service.ingest(conversation.id, "c1", "  padded  ").await else {
            panic!("ingest failed");
        };
        assert_eq!(sent.text, "  padded  ");
    }

    #[tokio::test]
    async fn one_shot_send_reaches_open_subscriber() {
        let (service, conversation) = service_with_conversation().await;
        let Ok(mut sub) = service.subscribe(conversation.id).await else {
            panic!("subscribe failed");
        };

        let Ok(sent) = service.send("c1", conversation.id, "Olá").await else {
            panic!("send failed");
        };
        assert_eq!(sent.sender_id, "c1");
        assert_eq!(sent.text, "Olá");

        let Some(relayed) = sub.recv().await else {
            panic!("no relay");
        };
        assert_eq!(relayed.id, sent.id);
        assert_eq!(relayed.text, sent.text);
        assert_eq!(relayed.sender_id, sent.sender_id);
    }

    #[tokio::test]
    async fn send_refuses_non_participants_and_unknown_conversations() {
        let (service, conversation) = service_with_conversation().await;
        let forbidden = service.send("intruder", conversation.id, "hi").await;
        assert!(matches!(forbidden, Err(ChatError::Forbidden)));

        let missing = service.send("c1", Uuid::new_v4(), "hi").await;
        assert!(matches!(missing, Err(ChatError::NotFound(_))));
    }

    /// Bus double that checks, at publish time, that the message is
    /// already retrievable from the store.
    struct ProbeBus {
        store: Arc<MemoryStore>,
        observed: AtomicUsize,
        violations: AtomicUsize,
    }

    #[async_trait]
    impl BroadcastBus for ProbeBus {
        async fn publish(&self, _topic: &str, message: &ChatMessage) -> Result<(), ChatError> {
            self.observed.fetch_add(1, Ordering::SeqCst);
            let history = self
                .store
                .list_messages(message.conversation_id, i64::MAX, None)
                .await?;
            if !history.iter().any(|m| m.id == message.id) {
                self.violations.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }

        async fn subscribe(&self, topic: &str) -> Result<Subscription, ChatError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(Subscription::new(
                topic.to_string(),
                rx,
                CancellationToken::new(),
            ))
        }
    }

    #[tokio::test]
    async fn persist_happens_before_publish_under_concurrency() {
        let store = Arc::new(MemoryStore::new());
        let probe = Arc::new(ProbeBus {
            store: Arc::clone(&store),
            observed: AtomicUsize::new(0),
            violations: AtomicUsize::new(0),
        });
        let service = Arc::new(ChatService::new(
            store,
            Arc::clone(&probe) as Arc<dyn BroadcastBus>,
        ));
        let Ok((conversation, _)) = service.open_conversation("c1", "p1", None).await else {
            panic!("setup failed");
        };

        let mut handles = Vec::new();
        for i in 0..16 {
            let service = Arc::clone(&service);
            let sender = if i % 2 == 0 { "c1" } else { "p1" };
            let id = conversation.id;
            handles.push(tokio::spawn(async move {
                service.ingest(id, sender, &format!("m{i}")).await
            }));
        }
        for handle in handles {
            let Ok(Ok(_)) = handle.await else {
                panic!("ingest task failed");
            };
        }

        assert_eq!(probe.observed.load(Ordering::SeqCst), 16);
        assert_eq!(probe.violations.load(Ordering::SeqCst), 0);
    }

    /// Bus double whose publish always fails.
    struct FailingBus;

    #[async_trait]
    impl BroadcastBus for FailingBus {
        async fn publish(&self, topic: &str, _message: &ChatMessage) -> Result<(), ChatError> {
            Err(ChatError::Bus(format!("{topic} unreachable")))
        }

        async fn subscribe(&self, _topic: &str) -> Result<Subscription, ChatError> {
            Err(ChatError::Bus("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_the_send() {
        let store = Arc::new(MemoryStore::new());
        let service = ChatService::new(store, Arc::new(FailingBus));
        let Ok((conversation, _)) = service.open_conversation("c1", "p1", None).await else {
            panic!("setup failed");
        };

        let Ok(sent) = service.send("c1", conversation.id, "still sent").await else {
            panic!("send must succeed despite bus failure");
        };
        let Ok(history) = service.history("c1", conversation.id, 100, None).await else {
            panic!("history failed");
        };
        assert_eq!(history.first().map(|m| m.id), Some(sent.id));
    }

    /// Store double whose message insert always fails.
    struct BrokenStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl ConversationStore for BrokenStore {
        async fn find_or_create_conversation(
            &self,
            client_id: &str,
            provider_id: &str,
            scheduling_ref: Option<&str>,
        ) -> Result<(Conversation, bool), ChatError> {
            self.inner
                .find_or_create_conversation(client_id, provider_id, scheduling_ref)
                .await
        }

        async fn get_conversation(&self, id: Uuid) -> Result<Conversation, ChatError> {
            self.inner.get_conversation(id).await
        }

        async fn list_conversations_for_user(
            &self,
            user_id: &str,
            limit: i64,
        ) -> Result<Vec<Conversation>, ChatError> {
            self.inner.list_conversations_for_user(user_id, limit).await
        }

        async fn insert_message(
            &self,
            _conversation_id: Uuid,
            _sender_id: &str,
            _text: &str,
        ) -> Result<ChatMessage, ChatError> {
            Err(ChatError::Storage("database unavailable".to_string()))
        }

        async fn list_messages(
            &self,
            conversation_id: Uuid,
            limit: i64,
            before: Option<DateTime<Utc>>,
        ) -> Result<Vec<ChatMessage>, ChatError> {
            self.inner.list_messages(conversation_id, limit, before).await
        }
    }

    #[tokio::test]
    async fn storage_failure_aborts_ingest_and_publishes_nothing() {
        let store = Arc::new(BrokenStore {
            inner: MemoryStore::new(),
        });
        let bus = Arc::new(MemoryBus::new(16));
        let service = ChatService::new(store, Arc::clone(&bus) as Arc<dyn BroadcastBus>);
        let Ok((conversation, _)) = service.open_conversation("c1", "p1", None).await else {
            panic!("setup failed");
        };
        let Ok(mut sub) = service.subscribe(conversation.id).await else {
            panic!("subscribe failed");
        };

        let result = service.send("c1", conversation.id, "doomed").await;
        assert!(matches!(result, Err(ChatError::Storage(_))));

        // No partial state observable to subscribers.
        sub.release();
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn open_conversation_requires_a_provider() {
        let store = Arc::new(MemoryStore::new());
        let service = ChatService::new(store, Arc::new(MemoryBus::new(16)));
        let result = service.open_conversation("c1", "  ", None).await;
        assert!(matches!(result, Err(ChatError::InvalidArgument(_))));
    }
}
