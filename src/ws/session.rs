//! Connection session: the two flows driving one live socket.
//!
//! Lifecycle: the HTTP handler authorizes and subscribes (CONNECTING →
//! AUTHORIZED), the upgrade completes (→ OPEN), then [`ConnectionSession::run`]
//! spawns the relay flow and the inbound flow as independent tasks sharing
//! one cancellation token. Whichever flow exits first — write failure on
//! relay, read failure or close on inbound, or an external shutdown —
//! cancels the token (→ CLOSING); the other flow stops on the next
//! suspension point and the subscription is released (→ CLOSED). Both the
//! token and the subscription release are idempotent, so overlapping close
//! triggers are safe.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::bus::Subscription;
use crate::service::ChatService;

use super::frames::InboundFrame;

/// One live bidirectional connection bound to a conversation and an
/// authenticated principal.
#[derive(Debug)]
pub struct ConnectionSession {
    conversation_id: Uuid,
    principal: String,
    subscription: Subscription,
    cancel: CancellationToken,
}

impl ConnectionSession {
    /// Creates a session that is authorized and relay-ready (the
    /// subscription already exists, so no delivery gap can open between
    /// authorization and the first relayed event).
    ///
    /// `cancel` should be a child of the server-wide shutdown token so an
    /// instance shutdown tears down every open session.
    #[must_use]
    pub fn new(
        conversation_id: Uuid,
        principal: String,
        subscription: Subscription,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            conversation_id,
            principal,
            subscription,
            cancel,
        }
    }

    /// Drives the session to completion: both flows run until either exits
    /// or the token is cancelled, then everything is torn down.
    pub async fn run(self, socket: WebSocket, service: Arc<ChatService>) {
        let conversation_id = self.conversation_id;
        tracing::debug!(%conversation_id, principal = %self.principal, "session open");

        let (ws_tx, ws_rx) = socket.split();

        let relay = tokio::spawn(relay_flow(ws_tx, self.subscription, self.cancel.clone()));
        let inbound = tokio::spawn(inbound_flow(
            ws_rx,
            service,
            conversation_id,
            self.principal,
            self.cancel.clone(),
        ));

        let (relay_res, inbound_res) = tokio::join!(relay, inbound);
        if relay_res.is_err() || inbound_res.is_err() {
            tracing::error!(%conversation_id, "session flow task aborted");
        }
        tracing::debug!(%conversation_id, "session closed");
    }
}

/// Relay flow: forwards bus events to the socket, preserving the order the
/// bus delivered them. A write failure or cancellation ends the flow; on
/// exit it cancels the shared token and releases the subscription.
pub async fn relay_flow<S>(
    mut sink: S,
    mut subscription: Subscription,
    cancel: CancellationToken,
) where
    S: Sink<Message, Error = axum::Error> + Unpin + Send,
{
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            event = subscription.recv() => {
                let Some(message) = event else { break };
                let payload = match serde_json::to_string(&message) {
                    Ok(payload) => payload,
                    Err(err) => {
                        tracing::warn!(message_id = %message.id, error = %err, "relay serialization failed");
                        continue;
                    }
                };
                // The write itself races the token: a peer that stops
                // draining its transport must not pin the flow open.
                tokio::select! {
                    () = cancel.cancelled() => break,
                    written = sink.send(Message::text(payload)) => {
                        if let Err(err) = written {
                            tracing::debug!(error = %err, "relay write failed");
                            break;
                        }
                    }
                }
            }
        }
    }
    cancel.cancel();
    subscription.release();
}

/// Inbound flow: reads frames from the socket and hands well-formed ones
/// to the ingest path under the session's bound identity. Malformed frames
/// and empty text are silently discarded; an ingest failure is logged and
/// the connection stays up. A read failure, close frame, or cancellation
/// ends the flow; on exit it cancels the shared token.
pub async fn inbound_flow<R>(
    mut stream: R,
    service: Arc<ChatService>,
    conversation_id: Uuid,
    principal: String,
    cancel: CancellationToken,
) where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin + Send,
{
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let Ok(frame) = serde_json::from_str::<InboundFrame>(text.as_str()) else {
                        continue;
                    };
                    if frame.text.trim().is_empty() {
                        continue;
                    }
                    // senderID is never taken from the frame body. The
                    // ingest races the token so a hung storage call cannot
                    // pin the flow open past a session teardown.
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        ingested = service.ingest(conversation_id, &principal, &frame.text) => {
                            if let Err(err) = ingested {
                                tracing::warn!(%conversation_id, error = %err, "inbound frame ingest failed");
                            }
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(err)) => {
                    tracing::debug!(%conversation_id, error = %err, "socket read failed");
                    break;
                }
                // Ping/pong are handled by the protocol layer; binary is ignored.
                Some(Ok(_)) => {}
            }
        }
    }
    cancel.cancel();
}
