// SPDX-FileCopyrightText: 2026 Washpanel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime delivery of chat messages.
//!
//! One WebSocket channel per open conversation, joined on a topic that
//! filters inserts server-side to that conversation's id. Realtime is a
//! latency optimization, not a correctness requirement: if the channel
//! cannot be established the subscription degrades to a no-op and the
//! conversation keeps working in pull mode via `ChatService::get_messages`.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use washpanel_client::ClientHandle;
use washpanel_config::model::RealtimeConfig;
use washpanel_core::ChatMessage;

/// Channel event names.
pub mod events {
    /// Join a topic.
    pub const JOIN: &str = "phx_join";
    /// Leave a topic.
    pub const LEAVE: &str = "phx_leave";
    /// Keepalive.
    pub const HEARTBEAT: &str = "heartbeat";
    /// A new row was inserted.
    pub const INSERT: &str = "INSERT";
}

/// Deterministic topic for one conversation's message inserts.
pub fn conversation_topic(conversation_id: &str) -> String {
    format!("realtime:chat_messages:conversation_id=eq.{conversation_id}")
}

/// Server frame shape.
#[derive(Debug, Deserialize)]
struct IncomingFrame {
    topic: String,
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Decode a text frame into a chat message if it is an insert for `topic`.
///
/// Anything else (acks, heartbeat replies, other topics, malformed records)
/// is ignored -- the feed's id dedup handles the rest.
fn decode_insert(text: &str, topic: &str) -> Option<ChatMessage> {
    let frame: IncomingFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "unparseable realtime frame");
            return None;
        }
    };
    if frame.event != events::INSERT || frame.topic != topic {
        return None;
    }
    match serde_json::from_value(frame.payload.get("record")?.clone()) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!(error = %e, "insert event with malformed record");
            None
        }
    }
}

/// Opens realtime channels through the client handle.
pub struct RealtimeSubscriber {
    handle: Arc<ClientHandle>,
    config: RealtimeConfig,
}

impl RealtimeSubscriber {
    pub fn new(handle: Arc<ClientHandle>, config: RealtimeConfig) -> Self {
        Self { handle, config }
    }

    /// Subscribe to inserts for one conversation. Fire-and-forget: every
    /// failure path logs and returns the no-op subscription.
    pub async fn subscribe(&self, conversation_id: &str) -> Subscription {
        let Some(client) = self.handle.current() else {
            warn!("realtime unavailable without a backend client, staying in pull mode");
            return Subscription::noop();
        };

        let url = client.realtime_endpoint();
        let socket = match connect_async(url.as_str()).await {
            Ok((socket, _)) => socket,
            Err(e) => {
                warn!(error = %e, "realtime channel unavailable, staying in pull mode");
                return Subscription::noop();
            }
        };

        let topic = conversation_topic(conversation_id);
        let (event_tx, event_rx) = mpsc::channel(64);
        let (leave_tx, leave_rx) = oneshot::channel();
        let heartbeat = self.config.heartbeat_interval();

        tokio::spawn(run_channel(socket, topic.clone(), heartbeat, event_tx, leave_rx));
        debug!(%topic, "realtime channel opened");

        Subscription {
            events: event_rx,
            leave: Some(leave_tx),
        }
    }
}

/// One open (or degraded no-op) conversation channel.
pub struct Subscription {
    events: mpsc::Receiver<ChatMessage>,
    leave: Option<oneshot::Sender<()>>,
}

impl Subscription {
    /// A subscription that delivers nothing and unsubscribes as a no-op.
    pub fn noop() -> Self {
        let (_, events) = mpsc::channel(1);
        Self {
            events,
            leave: None,
        }
    }

    /// True when a live channel backs this subscription.
    pub fn is_live(&self) -> bool {
        self.leave.is_some()
    }

    /// Next pushed message, or `None` once the channel is gone.
    pub async fn next_message(&mut self) -> Option<ChatMessage> {
        self.events.recv().await
    }

    /// Leave the topic and let the socket task wind down.
    pub fn unsubscribe(mut self) {
        if let Some(leave) = self.leave.take() {
            let _ = leave.send(());
        }
    }
}

/// Socket task: join, heartbeat, forward inserts, leave on request.
async fn run_channel(
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    topic: String,
    heartbeat: std::time::Duration,
    events: mpsc::Sender<ChatMessage>,
    mut leave: oneshot::Receiver<()>,
) {
    let (mut sink, mut stream) = socket.split();
    let mut frame_ref: u64 = 1;

    let join = json!({
        "topic": topic,
        "event": events::JOIN,
        "payload": {},
        "ref": frame_ref.to_string(),
    });
    if let Err(e) = sink.send(Message::text(join.to_string())).await {
        warn!(error = %e, %topic, "failed to join realtime topic");
        return;
    }

    let mut ticker = tokio::time::interval(heartbeat);
    ticker.tick().await; // the first tick completes immediately

    loop {
        tokio::select! {
            _ = &mut leave => {
                frame_ref += 1;
                let bye = json!({
                    "topic": topic,
                    "event": events::LEAVE,
                    "payload": {},
                    "ref": frame_ref.to_string(),
                });
                let _ = sink.send(Message::text(bye.to_string())).await;
                debug!(%topic, "left realtime topic");
                break;
            }
            _ = ticker.tick() => {
                frame_ref += 1;
                let beat = json!({
                    "topic": "phoenix",
                    "event": events::HEARTBEAT,
                    "payload": {},
                    "ref": frame_ref.to_string(),
                });
                if sink.send(Message::text(beat.to_string())).await.is_err() {
                    warn!(%topic, "realtime heartbeat failed, closing channel");
                    break;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(message) = decode_insert(text.as_str(), &topic) {
                        if events.send(message).await.is_err() {
                            // Subscriber dropped the receiver.
                            break;
                        }
                    }
                }
                Some(Ok(_)) => {} // binary/ping/pong handled by the transport
                Some(Err(e)) => {
                    warn!(error = %e, %topic, "realtime channel error");
                    break;
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use washpanel_config::model::BackendConfig;
    use washpanel_core::ChatRole;

    fn insert_frame(topic: &str, id: &str) -> String {
        json!({
            "topic": topic,
            "event": "INSERT",
            "payload": {
                "record": {
                    "id": id,
                    "conversation_id": "c-1",
                    "sender_id": "w-1",
                    "sender_role": "worker",
                    "content": "Done with the interior",
                    "read": false,
                    "created_at": "2026-02-01T10:05:00+00:00"
                }
            }
        })
        .to_string()
    }

    #[test]
    fn topic_is_deterministic_per_conversation() {
        assert_eq!(
            conversation_topic("c-1"),
            "realtime:chat_messages:conversation_id=eq.c-1"
        );
        assert_ne!(conversation_topic("c-1"), conversation_topic("c-2"));
    }

    #[test]
    fn insert_frame_decodes_to_message() {
        let topic = conversation_topic("c-1");
        let message = decode_insert(&insert_frame(&topic, "m-9"), &topic).unwrap();
        assert_eq!(message.id, "m-9");
        assert_eq!(message.sender_role, ChatRole::Worker);
        assert_eq!(message.content, "Done with the interior");
    }

    #[test]
    fn frames_for_other_topics_are_ignored() {
        let topic = conversation_topic("c-1");
        let other = insert_frame(&conversation_topic("c-2"), "m-9");
        assert!(decode_insert(&other, &topic).is_none());
    }

    #[test]
    fn non_insert_events_are_ignored() {
        let topic = conversation_topic("c-1");
        let reply = json!({
            "topic": topic,
            "event": "phx_reply",
            "payload": {"status": "ok"}
        })
        .to_string();
        assert!(decode_insert(&reply, &topic).is_none());
    }

    #[test]
    fn malformed_frames_and_records_are_ignored() {
        let topic = conversation_topic("c-1");
        assert!(decode_insert("{not json", &topic).is_none());

        let bad_record = json!({
            "topic": topic,
            "event": "INSERT",
            "payload": {"record": {"id": 42}}
        })
        .to_string();
        assert!(decode_insert(&bad_record, &topic).is_none());
    }

    #[tokio::test]
    async fn noop_subscription_yields_nothing_and_unsubscribes_quietly() {
        let mut subscription = Subscription::noop();
        assert!(!subscription.is_live());
        assert!(subscription.next_message().await.is_none());
        Subscription::noop().unsubscribe();
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_to_noop() {
        // Nothing listens on this port; connect fails fast and the
        // conversation stays in pull mode.
        let handle = Arc::new(ClientHandle::new(BackendConfig {
            url: Some("http://127.0.0.1:9".to_string()),
            api_key: Some("anon-key".into()),
        }));
        let subscriber = RealtimeSubscriber::new(handle, RealtimeConfig::default());
        let subscription = subscriber.subscribe("c-1").await;
        assert!(!subscription.is_live());
    }

    #[tokio::test]
    async fn missing_client_degrades_to_noop() {
        let handle = Arc::new(ClientHandle::new(BackendConfig::default()));
        let subscriber = RealtimeSubscriber::new(handle, RealtimeConfig::default());
        let subscription = subscriber.subscribe("c-1").await;
        assert!(!subscription.is_live());
    }
}
