//! Socket.IO realtime channel over a WebSocket
//!
//! One background task owns the socket. It answers engine pings, performs
//! the namespace connect with the API key, forwards events to the session
//! and routes acknowledgments back to the `emit_with_ack` caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::frame::{self, Packet};
use super::{ChannelEvent, RealtimeChannel};
use crate::error::{Result, SessionError};

/// How long `close` waits for the socket task to say goodbye.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

type PendingAcks = Arc<Mutex<HashMap<u64, oneshot::Sender<serde_json::Value>>>>;

enum Outgoing {
    Frame(String),
    Close,
}

struct Connection {
    outgoing: mpsc::UnboundedSender<Outgoing>,
    pending: PendingAcks,
    next_ack_id: u64,
    task: JoinHandle<()>,
}

pub struct SocketIoChannel {
    endpoint: String,
    credential: String,
    connection: Mutex<Option<Connection>>,
}

impl SocketIoChannel {
    pub fn new(endpoint: &str, credential: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            credential: credential.to_string(),
            connection: Mutex::new(None),
        }
    }

    fn take_connection(&self) -> Option<Connection> {
        self.connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}

/// WebSocket URL for the Socket.IO endpoint on the same host as the REST API.
pub fn socket_url(endpoint: &str) -> Result<String> {
    let mut url = url::Url::parse(endpoint)
        .map_err(|e| SessionError::Channel(format!("invalid endpoint {}: {}", endpoint, e)))?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(SessionError::Channel(format!(
                "unsupported endpoint scheme {}",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| SessionError::Channel(format!("cannot use {} for {}", scheme, endpoint)))?;

    let path = format!("{}/socket.io/", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url.to_string())
}

#[async_trait]
impl RealtimeChannel for SocketIoChannel {
    async fn open(&self, events: mpsc::UnboundedSender<ChannelEvent>) -> Result<()> {
        let ws_url = socket_url(&self.endpoint)?;

        // A second open replaces the previous connection.
        self.close().await;

        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let pending: PendingAcks = Arc::new(Mutex::new(HashMap::new()));
        let auth = serde_json::json!({ "api_key": self.credential });

        let task = tokio::spawn(run_socket(
            ws_url,
            auth,
            events,
            outgoing_rx,
            Arc::clone(&pending),
        ));

        *self.connection.lock().unwrap_or_else(|e| e.into_inner()) = Some(Connection {
            outgoing,
            pending,
            next_ack_id: 0,
            task,
        });
        Ok(())
    }

    async fn emit_with_ack(
        &self,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let (tx, rx) = oneshot::channel();
        {
            let mut guard = self.connection.lock().unwrap_or_else(|e| e.into_inner());
            let conn = guard
                .as_mut()
                .ok_or_else(|| SessionError::Channel("realtime channel is not open".to_string()))?;

            let id = conn.next_ack_id;
            conn.next_ack_id += 1;
            conn.pending
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(id, tx);

            let text = frame::encode_event(event, &payload, Some(id));
            if conn.outgoing.send(Outgoing::Frame(text)).is_err() {
                conn.pending
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&id);
                return Err(SessionError::Channel("realtime channel is closed".to_string()));
            }
        }

        rx.await.map_err(|_| {
            SessionError::Channel(format!("connection closed before {} was acknowledged", event))
        })
    }

    async fn close(&self) {
        let Some(mut conn) = self.take_connection() else {
            return;
        };
        let _ = conn.outgoing.send(Outgoing::Close);

        tokio::select! {
            _ = &mut conn.task => {}
            _ = tokio::time::sleep(CLOSE_GRACE) => {
                tracing::debug!("Socket task did not finish in time; aborting");
                conn.task.abort();
            }
        }
    }
}

/// Socket task: connect, then pump frames until either side closes.
async fn run_socket(
    ws_url: String,
    auth: serde_json::Value,
    events: mpsc::UnboundedSender<ChannelEvent>,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    pending: PendingAcks,
) {
    tracing::info!("Connecting WebSocket to {}", ws_url);

    let stream = match connect_async(&ws_url).await {
        Ok((stream, response)) => {
            tracing::info!("WebSocket connected (status={})", response.status());
            stream
        }
        Err(e) => {
            let _ = events.send(ChannelEvent::Error(format!("WebSocket connection failed: {}", e)));
            return;
        }
    };
    let (mut sink, mut source) = stream.split();

    let reason = loop {
        tokio::select! {
            out = outgoing.recv() => {
                let text = match out {
                    Some(Outgoing::Frame(text)) => text,
                    Some(Outgoing::Close) | None => {
                        let _ = sink.send(Message::Text("41".to_string())).await;
                        let _ = sink.close().await;
                        break Some("closed by client".to_string());
                    }
                };
                tracing::debug!("WS send: {}", text);
                if let Err(e) = sink.send(Message::Text(text)).await {
                    let _ = events.send(ChannelEvent::Error(format!("WebSocket send failed: {}", e)));
                    break Some(e.to_string());
                }
            }
            incoming = source.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("WS recv: {}", text);
                        let Some(packet) = frame::parse(&text) else {
                            tracing::debug!("Ignoring unrecognized frame: {}", text);
                            continue;
                        };
                        let reply = match packet {
                            Packet::Open(_) => Some(frame::encode_connect(Some(&auth))),
                            Packet::Ping => Some(frame::encode_pong().to_string()),
                            Packet::Pong | Packet::Noop => None,
                            Packet::Connect(_) => {
                                let _ = events.send(ChannelEvent::Connected);
                                None
                            }
                            Packet::Event { ack_id, name, payload } => {
                                let _ = events.send(ChannelEvent::Event { name, payload });
                                ack_id.map(|id| frame::encode_ack(id, &serde_json::Value::Null))
                            }
                            Packet::Ack { id, payload } => {
                                let waiter = pending
                                    .lock()
                                    .unwrap_or_else(|e| e.into_inner())
                                    .remove(&id);
                                match waiter {
                                    Some(tx) => {
                                        let _ = tx.send(payload);
                                    }
                                    None => tracing::debug!("Ack {} has no waiter", id),
                                }
                                None
                            }
                            Packet::ConnectError(detail) => {
                                let _ = events.send(ChannelEvent::Error(detail.clone()));
                                break Some(detail);
                            }
                            Packet::Disconnect | Packet::Close => {
                                break Some("closed by server".to_string());
                            }
                        };
                        if let Some(reply) = reply {
                            tracing::debug!("WS send: {}", reply);
                            if let Err(e) = sink.send(Message::Text(reply)).await {
                                tracing::warn!("Failed to send reply frame: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            tracing::warn!("Failed to send pong: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(close_frame))) => {
                        tracing::info!("WebSocket closed: {:?}", close_frame);
                        break close_frame.map(|f| f.reason.to_string());
                    }
                    Some(Ok(other)) => {
                        tracing::debug!("WS frame (ignored): {:?}", other);
                    }
                    Some(Err(e)) => {
                        let _ = events.send(ChannelEvent::Error(format!("WebSocket receive error: {}", e)));
                        break Some(e.to_string());
                    }
                    None => break None,
                }
            }
        }
    };

    // Dropping the senders fails any emit still waiting for an ack.
    pending.lock().unwrap_or_else(|e| e.into_inner()).clear();
    let _ = events.send(ChannelEvent::Disconnected(reason));
}
