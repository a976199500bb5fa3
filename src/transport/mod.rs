//! Transport capabilities the session core depends on
//!
//! The core only needs "send request, get response" and "open a channel,
//! emit, receive, observe connect/disconnect". Concrete adapters live in
//! [`http`] and [`socket`].

pub mod frame;
pub mod http;
pub mod socket;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::{Attachment, InitResponse, Message};

pub use http::HttpTransport;
pub use socket::SocketIoChannel;

/// Request/response calls against the chat backend.
#[async_trait]
pub trait RequestTransport: Send + Sync {
    /// Create or resume a chat. Passing a known identity returns it unchanged.
    async fn init(&self, identity: Option<&str>, display_name: &str) -> Result<InitResponse>;

    /// Fetch stored messages. Server ordering is not relied upon.
    async fn fetch_messages(
        &self,
        identity: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<Vec<Message>>;

    /// Submit a message. The message itself arrives later over the channel.
    async fn send_message(
        &self,
        identity: &str,
        content: &str,
        attachments: &[Attachment],
    ) -> Result<()>;

    async fn upload_attachment(
        &self,
        identity: &str,
        bytes: Vec<u8>,
        name: &str,
        mime_type: &str,
    ) -> Result<Attachment>;
}

/// Notifications delivered by a realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Disconnected(Option<String>),
    Error(String),
    Event {
        name: String,
        payload: serde_json::Value,
    },
}

/// Persistent bidirectional event channel.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Begin connecting. Progress, including `Connected`, arrives on `events`.
    async fn open(&self, events: mpsc::UnboundedSender<ChannelEvent>) -> Result<()>;

    /// Emit an event and wait for the peer's acknowledgment payload.
    /// Callers bound the wait themselves.
    async fn emit_with_ack(
        &self,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value>;

    /// Tear the connection down. Safe to call when not open.
    async fn close(&self);
}
