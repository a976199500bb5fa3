//! Realtime event pump

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::observers::SessionEvent;
use super::state::ConnectionState;
use super::Shared;
use crate::error::SessionError;
use crate::models::{Chat, Message, TypingIndicator};
use crate::transport::ChannelEvent;

pub(super) const MESSAGE_ADDED: &str = "message_added";
pub(super) const CHAT_UPDATED: &str = "chat_updated";
pub(super) const TYPING: &str = "typing";

/// Drain one channel's events until it goes away or a newer channel
/// replaces it.
pub(super) async fn pump_events(
    shared: Arc<Shared>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
) {
    while let Some(event) = events.recv().await {
        if shared.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Dropping event from a replaced channel: {:?}", event);
            break;
        }
        handle_channel_event(&shared, event);
    }
    tracing::debug!("Event pump {} finished", generation);
}

pub(super) fn handle_channel_event(shared: &Shared, event: ChannelEvent) {
    match event {
        ChannelEvent::Connected => {
            tracing::info!("Realtime channel connected");
            shared.set_connection_state(ConnectionState::Connected);
            shared.connected.resolve(Ok(()));
        }
        ChannelEvent::Disconnected(reason) => {
            let reason = reason.unwrap_or_else(|| "no reason given".to_string());
            tracing::info!("Realtime channel disconnected: {}", reason);
            shared.set_connection_state(ConnectionState::Disconnected);
            shared.connected.resolve(Err(SessionError::Channel(format!(
                "disconnected before connecting: {}",
                reason
            ))));
        }
        ChannelEvent::Error(detail) => {
            tracing::warn!("Realtime channel error: {}", detail);
            shared.set_connection_state(ConnectionState::Errored);
            // During the handshake the error fails the connect step; later
            // it is only reported.
            if !shared.connected.resolve(Err(SessionError::Channel(detail.clone()))) {
                shared.warn(format!("realtime channel error: {}", detail));
            }
        }
        ChannelEvent::Event { name, payload } => match name.as_str() {
            MESSAGE_ADDED => match Message::from_event(payload) {
                Ok(message) => {
                    let added = shared.timeline_write().insert(message.clone());
                    if added {
                        shared.observers.emit(&SessionEvent::MessageAdded(message));
                    } else {
                        tracing::debug!("Ignoring duplicate message {}", message.id);
                    }
                }
                Err(e) => shared.warn(format!("dropped {} event: {}", MESSAGE_ADDED, e)),
            },
            CHAT_UPDATED => match Chat::from_event(payload) {
                Ok(chat) => {
                    shared.lock_inner().chat = Some(chat.clone());
                    shared.observers.emit(&SessionEvent::ChatUpdated(chat));
                }
                Err(e) => shared.warn(format!("dropped {} event: {}", CHAT_UPDATED, e)),
            },
            TYPING => match TypingIndicator::from_event(payload) {
                Ok(typing) => {
                    shared.lock_inner().peer_typing = typing.is_typing;
                    shared.observers.emit(&SessionEvent::Typing(typing.is_typing));
                }
                Err(e) => shared.warn(format!("dropped {} event: {}", TYPING, e)),
            },
            other => tracing::debug!("Ignoring realtime event {}", other),
        },
    }
}
