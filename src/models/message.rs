//! Message-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::timestamp;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
            Role::Admin => "admin",
        }
    }
}

/// Message payload kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    Photo,
    File,
    Audio,
    Video,
    VideoNote,
    Voice,
}

/// Chat message as delivered by history fetches and realtime events.
///
/// Two messages are equal when their ids are equal; content and timestamps
/// are not compared.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "WireMessage")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub content: String,
    pub role: Role,
    pub kind: MessageKind,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Message {}

/// Raw message shape; timestamps are still text here.
#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(deserialize_with = "super::string_or_number")]
    id: String,
    #[serde(
        alias = "chatId",
        alias = "chat",
        deserialize_with = "super::string_or_number"
    )]
    chat_id: String,
    #[serde(default)]
    content: String,
    role: Role,
    #[serde(
        default,
        alias = "messageType",
        alias = "type",
        alias = "kind"
    )]
    message_type: MessageKind,
    #[serde(default)]
    caption: Option<String>,
    #[serde(alias = "createdAt")]
    created_at: String,
    #[serde(default, alias = "updatedAt")]
    updated_at: Option<String>,
}

impl TryFrom<WireMessage> for Message {
    type Error = SessionError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let created_at = timestamp::parse(&wire.created_at)?;
        let updated_at = match wire.updated_at.as_deref() {
            Some(raw) => timestamp::parse(raw)?,
            None => created_at,
        };

        Ok(Self {
            id: wire.id,
            chat_id: wire.chat_id,
            content: wire.content,
            role: wire.role,
            kind: wire.message_type,
            caption: wire.caption.filter(|c| !c.is_empty()),
            created_at,
            updated_at,
        })
    }
}

impl Message {
    /// Decode a realtime `message_added` payload (`{"message": {...}}` or bare).
    pub fn from_event(payload: serde_json::Value) -> Result<Self, SessionError> {
        let inner = super::unwrap_envelope(payload, "message");
        serde_json::from_value(inner)
            .map_err(|e| SessionError::InvalidResponse(format!("message payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_snake_case() {
        let msg: Message = serde_json::from_value(json!({
            "id": "m1",
            "chat_id": "c1",
            "content": "hello",
            "role": "bot",
            "message_type": "video_note",
            "caption": "clip",
            "created_at": "2024-03-05T14:30:15.250Z",
            "updated_at": "2024-03-05 14:31:00"
        }))
        .unwrap();

        assert_eq!(msg.id, "m1");
        assert_eq!(msg.chat_id, "c1");
        assert_eq!(msg.role, Role::Bot);
        assert_eq!(msg.kind, MessageKind::VideoNote);
        assert_eq!(msg.caption.as_deref(), Some("clip"));
        assert!(msg.updated_at > msg.created_at);
    }

    #[test]
    fn test_decode_camel_case_numeric_ids() {
        let msg: Message = serde_json::from_value(json!({
            "id": 42,
            "chatId": 7,
            "content": "hi",
            "role": "admin",
            "type": "photo",
            "createdAt": "2024-03-05"
        }))
        .unwrap();

        assert_eq!(msg.id, "42");
        assert_eq!(msg.chat_id, "7");
        assert_eq!(msg.kind, MessageKind::Photo);
        assert_eq!(msg.updated_at, msg.created_at);
        assert_eq!(msg.caption, None);
    }

    #[test]
    fn test_kind_defaults_to_text() {
        let msg: Message = serde_json::from_value(json!({
            "id": "m1",
            "chat_id": "c1",
            "role": "user",
            "created_at": "2024-03-05T14:30:15Z"
        }))
        .unwrap();
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.content, "");
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let result = serde_json::from_value::<Message>(json!({
            "id": "m1",
            "chat_id": "c1",
            "role": "user",
            "created_at": "last tuesday"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result = serde_json::from_value::<Message>(json!({
            "id": "m1",
            "chat_id": "c1",
            "role": "system",
            "created_at": "2024-03-05T14:30:15Z"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_event_envelope_and_bare() {
        let body = json!({
            "id": "m1",
            "chat_id": "c1",
            "content": "hi",
            "role": "user",
            "created_at": "2024-03-05T14:30:15Z"
        });
        let wrapped = Message::from_event(json!({ "message": body.clone() })).unwrap();
        let bare = Message::from_event(body).unwrap();
        assert_eq!(wrapped, bare);
        assert!(matches!(
            Message::from_event(json!({ "message": "nope" })),
            Err(SessionError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_equality_by_id_only() {
        let a = Message::from_event(json!({
            "id": "same", "chat_id": "c", "content": "one", "role": "user",
            "created_at": "2024-03-05T14:30:15Z"
        }))
        .unwrap();
        let b = Message::from_event(json!({
            "id": "same", "chat_id": "c", "content": "two", "role": "bot",
            "created_at": "2024-03-06T14:30:15Z"
        }))
        .unwrap();
        assert_eq!(a, b);
    }
}
