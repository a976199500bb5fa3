//! Chat-related models

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::SessionError;
use crate::timestamp;

/// Chat metadata pushed through `chat_updated` events.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "WireChat")]
pub struct Chat {
    pub id: String,
    pub status: Option<String>,
    pub title: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields this client does not interpret, kept verbatim.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WireChat {
    #[serde(deserialize_with = "super::string_or_number")]
    id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "name", alias = "topic")]
    title: Option<String>,
    #[serde(default, alias = "updatedAt")]
    updated_at: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<WireChat> for Chat {
    type Error = SessionError;

    fn try_from(wire: WireChat) -> Result<Self, Self::Error> {
        let updated_at = wire.updated_at.as_deref().map(timestamp::parse).transpose()?;
        Ok(Self {
            id: wire.id,
            status: wire.status,
            title: wire.title,
            updated_at,
            extra: wire.extra,
        })
    }
}

impl Chat {
    /// Decode a realtime `chat_updated` payload (`{"chat": {...}}` or bare).
    pub fn from_event(payload: serde_json::Value) -> Result<Self, SessionError> {
        let inner = super::unwrap_envelope(payload, "chat");
        serde_json::from_value(inner)
            .map_err(|e| SessionError::InvalidResponse(format!("chat payload: {}", e)))
    }
}

/// Payload of a realtime `typing` event.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TypingIndicator {
    #[serde(alias = "isTyping", alias = "typing")]
    pub is_typing: bool,
}

impl TypingIndicator {
    pub fn from_event(payload: serde_json::Value) -> Result<Self, SessionError> {
        serde_json::from_value(payload)
            .map_err(|e| SessionError::InvalidResponse(format!("typing payload: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_from_envelope() {
        let chat = Chat::from_event(json!({
            "chat": {
                "id": 12,
                "status": "closed",
                "name": "Support",
                "updatedAt": "2024-03-05T14:30:15Z",
                "assigned_admin": "ann"
            }
        }))
        .unwrap();

        assert_eq!(chat.id, "12");
        assert_eq!(chat.status.as_deref(), Some("closed"));
        assert_eq!(chat.title.as_deref(), Some("Support"));
        assert!(chat.updated_at.is_some());
        assert_eq!(chat.extra.get("assigned_admin"), Some(&json!("ann")));
    }

    #[test]
    fn test_chat_missing_id() {
        assert!(Chat::from_event(json!({ "status": "open" })).is_err());
    }

    #[test]
    fn test_typing_aliases() {
        assert!(TypingIndicator::from_event(json!({ "isTyping": true })).unwrap().is_typing);
        assert!(!TypingIndicator::from_event(json!({ "is_typing": false })).unwrap().is_typing);
        assert!(TypingIndicator::from_event(json!({ "typing": "yes" })).is_err());
    }
}
