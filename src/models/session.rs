//! Handshake payloads

use serde::Deserialize;

/// Result of the init request: the canonical chat identity for this device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InitResponse {
    #[serde(
        rename = "session_id",
        alias = "sessionId",
        alias = "identity",
        deserialize_with = "super::string_or_number"
    )]
    pub identity: String,
    #[serde(
        default,
        rename = "welcome_message",
        alias = "welcomeMessage",
        alias = "welcome_text"
    )]
    pub welcome_text: Option<String>,
}

/// Acknowledgment payload for the `integration_join` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinAck {
    pub status: String,
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}

impl JoinAck {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok") || self.status.eq_ignore_ascii_case("success")
    }
}
