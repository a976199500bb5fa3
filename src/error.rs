//! Error types surfaced by the session core

use std::time::Duration;

use thiserror::Error;

/// Handshake step a bounded wait belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    Connect,
    Join,
}

impl std::fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandshakeStage::Connect => f.write_str("connect"),
            HandshakeStage::Join => f.write_str("join"),
        }
    }
}

/// Non-2xx responses from the chat backend.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server rejected the credential (401)")]
    Unauthorized,

    /// 404/405 on an optional endpoint: the server build does not ship it.
    #[error("{capability} is not deployed on this server (HTTP {status})")]
    CapabilityNotDeployed { capability: String, status: u16 },

    #[error("payload too large (413): {detail}")]
    PayloadTooLarge { detail: String },

    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is not initialized: no chat identity has been resolved yet")]
    NotInitialized,

    #[error("transport error: {context}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("server error: {0}")]
    Server(#[from] ServerError),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("{stage} timed out after {}s", after.as_secs())]
    Timeout {
        stage: HandshakeStage,
        after: Duration,
    },

    #[error("malformed timestamp: {0:?}")]
    MalformedTimestamp(String),

    #[error("session start was cancelled")]
    Cancelled,

    #[error("invalid session state: {0}")]
    InvalidState(&'static str),
}

impl SessionError {
    pub fn transport(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        SessionError::Transport {
            context: context.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_transport_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
        let err = SessionError::transport("POST https://chat.example/api/integration/init failed", cause);

        assert_eq!(
            err.to_string(),
            "transport error: POST https://chat.example/api/integration/init failed"
        );
        let source = err.source().expect("cause is kept");
        assert_eq!(source.to_string(), "connection reset");
        assert!(source.downcast_ref::<std::io::Error>().is_some());
    }
}
