//! Session and connection state

/// Handshake progress of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    HistoryLoading,
    Connecting,
    Joining,
    Active,
    /// Terminal for one `start()` call; carries the failure description.
    Failed(String),
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SessionState::Failed(_))
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Uninitialized => f.write_str("uninitialized"),
            SessionState::Initializing => f.write_str("initializing"),
            SessionState::HistoryLoading => f.write_str("loading history"),
            SessionState::Connecting => f.write_str("connecting"),
            SessionState::Joining => f.write_str("joining"),
            SessionState::Active => f.write_str("active"),
            SessionState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Realtime channel status, driven by transport notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Errored => "errored",
        }
    }
}
