//! Single-resolution signal for bounded handshake waits

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::{HandshakeStage, Result, SessionError};

/// A slot that can be resolved at most once per arming.
///
/// The waiter holds the receiver; whichever signal source resolves first
/// wins, and every later `resolve` is ignored.
pub(crate) struct PendingSignal<T> {
    slot: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> PendingSignal<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Arm the signal. Any previous waiter is abandoned.
    pub fn arm(&self) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
        rx
    }

    /// Deliver `value` if armed. Returns whether this call resolved it.
    pub fn resolve(&self, value: T) -> bool {
        let sender = self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        match sender {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    pub fn disarm(&self) {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}

/// Race a signal against a timer.
pub(crate) async fn wait_bounded<T>(
    rx: oneshot::Receiver<T>,
    limit: Duration,
    stage: HandshakeStage,
) -> Result<T> {
    match tokio::time::timeout(limit, rx).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(_)) => Err(SessionError::Channel(format!("{} wait was abandoned", stage))),
        Err(_) => Err(SessionError::Timeout {
            stage,
            after: limit,
        }),
    }
}
