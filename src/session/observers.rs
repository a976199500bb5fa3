//! Observer registry for session notifications

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::state::{ConnectionState, SessionState};
use crate::models::{Chat, Message};

/// Notifications delivered to subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    ConnectionChanged(ConnectionState),
    /// History was absorbed into the timeline; carries the message count.
    HistoryLoaded(usize),
    MessageAdded(Message),
    ChatUpdated(Chat),
    Typing(bool),
    /// A best-effort step failed; the session keeps going.
    Warning(String),
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Observers {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(SubscriptionId, Callback)>>,
}

impl Observers {
    pub fn subscribe(&self, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, callback));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut guard = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
        let before = guard.len();
        guard.retain(|(existing, _)| *existing != id);
        guard.len() != before
    }

    /// Invoke every subscriber. Callbacks run without the registry locked,
    /// so they may subscribe or unsubscribe themselves.
    pub fn emit(&self, event: &SessionEvent) {
        let snapshot: Vec<Callback> = self
            .callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let observers = Observers::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let id = observers.subscribe(Arc::new(move |event: &SessionEvent| {
            if let SessionEvent::Typing(t) = event {
                sink.lock().unwrap().push(*t);
            }
        }));

        observers.emit(&SessionEvent::Typing(true));
        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        observers.emit(&SessionEvent::Typing(false));

        assert_eq!(*seen.lock().unwrap(), vec![true]);
    }

    #[test]
    fn test_callback_may_reenter_registry() {
        let observers = Arc::new(Observers::default());
        let inner = Arc::clone(&observers);
        observers.subscribe(Arc::new(move |_: &SessionEvent| {
            inner.subscribe(Arc::new(|_: &SessionEvent| {}));
        }));
        observers.emit(&SessionEvent::HistoryLoaded(0));
        assert_eq!(observers.callbacks.lock().unwrap().len(), 2);
    }
}
