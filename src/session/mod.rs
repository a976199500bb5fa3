//! Session lifecycle: init, history, connect, join
//!
//! `SessionClient` drives the handshake against a request transport and a
//! realtime channel, owns the message timeline and fans notifications out
//! to subscribers. Realtime events are handled by a background pump task
//! that runs alongside request calls.

mod events;
mod observers;
mod signal;
mod state;


use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::DEFAULT_DISPLAY_NAME;
use crate::error::{HandshakeStage, Result, SessionError};
use crate::identity::IdentityStore;
use crate::models::{Attachment, Chat, JoinAck, Message};
use crate::timeline::{self, Timeline};
use crate::transport::{RealtimeChannel, RequestTransport};

pub use observers::{SessionEvent, SubscriptionId};
pub use state::{ConnectionState, SessionState};

use signal::{wait_bounded, PendingSignal};

const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_HISTORY_LIMIT: usize = 50;
const JOIN_EVENT: &str = "integration_join";

/// Connection parameters for one session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub endpoint: String,
    pub credential: String,
    pub display_name: String,
    pub connect_timeout: Duration,
    pub join_timeout: Duration,
    pub history_limit: usize,
}

impl SessionOptions {
    pub fn new(endpoint: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential: credential.into(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            connect_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            join_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

#[derive(Debug)]
struct Inner {
    session_state: SessionState,
    connection_state: ConnectionState,
    /// Set only once an init succeeded in this process.
    identity: Option<String>,
    welcome_text: Option<String>,
    chat: Option<Chat>,
    peer_typing: bool,
}

/// State reachable from both the caller and the event pump.
struct Shared {
    inner: Mutex<Inner>,
    timeline: RwLock<Timeline>,
    connected: PendingSignal<Result<()>>,
    observers: observers::Observers,
    /// Bumped whenever a channel is opened or torn down; pumps holding an
    /// older value stop delivering.
    generation: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                session_state: SessionState::Uninitialized,
                connection_state: ConnectionState::Disconnected,
                identity: None,
                welcome_text: None,
                chat: None,
                peer_typing: false,
            }),
            timeline: RwLock::new(Timeline::new()),
            connected: PendingSignal::new(),
            observers: observers::Observers::default(),
            generation: AtomicU64::new(0),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn timeline_read(&self) -> RwLockReadGuard<'_, Timeline> {
        self.timeline.read().unwrap_or_else(|e| e.into_inner())
    }

    fn timeline_write(&self) -> RwLockWriteGuard<'_, Timeline> {
        self.timeline.write().unwrap_or_else(|e| e.into_inner())
    }

    fn set_session_state(&self, state: SessionState) {
        {
            let mut inner = self.lock_inner();
            if inner.session_state == state {
                return;
            }
            inner.session_state = state.clone();
        }
        tracing::debug!("Session state: {}", state);
        self.observers.emit(&SessionEvent::StateChanged(state));
    }

    fn set_connection_state(&self, state: ConnectionState) {
        {
            let mut inner = self.lock_inner();
            if inner.connection_state == state {
                return;
            }
            inner.connection_state = state;
        }
        tracing::debug!("Connection state: {}", state.as_str());
        self.observers.emit(&SessionEvent::ConnectionChanged(state));
    }

    /// Report a best-effort failure without touching session state.
    fn warn(&self, detail: String) {
        tracing::warn!("{}", detail);
        self.observers.emit(&SessionEvent::Warning(detail));
    }
}

/// Client for one chat session.
pub struct SessionClient {
    options: SessionOptions,
    identities: IdentityStore,
    requests: Arc<dyn RequestTransport>,
    channel: Arc<dyn RealtimeChannel>,
    shared: Arc<Shared>,
    /// Held for the whole of `start()`.
    lifecycle: tokio::sync::Mutex<()>,
    cancel: watch::Sender<()>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl SessionClient {
    pub fn new(
        options: SessionOptions,
        identities: IdentityStore,
        requests: Arc<dyn RequestTransport>,
        channel: Arc<dyn RealtimeChannel>,
    ) -> Self {
        let (cancel, _) = watch::channel(());
        Self {
            options,
            identities,
            requests,
            channel,
            shared: Arc::new(Shared::new()),
            lifecycle: tokio::sync::Mutex::new(()),
            cancel,
            pump: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Run the full handshake. Succeeds once the session is active.
    ///
    /// Returns immediately if the session is already active, connected and
    /// holds an identity.
    /// Fails with [`SessionError::InvalidState`] if another `start()` is in
    /// flight, and with [`SessionError::Cancelled`] if [`stop`](Self::stop)
    /// interrupts it.
    pub async fn start(&self) -> Result<()> {
        let Ok(_guard) = self.lifecycle.try_lock() else {
            return Err(SessionError::InvalidState("a start is already in progress"));
        };

        if self.session_state().is_active()
            && self.connection_state() == ConnectionState::Connected
            && self.identity().is_some()
        {
            tracing::debug!("Session already active");
            return Ok(());
        }

        let mut cancelled = self.cancel.subscribe();
        let outcome = tokio::select! {
            biased;
            _ = cancelled.changed() => Err(SessionError::Cancelled),
            result = self.handshake() => result,
        };

        match &outcome {
            Ok(()) => tracing::info!("Session active"),
            Err(e) => {
                tracing::warn!("Session start failed: {}", e);
                self.teardown().await;
                self.shared
                    .set_session_state(SessionState::Failed(e.to_string()));
            }
        }
        outcome
    }

    async fn handshake(&self) -> Result<()> {
        let opts = &self.options;

        self.shared.set_session_state(SessionState::Initializing);
        let known = self.identity().or_else(|| {
            self.identities
                .resolve(&opts.endpoint, &opts.credential, &opts.display_name)
        });
        tracing::info!(
            "Initializing chat session ({})",
            if known.is_some() { "resuming" } else { "new" }
        );
        let init = self
            .requests
            .init(known.as_deref(), &opts.display_name)
            .await?;
        self.identities.persist(
            &opts.endpoint,
            &opts.credential,
            &opts.display_name,
            &init.identity,
        );
        {
            let mut inner = self.shared.lock_inner();
            inner.identity = Some(init.identity.clone());
            inner.welcome_text = init.welcome_text;
        }

        self.shared.set_session_state(SessionState::HistoryLoading);
        self.load_history(&init.identity).await;

        self.shared.set_session_state(SessionState::Connecting);
        self.connect_channel().await?;

        self.shared.set_session_state(SessionState::Joining);
        self.join(&init.identity).await?;

        self.shared.set_session_state(SessionState::Active);
        Ok(())
    }

    /// Seed the timeline. Failures leave it as it was.
    async fn load_history(&self, identity: &str) {
        match self
            .requests
            .fetch_messages(identity, self.options.history_limit, None)
            .await
        {
            Ok(messages) => {
                let count = self.shared.timeline_write().replace_all(messages);
                tracing::info!("Loaded {} history messages", count);
                self.shared
                    .observers
                    .emit(&SessionEvent::HistoryLoaded(count));
            }
            Err(e) => self.shared.warn(format!("history load failed: {}", e)),
        }
    }

    async fn connect_channel(&self) -> Result<()> {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let connected = self.shared.connected.arm();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let pump = tokio::spawn(events::pump_events(
            Arc::clone(&self.shared),
            generation,
            events_rx,
        ));
        let previous = self.lock_pump().replace(pump);
        if let Some(previous) = previous {
            previous.abort();
        }

        self.shared.set_connection_state(ConnectionState::Connecting);
        self.channel.open(events_tx).await?;

        let outcome = wait_bounded(
            connected,
            self.options.connect_timeout,
            HandshakeStage::Connect,
        )
        .await;
        self.shared.connected.disarm();
        outcome?
    }

    async fn join(&self, identity: &str) -> Result<()> {
        let payload = serde_json::json!({ "session_id": identity });
        let reply = tokio::time::timeout(
            self.options.join_timeout,
            self.channel.emit_with_ack(JOIN_EVENT, payload),
        )
        .await
        .map_err(|_| SessionError::Timeout {
            stage: HandshakeStage::Join,
            after: self.options.join_timeout,
        })??;

        let ack: JoinAck = serde_json::from_value(reply)
            .map_err(|e| SessionError::InvalidResponse(format!("join acknowledgment: {}", e)))?;
        if ack.is_ok() {
            return Ok(());
        }
        Err(SessionError::Channel(ack.message.unwrap_or_else(|| {
            format!("join rejected with status {}", ack.status)
        })))
    }

    /// Close the channel and cancel an in-flight `start()`. Identity and
    /// timeline are kept, so a later `start()` resumes the same chat.
    pub async fn stop(&self) {
        self.cancel.send_replace(());
        self.teardown().await;
        tracing::info!("Session stopped");
    }

    async fn teardown(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.connected.disarm();
        let pump = self.lock_pump().take();
        if let Some(pump) = pump {
            pump.abort();
        }
        self.channel.close().await;
        self.shared
            .set_connection_state(ConnectionState::Disconnected);
    }

    /// Submit a message. It shows up in the timeline once the server echoes
    /// it over the realtime channel.
    pub async fn send_message(&self, content: &str, attachments: &[Attachment]) -> Result<()> {
        let identity = self.require_identity()?;
        self.requests
            .send_message(&identity, content, attachments)
            .await
    }

    /// Fetch a page of history without touching the live timeline.
    pub async fn fetch_history(&self, limit: usize, cursor: Option<&str>) -> Result<Vec<Message>> {
        let identity = self.require_identity()?;
        let messages = self
            .requests
            .fetch_messages(&identity, limit, cursor)
            .await?;
        Ok(timeline::normalize(messages))
    }

    pub async fn upload_attachment(
        &self,
        bytes: Vec<u8>,
        name: &str,
        mime_type: &str,
    ) -> Result<Attachment> {
        let identity = self.require_identity()?;
        self.requests
            .upload_attachment(&identity, bytes, name, mime_type)
            .await
    }

    /// Forget the identity here and in storage. The next `start()` asks the
    /// server for a new chat.
    pub fn clear_identity(&self) {
        {
            let mut inner = self.shared.lock_inner();
            inner.identity = None;
            inner.welcome_text = None;
        }
        let opts = &self.options;
        self.identities
            .clear(&opts.endpoint, &opts.credential, &opts.display_name);
    }

    fn require_identity(&self) -> Result<String> {
        self.identity().ok_or(SessionError::NotInitialized)
    }

    fn lock_pump(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pump.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn session_state(&self) -> SessionState {
        self.shared.lock_inner().session_state.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.lock_inner().connection_state
    }

    pub fn identity(&self) -> Option<String> {
        self.shared.lock_inner().identity.clone()
    }

    pub fn welcome_text(&self) -> Option<String> {
        self.shared.lock_inner().welcome_text.clone()
    }

    /// Snapshot of the timeline.
    pub fn timeline(&self) -> Vec<Message> {
        self.shared.timeline_read().all()
    }

    /// Latest chat metadata pushed by the server.
    pub fn chat(&self) -> Option<Chat> {
        self.shared.lock_inner().chat.clone()
    }

    pub fn is_peer_typing(&self) -> bool {
        self.shared.lock_inner().peer_typing
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.shared.observers.subscribe(Arc::new(callback))
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.observers.unsubscribe(id)
    }

    pub fn on_state_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if let SessionEvent::StateChanged(state) = event {
                callback(state);
            }
        })
    }

    pub fn on_connection_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if let SessionEvent::ConnectionChanged(state) = event {
                callback(*state);
            }
        })
    }

    pub fn on_message<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if let SessionEvent::MessageAdded(message) = event {
                callback(message);
            }
        })
    }

    pub fn on_chat_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Chat) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            if let SessionEvent::ChatUpdated(chat) = event {
                callback(chat);
            }
        })
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        if let Some(pump) = self.lock_pump().take() {
            pump.abort();
        }
    }
}
