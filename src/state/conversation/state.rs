use super::streaming::SessionEvent;
use crate::api::ChatTransport;
use crate::config::{ConfigStore, Settings};
use crate::state::Transcript;
use crate::types::{ChatMessage, MessageId, MessageStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Placeholder content when the request fails before any reply streams in.
pub const TRANSPORT_ERROR_NOTICE: &str =
    "Sorry, I encountered an error. Please check your API key and try again.";
/// Appended to partial output when the reply stream breaks off.
pub const STREAM_ERROR_NOTICE: &str =
    "[Response interrupted: the connection was lost before the reply finished.]";
/// A liveness probe with no answer after this long counts as unhealthy.
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Request issued, no fragment received yet.
    Sending,
    Streaming,
    /// The last send cycle completed normally.
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("message is empty")]
    EmptyMessage,
    #[error("a reply is still streaming")]
    InFlight,
    #[error("no API key configured; set one in settings first")]
    MissingApiKey,
}

/// Change notifications pushed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationUpdate {
    MessageAppended(ChatMessage),
    Fragment { id: MessageId, text: String },
    MessageFinalized { id: MessageId, status: MessageStatus },
    PhaseChanged(Phase),
    Cleared,
    ConnectionChanged(bool),
    SettingsChanged,
}

/// The single in-flight send. Its presence is the in-flight flag.
pub(super) struct ActiveSession {
    pub(super) session_id: u64,
    pub(super) target: MessageId,
    pub(super) cancel: CancellationToken,
}

/// Owns the transcript and drives every send cycle.
///
/// All mutation goes through `&mut self`. Stream sessions run as spawned tasks
/// that only report [`SessionEvent`]s back; the owner applies them in arrival
/// order with [`ConversationManager::apply`].
pub struct ConversationManager {
    pub(super) transport: Arc<dyn ChatTransport>,
    pub(super) store: ConfigStore,
    pub(super) settings: Settings,
    pub(super) transcript: Transcript,
    pub(super) phase: Phase,
    pub(super) active: Option<ActiveSession>,
    pub(super) connected: bool,
    pub(super) next_session_id: u64,
    pub(super) events_tx: mpsc::UnboundedSender<SessionEvent>,
    pub(super) events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    pub(super) health_tx: mpsc::UnboundedSender<bool>,
    pub(super) health_rx: mpsc::UnboundedReceiver<bool>,
    pub(super) health_timeout: Duration,
    pub(super) update_tx: Option<mpsc::UnboundedSender<ConversationUpdate>>,
    pub(super) shutdown: CancellationToken,
}

impl ConversationManager {
    /// Builds a manager with settings loaded from `store`. The connectivity
    /// indicator starts optimistic until the first health probe reports.
    pub fn new(transport: Arc<dyn ChatTransport>, store: ConfigStore) -> Self {
        let settings = store.load();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (health_tx, health_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            store,
            settings,
            transcript: Transcript::new(),
            phase: Phase::Idle,
            active: None,
            connected: true,
            next_session_id: 0,
            events_tx,
            events_rx,
            health_tx,
            health_rx,
            health_timeout: HEALTH_PROBE_TIMEOUT,
            update_tx: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Routes change notifications to the returned receiver, replacing any
    /// earlier subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ConversationUpdate> {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        self.update_tx = Some(update_tx);
        update_rx
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.transcript.messages()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_in_flight(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(super) fn emit(&self, update: ConversationUpdate) {
        if let Some(tx) = &self.update_tx {
            let _ = tx.send(update);
        }
    }

    pub(super) fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            self.phase = phase;
            self.emit(ConversationUpdate::PhaseChanged(phase));
        }
    }
}

impl Drop for ConversationManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
