use super::state::{
    ActiveSession, ConversationManager, ConversationUpdate, Phase, SubmitRejected,
    STREAM_ERROR_NOTICE, TRANSPORT_ERROR_NOTICE,
};
use super::streaming::{
    check_health_within, run_health_probe, run_session, SessionEvent,
};
use crate::config::Settings;
use crate::error::ChatError;
use crate::types::{ChatMessage, ChatRequest, MessageId, MessageStatus};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl ConversationManager {
    /// Starts a send cycle for `user_text`.
    ///
    /// The user entry and the empty assistant placeholder are appended before
    /// this returns, and the in-flight flag is set before any await point, so
    /// a second submit can never slip in. Must be called inside a Tokio
    /// runtime; the stream session runs as a spawned task.
    pub fn submit(&mut self, user_text: &str) -> Result<MessageId, SubmitRejected> {
        let text = user_text.trim();
        if text.is_empty() {
            return Err(SubmitRejected::EmptyMessage);
        }
        if let Some(active) = &self.active {
            debug!(session_id = active.session_id, "submit rejected while in flight");
            return Err(SubmitRejected::InFlight);
        }
        if !self.settings.has_api_key() {
            warn!("submit blocked: no API key configured");
            return Err(SubmitRejected::MissingApiKey);
        }

        let user_message = ChatMessage::user(text);
        let placeholder = ChatMessage::assistant_placeholder();
        let target = placeholder.id();
        self.push_message(user_message);
        self.push_message(placeholder);

        let request = ChatRequest::new(&self.settings, text);
        self.next_session_id += 1;
        let session_id = self.next_session_id;
        let cancel = self.shutdown.child_token();
        self.active = Some(ActiveSession {
            session_id,
            target,
            cancel: cancel.clone(),
        });
        self.set_phase(Phase::Sending);
        info!(session_id, message_id = %target, model = %request.model, "chat message submitted");

        tokio::spawn(run_session(
            Arc::clone(&self.transport),
            request,
            session_id,
            self.events_tx.clone(),
            cancel,
        ));
        Ok(target)
    }

    /// Applies one session event. Events from sessions that are no longer
    /// active (cancelled by [`Self::clear`]) are dropped.
    pub fn apply(&mut self, event: SessionEvent) {
        let Some(active) = &self.active else {
            debug!(session_id = event.session_id(), "dropping event with no active session");
            return;
        };
        if active.session_id != event.session_id() {
            debug!(
                session_id = event.session_id(),
                active_session_id = active.session_id,
                "dropping event from stale session"
            );
            return;
        }
        let target = active.target;

        match event {
            SessionEvent::Fragment { text, .. } => {
                if self.transcript.append_fragment(target, &text) {
                    self.set_phase(Phase::Streaming);
                    self.emit(ConversationUpdate::Fragment { id: target, text });
                }
            }
            SessionEvent::Completed { session_id } => {
                self.finish_session(target, MessageStatus::Complete);
                info!(session_id, message_id = %target, "reply settled");
                self.set_phase(Phase::Settled);
            }
            SessionEvent::Failed { session_id, error } => {
                warn!(session_id, message_id = %target, %error, "chat session failed");
                if error.is_stream_read() {
                    self.transcript.append_notice(target, STREAM_ERROR_NOTICE);
                } else {
                    self.transcript.replace_content(target, TRANSPORT_ERROR_NOTICE);
                }
                self.finish_session(target, MessageStatus::Failed);
                self.set_phase(Phase::Idle);
            }
        }
    }

    /// Waits for the next event from the running session, if any. The
    /// returned event still has to be handed to [`Self::apply`].
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.active.as_ref()?;
        self.events_rx.recv().await
    }

    /// Applies every event that is already queued, without waiting.
    pub fn apply_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Drives the in-flight session, if any, until it settles or fails.
    pub async fn settle(&mut self) {
        while self.active.is_some() {
            match self.events_rx.recv().await {
                Some(event) => self.apply(event),
                None => break,
            }
        }
    }

    /// Discards the whole transcript. An in-flight session is cancelled so it
    /// cannot write into a message that is gone. Settings are untouched.
    pub fn clear(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            info!(session_id = active.session_id, "in-flight session cancelled by clear");
        }
        self.transcript.clear();
        self.emit(ConversationUpdate::Cleared);
        self.set_phase(Phase::Idle);
    }

    /// Persists and adopts `settings`, then starts a liveness probe in the
    /// background. Returns as soon as the record is stored; the probe result
    /// arrives through [`Self::apply_pending_health`] or [`Self::next_health`].
    ///
    /// A record with a blank model is refused with [`ChatError::Config`]; on
    /// that or a storage error the previous settings stay in effect.
    pub fn on_config_saved(&mut self, settings: Settings) -> Result<(), ChatError> {
        if settings.model.trim().is_empty() {
            return Err(ChatError::Config("model must not be empty".to_string()));
        }
        self.store.save(&settings)?;
        self.settings = settings;
        info!(
            model = %self.settings.model,
            has_api_key = self.settings.has_api_key(),
            "settings saved"
        );
        self.emit(ConversationUpdate::SettingsChanged);
        self.request_health_check();
        Ok(())
    }

    /// Spawns a liveness probe. It never blocks the caller or a send cycle.
    /// Must be called inside a Tokio runtime.
    pub fn request_health_check(&self) {
        tokio::spawn(run_health_probe(
            Arc::clone(&self.transport),
            self.health_timeout,
            self.health_tx.clone(),
            self.shutdown.child_token(),
        ));
    }

    /// Applies every probe result that has already arrived. Returns the most
    /// recent one, if any.
    pub fn apply_pending_health(&mut self) -> Option<bool> {
        let mut latest = None;
        while let Ok(healthy) = self.health_rx.try_recv() {
            self.apply_health(healthy);
            latest = Some(healthy);
        }
        latest
    }

    /// Waits for the next background probe result and applies it.
    pub async fn next_health(&mut self) -> Option<bool> {
        let healthy = self.health_rx.recv().await?;
        self.apply_health(healthy);
        Some(healthy)
    }

    /// Runs the liveness probe inline, bounded by the health timeout, and
    /// updates the connectivity indicator.
    pub async fn refresh_health(&mut self) -> bool {
        let healthy = check_health_within(self.transport.as_ref(), self.health_timeout).await;
        self.apply_health(healthy);
        healthy
    }

    fn apply_health(&mut self, healthy: bool) {
        if healthy != self.connected {
            self.connected = healthy;
            info!(connected = healthy, "backend connectivity changed");
            self.emit(ConversationUpdate::ConnectionChanged(healthy));
        }
    }

    fn push_message(&mut self, message: ChatMessage) {
        self.transcript.push(message.clone());
        self.emit(ConversationUpdate::MessageAppended(message));
    }

    fn finish_session(&mut self, target: MessageId, status: MessageStatus) {
        self.transcript.finalize(target, status);
        self.active = None;
        self.emit(ConversationUpdate::MessageFinalized { id: target, status });
    }
}
