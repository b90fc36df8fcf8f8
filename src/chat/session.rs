//! Stream session controller
//!
//! Drives one chat request from submission to resolution:
//!
//! ```text
//! Idle -> Awaiting -> Streaming* -> Completing -> Resolved
//!            \            \
//!             +------------+--> Failed   (timeout, transport, HTTP status, cancel)
//! ```
//!
//! Only one session runs at a time per controller. Every change to the message
//! log goes through a `LogSender`, so the log itself stays with whichever task
//! renders it.

use super::classifier::{classify, is_terminal};
use super::error::{ChatError, SubmitError};
use super::frame::{decode_frames, StreamFrame};
use super::log::{ChatTurn, LogSender, SourceDocument, TurnId, TurnIdGenerator, TurnPatch};
use super::progress::ProgressState;
use super::transport::{ChatRequest, ChatTransport, HttpTransport};
use crate::auth::{CredentialProvider, Credentials};
use crate::config::AppConfig;
use crate::i18n::{Locale, Text};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Where the controller is in its request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// Request sent, no frame yet
    Awaiting,
    /// At least one frame received
    Streaming,
    /// Answer known, waiting out the settle delay before the swap
    Completing,
    Resolved,
    Failed,
}

impl SessionPhase {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionPhase::Awaiting | SessionPhase::Streaming | SessionPhase::Completing
        )
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Deadline for the request plus the whole stream
    pub timeout: Duration,
    /// Pause after the bar reaches 100% before the answer replaces it
    pub settle_delay: Duration,
    pub locale: Locale,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout: config.timeouts.chat_timeout(),
            settle_delay: config.settle_delay(),
            locale: config.locale(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5 * 60),
            settle_delay: Duration::from_millis(500),
            locale: Locale::English,
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Resolved {
        /// Id of the turn that replaced the loading placeholder
        turn_id: TurnId,
        answer: String,
        /// False when the stream ended without a `final_answer` frame
        terminal: bool,
    },
    Failed(ChatError),
}

/// Mutable state of the in-flight session
struct ActiveSession {
    loading_id: TurnId,
    progress: ProgressState,
    last_content: Option<String>,
    final_answer: Option<String>,
    sources: Vec<SourceDocument>,
}

impl ActiveSession {
    fn new(loading_id: TurnId) -> Self {
        Self {
            loading_id,
            progress: ProgressState::new(),
            last_content: None,
            final_answer: None,
            sources: Vec::new(),
        }
    }

    /// Apply one frame; returns true on the terminal frame
    fn apply(&mut self, frame: StreamFrame, log: &LogSender) -> bool {
        if is_terminal(&frame.step) {
            self.sources = source_documents(frame.data.as_ref());
            self.final_answer = Some(frame.message);
            self.progress.complete(Some(&frame.step));
            log.update(self.loading_id, TurnPatch::progress(self.progress.clone()));
            return true;
        }

        if !frame.message.trim().is_empty() {
            self.last_content = Some(frame.message);
        }

        self.progress.advance(&frame.step, classify(&frame.step));
        tracing::debug!(
            step = %frame.step,
            stage = self.progress.stage.ordinal(),
            percent = self.progress.percent,
            "Stream step"
        );
        log.update(self.loading_id, TurnPatch::progress(self.progress.clone()));
        false
    }
}

fn source_documents(data: Option<&serde_json::Value>) -> Vec<SourceDocument> {
    let Some(docs) = data.and_then(|d| d.get("source_documents")) else {
        return Vec::new();
    };

    match serde_json::from_value(docs.clone()) {
        Ok(docs) => docs,
        Err(e) => {
            tracing::warn!("Ignoring malformed source_documents: {}", e);
            Vec::new()
        }
    }
}

/// Cleans up if a submit future is dropped while its session is still active
struct ActiveGuard<'a> {
    controller: &'a SessionController,
    log: &'a LogSender,
    loading_id: Option<TurnId>,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        if !self.controller.phase().is_active() {
            return;
        }

        tracing::warn!("Chat session dropped before resolving");
        if let Some(loading_id) = self.loading_id {
            let locale = self.controller.settings.locale;
            self.log.remove(loading_id);
            self.log.append(ChatTurn::bot(
                self.controller.ids.next_id(),
                ChatError::Cancelled.user_message(locale),
            ));
        }
        self.controller.set_phase(SessionPhase::Failed);
    }
}

/// Runs chat sessions against the backend, one at a time
pub struct SessionController {
    transport: Arc<dyn ChatTransport>,
    credentials: Arc<dyn CredentialProvider>,
    settings: SessionSettings,
    ids: TurnIdGenerator,
    phase: watch::Sender<SessionPhase>,
}

impl SessionController {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        credentials: Arc<dyn CredentialProvider>,
        settings: SessionSettings,
    ) -> Self {
        let (phase, _) = watch::channel(SessionPhase::Idle);
        Self {
            transport,
            credentials,
            settings,
            ids: TurnIdGenerator::new(),
            phase,
        }
    }

    /// Controller talking HTTP to the configured backend
    pub fn from_config(config: &AppConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::new(
            Arc::new(HttpTransport::new(config)),
            credentials,
            SessionSettings::from_config(config),
        )
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Watch phase changes
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.phase().is_active()
    }

    /// Submit a query and drive its session to the end
    pub async fn submit(&self, query: &str, log: &LogSender) -> Result<SessionOutcome, SubmitError> {
        self.submit_with_cancel(query, log, CancellationToken::new())
            .await
    }

    /// Like `submit`, but `cancel` aborts the request while it is in flight
    pub async fn submit_with_cancel(
        &self,
        query: &str,
        log: &LogSender,
        cancel: CancellationToken,
    ) -> Result<SessionOutcome, SubmitError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SubmitError::EmptyQuery);
        }
        self.begin()?;

        let mut guard = ActiveGuard {
            controller: self,
            log,
            loading_id: None,
        };
        let locale = self.settings.locale;

        log.append(ChatTurn::user(self.ids.next_id(), query));
        let loading_id = self.ids.next_id();
        log.append(ChatTurn::loading(loading_id, locale.t(Text::LoadingPlaceholder)));
        guard.loading_id = Some(loading_id);

        let mut session = ActiveSession::new(loading_id);
        let stream = self.run_stream(query, log, &mut session);

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ChatError::Cancelled),
            result = timeout(self.settings.timeout, stream) => match result {
                Ok(result) => result,
                Err(_) => Err(ChatError::Timeout(self.settings.timeout)),
            },
        };

        let outcome = match result {
            Ok(()) => self.complete(log, session).await,
            Err(error) => self.fail(log, loading_id, error),
        };
        drop(guard);
        Ok(outcome)
    }

    fn begin(&self) -> Result<(), SubmitError> {
        let started = self.phase.send_if_modified(|phase| {
            if phase.is_active() {
                false
            } else {
                *phase = SessionPhase::Awaiting;
                true
            }
        });

        if started {
            Ok(())
        } else {
            Err(SubmitError::Busy)
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.phase.send_replace(phase);
    }

    /// Send the request and consume frames until the terminal one or the end
    async fn run_stream(
        &self,
        query: &str,
        log: &LogSender,
        session: &mut ActiveSession,
    ) -> Result<(), ChatError> {
        let credentials = self
            .credentials
            .credentials()
            .filter(Credentials::is_usable)
            .ok_or(ChatError::AuthenticationRequired)?;

        let username = if credentials.username.is_empty() {
            "user".to_string()
        } else {
            credentials.username.clone()
        };
        let request = ChatRequest {
            username,
            query: query.to_string(),
            uuid: credentials.uuid.clone(),
        };

        let response = self
            .transport
            .open(&request, &credentials.access_token)
            .await?;
        if !response.is_success() {
            return Err(ChatError::from_status(response.status));
        }

        let frames = decode_frames(response.body);
        futures::pin_mut!(frames);

        while let Some(frame) = frames.next().await {
            let frame = frame?;
            if self.phase() == SessionPhase::Awaiting {
                self.set_phase(SessionPhase::Streaming);
            }
            if session.apply(frame, log) {
                return Ok(());
            }
        }

        tracing::info!("Stream closed without a final answer, using last content");
        Ok(())
    }

    /// Settle, then swap the loading turn for a newly identified answer turn
    async fn complete(&self, log: &LogSender, mut session: ActiveSession) -> SessionOutcome {
        self.set_phase(SessionPhase::Completing);

        if !session.progress.complete {
            session.progress.complete(None);
            log.update(session.loading_id, TurnPatch::progress(session.progress.clone()));
        }

        tokio::time::sleep(self.settings.settle_delay).await;

        let terminal = session.final_answer.is_some();
        let answer = session
            .final_answer
            .or(session.last_content)
            .unwrap_or_else(|| self.settings.locale.t(Text::LoadingPlaceholder).to_string());

        let turn_id = self.ids.next_id();
        log.remove(session.loading_id);
        log.append(ChatTurn::bot(turn_id, answer.clone()).with_sources(session.sources));
        self.set_phase(SessionPhase::Resolved);

        tracing::info!("Chat session resolved ({} chars)", answer.len());
        SessionOutcome::Resolved {
            turn_id,
            answer,
            terminal,
        }
    }

    fn fail(&self, log: &LogSender, loading_id: TurnId, error: ChatError) -> SessionOutcome {
        tracing::warn!("Chat session failed: {}", error);

        log.remove(loading_id);
        log.append(ChatTurn::bot(
            self.ids.next_id(),
            error.user_message(self.settings.locale),
        ));
        self.set_phase(SessionPhase::Failed);
        SessionOutcome::Failed(error)
    }
}
