//! Chat turns and the message log they live in
//!
//! The log belongs to the host (CLI, TUI, ...). A session never touches it
//! directly: it sends `LogCommand`s to the task that owns the log, which
//! applies them in the order they were issued.

use super::progress::ProgressState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Identity of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(u64);

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// Mints unique turn ids; one per controller
#[derive(Debug, Default)]
pub struct TurnIdGenerator {
    next: AtomicU64,
}

impl TurnIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> TurnId {
        TurnId(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Document the backend used to build its answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub document_id: String,
    pub content: String,
    pub relevance_score: f64,
}

/// A single entry in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: TurnId,
    pub is_user: bool,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_loading: bool,
    pub progress: Option<ProgressState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_documents: Vec<SourceDocument>,
}

impl ChatTurn {
    pub fn user(id: TurnId, content: impl Into<String>) -> Self {
        Self {
            id,
            is_user: true,
            content: content.into(),
            timestamp: Utc::now(),
            is_loading: false,
            progress: None,
            source_documents: Vec::new(),
        }
    }

    /// Placeholder shown while the answer streams in
    pub fn loading(id: TurnId, placeholder: impl Into<String>) -> Self {
        Self {
            id,
            is_user: false,
            content: placeholder.into(),
            timestamp: Utc::now(),
            is_loading: true,
            progress: Some(ProgressState::new()),
            source_documents: Vec::new(),
        }
    }

    pub fn bot(id: TurnId, content: impl Into<String>) -> Self {
        Self {
            id,
            is_user: false,
            content: content.into(),
            timestamp: Utc::now(),
            is_loading: false,
            progress: None,
            source_documents: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<SourceDocument>) -> Self {
        self.source_documents = sources;
        self
    }
}

/// Fields to merge into an existing turn; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnPatch {
    pub content: Option<String>,
    pub is_loading: Option<bool>,
    pub progress: Option<ProgressState>,
}

impl TurnPatch {
    pub fn progress(progress: ProgressState) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    fn merge_into(self, turn: &mut ChatTurn) {
        if let Some(content) = self.content {
            turn.content = content;
        }
        if let Some(is_loading) = self.is_loading {
            turn.is_loading = is_loading;
        }
        if let Some(progress) = self.progress {
            turn.progress = Some(progress);
        }
    }
}

/// What the chat core needs from the host's message list
pub trait MessageLog {
    /// Insert at the end
    fn append(&mut self, turn: ChatTurn);

    /// Merge fields into the matching turn; no-op if absent
    fn update_by_id(&mut self, id: TurnId, patch: TurnPatch);

    /// Delete the matching turn; no-op if absent
    fn remove_by_id(&mut self, id: TurnId);

    /// Current turns in display order
    fn list(&self) -> &[ChatTurn];
}

/// Vec-backed message log
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    turns: Vec<ChatTurn>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TurnId) -> Option<&ChatTurn> {
        self.turns.iter().find(|t| t.id == id)
    }

    /// Number of turns still showing a progress placeholder
    pub fn loading_count(&self) -> usize {
        self.turns.iter().filter(|t| t.is_loading).count()
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl MessageLog for ChatLog {
    fn append(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    fn update_by_id(&mut self, id: TurnId, patch: TurnPatch) {
        if let Some(turn) = self.turns.iter_mut().find(|t| t.id == id) {
            patch.merge_into(turn);
        }
    }

    fn remove_by_id(&mut self, id: TurnId) {
        self.turns.retain(|t| t.id != id);
    }

    fn list(&self) -> &[ChatTurn] {
        &self.turns
    }
}

/// A mutation requested by a session
#[derive(Debug, Clone, PartialEq)]
pub enum LogCommand {
    Append(ChatTurn),
    Update { id: TurnId, patch: TurnPatch },
    Remove(TurnId),
}

impl LogCommand {
    pub fn apply<L: MessageLog + ?Sized>(self, log: &mut L) {
        match self {
            LogCommand::Append(turn) => log.append(turn),
            LogCommand::Update { id, patch } => log.update_by_id(id, patch),
            LogCommand::Remove(id) => log.remove_by_id(id),
        }
    }
}

/// Sending half used by sessions to reach the log owner
#[derive(Debug, Clone)]
pub struct LogSender {
    tx: mpsc::UnboundedSender<LogCommand>,
}

impl LogSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LogCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn append(&self, turn: ChatTurn) {
        self.send(LogCommand::Append(turn));
    }

    pub fn update(&self, id: TurnId, patch: TurnPatch) {
        self.send(LogCommand::Update { id, patch });
    }

    pub fn remove(&self, id: TurnId) {
        self.send(LogCommand::Remove(id));
    }

    fn send(&self, command: LogCommand) {
        if self.tx.send(command).is_err() {
            tracing::debug!("Message log receiver dropped, discarding command");
        }
    }
}
