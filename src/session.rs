//! Per-conversation state: history, the pending task, and scratch facts.
//!
//! A session is owned by exactly one conversation loop, so turns within it
//! are strictly sequential. All state a turn needs lives here; the engine
//! itself keeps nothing mutable between turns.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::ports::Classification;

/// Lifecycle stage of a pending task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    /// Gathering required fields one at a time.
    Collecting,
    /// Waiting for an explicit approve or cancel.
    Confirming,
    /// Hooks and the backend call are in flight.
    Executing,
    /// Completed successfully. Terminal.
    Done,
    /// Ended without completing. Terminal.
    Failed {
        /// Why the task failed.
        reason: FailureReason,
    },
}

impl TaskStatus {
    /// Uppercase label recorded on the task's node path.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Collecting => "COLLECTING",
            Self::Confirming => "CONFIRMING",
            Self::Executing => "EXECUTING",
            Self::Done => "DONE",
            Self::Failed { .. } => "FAILED",
        }
    }

    /// Whether the task can make no further progress.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed { .. })
    }
}

/// Why a task reached FAILED.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The user declined or cancelled.
    UserCancelled,
    /// The session idled past the configured timeout.
    SessionExpired,
    /// The backend call or handler failed.
    Execution {
        /// Short description of what went wrong.
        detail: String,
    },
    /// A pre-execution hook vetoed the task.
    Hook {
        /// The hook's veto message.
        detail: String,
    },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserCancelled => write!(f, "USER_CANCELLED"),
            Self::SessionExpired => write!(f, "SESSION_EXPIRED"),
            Self::Execution { detail } => write!(f, "EXECUTION_ERROR: {detail}"),
            Self::Hook { detail } => write!(f, "HOOK_ERROR: {detail}"),
        }
    }
}

/// One in-flight task instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTask {
    /// Identifier of the schema this instance follows.
    pub task_id: String,
    /// Collected field values, in deterministic field order.
    pub fields: BTreeMap<String, Value>,
    /// Current lifecycle stage.
    pub status: TaskStatus,
    /// When the task was started.
    pub created_at: DateTime<Utc>,
    /// Every stage the task has passed through, in order.
    pub node_path: Vec<String>,
}

impl PendingTask {
    /// Starts a new instance in COLLECTING.
    #[must_use]
    pub fn new(task_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            task_id: task_id.into(),
            fields: BTreeMap::new(),
            status: TaskStatus::Collecting,
            created_at: now,
            node_path: vec![TaskStatus::Collecting.label().to_string()],
        }
    }

    /// Moves to `status` and appends its label to the node path.
    pub fn advance(&mut self, status: TaskStatus) {
        self.node_path.push(status.label().to_string());
        self.status = status;
    }

    /// Whether the instance is DONE or FAILED.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Who produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The human side of the conversation.
    User,
    /// The engine side.
    Assistant,
}

/// One utterance in the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who said it.
    pub role: Role,
    /// What was said.
    pub content: String,
}

/// Everything one conversation accumulates across turns.
#[derive(Debug)]
pub struct SessionState {
    /// Stable identifier for audit correlation.
    pub session_id: String,
    /// Full transcript, oldest first.
    pub history: Vec<HistoryEntry>,
    /// The most recent classifier output, if any turn has run.
    pub current_intent: Option<Classification>,
    /// The in-flight task, if one exists.
    pub pending: Option<PendingTask>,
    /// Facts surfaced by handlers and knowledge lookups, available to
    /// hooks on later turns.
    pub scratch: BTreeMap<String, Value>,
    /// When the last turn completed, for idle-timeout checks.
    pub last_active: DateTime<Utc>,
}

impl SessionState {
    /// Opens a fresh session with a random identifier.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            history: Vec::new(),
            current_intent: None,
            pending: None,
            scratch: BTreeMap::new(),
            last_active: now,
        }
    }

    /// Whether a non-terminal task is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.is_terminal())
    }

    /// Appends a user utterance to the transcript.
    pub fn record_user(&mut self, content: impl Into<String>) {
        self.history.push(HistoryEntry { role: Role::User, content: content.into() });
    }

    /// Appends an engine reply to the transcript.
    pub fn record_assistant(&mut self, content: impl Into<String>) {
        self.history.push(HistoryEntry { role: Role::Assistant, content: content.into() });
    }

    /// Drops a pending task that already reached DONE or FAILED.
    ///
    /// Called at the top of every turn so terminal state never leaks into
    /// routing, but stays observable until then.
    pub fn clear_terminal_pending(&mut self) {
        if self.pending.as_ref().is_some_and(PendingTask::is_terminal) {
            self.pending = None;
        }
    }
}
