//! Audit port receiving anonymized task outcomes.

use std::error::Error;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome class recorded for a task that reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// The task executed successfully.
    Done,
    /// The task failed or was cancelled.
    Failed,
    /// The session ended while the task was still in flight.
    Abandoned,
}

/// Anonymized trace of one task reaching a terminal state.
///
/// Collected field values never appear here; only identifiers, the outcome
/// and the lifecycle path are retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the terminal state was reached.
    pub timestamp: DateTime<Utc>,
    /// Session the task belonged to.
    pub session_id: String,
    /// Identifier of the task.
    pub task_id: String,
    /// How the task ended.
    pub status: AuditStatus,
    /// Failure reason, when the task did not complete.
    #[serde(default)]
    pub reason: Option<String>,
    /// Lifecycle states the task visited, in order.
    pub node_path: Vec<String>,
}

/// Receives one record per terminal task transition.
pub trait AuditSink: Send + Sync {
    /// Persists a single audit record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn record(&self, record: &AuditRecord) -> Result<(), Box<dyn Error + Send + Sync>>;
}
