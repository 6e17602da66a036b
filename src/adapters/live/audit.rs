//! Live adapters for the `AuditSink` port.
//!
//! `JsonlAuditSink` appends one JSON object per line to a trail file, so
//! the trail survives restarts and can be grepped or replayed. When no
//! trail path is configured, `TracingAuditSink` emits each record as a
//! structured log event instead.

use std::error::Error;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;

use crate::ports::audit::{AuditRecord, AuditSink};

/// Appends audit records to a JSON-lines file.
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
}

impl JsonlAuditSink {
    /// Creates a sink writing to the given path. The file is created on
    /// the first record.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let line = serde_json::to_string(record)?;
        // One open per record; no handle is held across turns.
        let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// Emits audit records as structured log events.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    /// Creates the sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::info!(
            session_id = %record.session_id,
            task_id = %record.task_id,
            status = ?record.status,
            reason = ?record.reason,
            node_path = ?record.node_path,
            "audit record"
        );
        Ok(())
    }
}
