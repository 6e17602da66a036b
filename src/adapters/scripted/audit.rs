//! Scripted adapter for the `AuditSink` port.

use std::error::Error;
use std::sync::{Arc, Mutex};

use crate::ports::audit::{AuditRecord, AuditSink};

/// Captures audit records in memory for later assertions.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl RecordingAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle onto the records captured so far.
    #[must_use]
    pub fn records(&self) -> Arc<Mutex<Vec<AuditRecord>>> {
        Arc::clone(&self.records)
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.records.lock().expect("audit lock poisoned").push(record.clone());
        Ok(())
    }
}
