//! Scripted adapter for the `BackendExecutor` port.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::ports::backend::{BackendExecutor, BackendRequest, ExecuteFuture, ExecutionReport};

/// Serves pre-arranged execution reports and records every request.
pub struct ScriptedBackend {
    reports: Mutex<VecDeque<ExecutionReport>>,
    failure: Option<String>,
    calls: Arc<Mutex<Vec<BackendRequest>>>,
}

impl ScriptedBackend {
    /// Creates a backend that serves the given reports in order and panics
    /// once they run out.
    #[must_use]
    pub fn with_reports(reports: Vec<ExecutionReport>) -> Self {
        Self {
            reports: Mutex::new(reports.into()),
            failure: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a backend whose every call fails at the transport level.
    #[must_use]
    pub fn failing(detail: &str) -> Self {
        Self {
            reports: Mutex::new(VecDeque::new()),
            failure: Some(detail.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle onto the requests seen so far.
    #[must_use]
    pub fn calls(&self) -> Arc<Mutex<Vec<BackendRequest>>> {
        Arc::clone(&self.calls)
    }
}

impl BackendExecutor for ScriptedBackend {
    fn execute(&self, request: &BackendRequest) -> ExecuteFuture<'_> {
        self.calls.lock().expect("backend lock poisoned").push(request.clone());
        let outcome = match &self.failure {
            Some(detail) => Err(detail.clone()),
            None => Ok(self
                .reports
                .lock()
                .expect("backend lock poisoned")
                .pop_front()
                .unwrap_or_else(|| panic!("scripted backend exhausted"))),
        };
        Box::pin(async move { outcome.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::registry::Method;

    fn request() -> BackendRequest {
        BackendRequest {
            endpoint: "/transfers".into(),
            method: Method::Post,
            fields: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn reports_play_back_and_calls_are_recorded() {
        let backend = ScriptedBackend::with_reports(vec![
            ExecutionReport::ok(serde_json::Value::Null),
            ExecutionReport::failed("insufficient funds"),
        ]);
        let calls = backend.calls();

        let first = backend.execute(&request()).await.unwrap();
        assert!(first.success);
        let second = backend.execute(&request()).await.unwrap();
        assert!(!second.success);

        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failing_backend_errors_on_every_call() {
        let backend = ScriptedBackend::failing("connection refused");

        let err = backend.execute(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "connection refused");

        // Failed calls are still recorded.
        assert_eq!(backend.calls().lock().unwrap().len(), 1);
    }
}
