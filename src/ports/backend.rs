//! Backend execution port for tasks bound to an API endpoint.

use std::collections::BTreeMap;
use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::Method;

/// Boxed future type alias used by [`BackendExecutor`] to keep the trait dyn-compatible.
pub type ExecuteFuture<'a> = Pin<
    Box<dyn Future<Output = Result<ExecutionReport, Box<dyn Error + Send + Sync>>> + Send + 'a>,
>;

/// One backend call carrying the fully collected field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendRequest {
    /// Endpoint path from the task's binding, e.g. `/transfers`.
    pub endpoint: String,
    /// HTTP method from the task's binding.
    pub method: Method,
    /// Validated field values, keyed by field name.
    pub fields: BTreeMap<String, Value>,
}

/// What the backend reported for one execution.
///
/// A transport failure is an `Err` from [`BackendExecutor::execute`]; an
/// application-level rejection is `success == false` here. Both resolve to
/// a failed task, never to a turn error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Whether the backend accepted and completed the call.
    pub success: bool,
    /// Response payload, `Null` when the backend returned no body.
    #[serde(default)]
    pub payload: Value,
    /// Backend-provided failure detail, when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecutionReport {
    /// A successful report with the given payload.
    #[must_use]
    pub fn ok(payload: Value) -> Self {
        Self { success: true, payload, error: None }
    }

    /// A failed report with the given detail.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, payload: Value::Null, error: Some(error.into()) }
    }
}

/// Executes backend-bound tasks. Invoked exactly once per task execution.
pub trait BackendExecutor: Send + Sync {
    /// Performs the backend call for one task.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached at the transport
    /// level (connection, timeout, malformed response).
    fn execute(&self, request: &BackendRequest) -> ExecuteFuture<'_>;
}
