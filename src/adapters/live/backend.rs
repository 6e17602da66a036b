//! Live adapter for the `BackendExecutor` port over HTTP.
//!
//! Transport problems come back as errors; any HTTP response, success or
//! not, becomes an [`ExecutionReport`] so the engine can settle the task
//! either way.

use reqwest::Client;
use serde_json::Value;

use crate::ports::backend::{BackendExecutor, BackendRequest, ExecuteFuture, ExecutionReport};
use crate::registry::Method;

/// Executes task bindings against a real HTTP backend.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates an executor rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: Client::new(), base_url: base_url.into() }
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Field values rendered as query string pairs for GET bindings.
fn query_pairs(fields: &std::collections::BTreeMap<String, Value>) -> Vec<(String, String)> {
    fields
        .iter()
        .map(|(name, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.clone(), rendered)
        })
        .collect()
}

/// Failure detail from an error response body, when the backend offers one.
fn error_detail(payload: &Value, status: reqwest::StatusCode) -> String {
    payload
        .get("error")
        .or_else(|| payload.get("message"))
        .and_then(Value::as_str)
        .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
}

impl BackendExecutor for HttpBackend {
    fn execute(&self, request: &BackendRequest) -> ExecuteFuture<'_> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), request.endpoint);
        let method = request.method;
        let fields = request.fields.clone();

        Box::pin(async move {
            let builder = if method == Method::Get {
                self.client.get(&url).query(&query_pairs(&fields))
            } else {
                self.client.request(to_reqwest(method), &url).json(&fields)
            };

            let response = builder.send().await.map_err(
                |e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("backend request failed: {e}").into()
                },
            )?;

            let status = response.status();
            let text = response.text().await.map_err(
                |e| -> Box<dyn std::error::Error + Send + Sync> {
                    format!("failed to read backend response: {e}").into()
                },
            )?;

            let payload = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            };

            if status.is_success() {
                Ok(ExecutionReport::ok(payload))
            } else {
                Ok(ExecutionReport::failed(error_detail(&payload, status)))
            }
        })
    }
}
