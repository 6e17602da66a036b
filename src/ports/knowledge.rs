//! Knowledge port for answering-mode tasks.
//!
//! Internally bound tasks with no registered handler are served here. The
//! retrieval and generation mechanics behind an answer are outside the
//! engine; the port only defines the exchange.

use std::collections::BTreeMap;
use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Boxed future type alias used by [`Knowledge`] to keep the trait dyn-compatible.
pub type AnswerFuture<'a> = Pin<
    Box<dyn Future<Output = Result<KnowledgeAnswer, Box<dyn Error + Send + Sync>>> + Send + 'a>,
>;

/// A question forwarded to the knowledge collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRequest {
    /// The user's utterance, verbatim.
    pub query: String,
    /// Identifier of the task that routed here.
    pub task_id: String,
    /// Session scratch facts overlaid with the pending task's collected
    /// fields, so answers can reference in-flight data.
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

/// An answer plus any derived facts worth keeping for the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeAnswer {
    /// The answer text shown to the user.
    pub answer: String,
    /// Where the answer came from, for attribution.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Derived facts merged into the session scratch map.
    #[serde(default)]
    pub facts: BTreeMap<String, Value>,
}

/// Answers knowledge-style queries.
pub trait Knowledge: Send + Sync {
    /// Produces an answer for one query.
    ///
    /// # Errors
    ///
    /// Returns an error if the knowledge collaborator cannot be reached.
    fn answer(&self, request: &KnowledgeRequest) -> AnswerFuture<'_>;
}
