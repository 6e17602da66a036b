//! Intent classification port.
//!
//! The classifier receives the utterance together with the live task
//! catalogue and a digest of the session, so its label vocabulary always
//! matches what the registry can actually run. A fresh classification is
//! requested every turn; the engine never trusts a cached label.

use std::collections::BTreeMap;
use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::registry::TaskOutline;

/// Boxed future type alias used by [`IntentClassifier`] to keep the trait dyn-compatible.
pub type ClassifyFuture<'a> = Pin<
    Box<dyn Future<Output = Result<Classification, Box<dyn Error + Send + Sync>>> + Send + 'a>,
>;

/// Small-talk category recognized ahead of task routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmallTalkKind {
    /// Opening pleasantry.
    Greeting,
    /// Closing pleasantry or thanks.
    Farewell,
    /// Conversation about the assistant itself.
    Chitchat,
    /// A question outside the supported task domain.
    OffTopic,
}

/// Label assigned to one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum IntentLabel {
    /// The utterance asks for a specific task.
    Task {
        /// Identifier of the requested task.
        id: String,
    },
    /// Affirmative continuation ("yes", "confirm").
    Affirm,
    /// Negative continuation ("no", "cancel").
    Deny,
    /// A value for the field currently being collected.
    FieldInput,
    /// Small talk, answered from fixed templates.
    SmallTalk {
        /// Which small-talk category matched.
        kind: SmallTalkKind,
    },
    /// Nothing recognizable; the engine must ask for clarification.
    Unclear,
}

/// Classification of one utterance: a label plus raw extracted entities.
///
/// Entities are untyped strings; they only enter a task's field map after
/// passing that field's validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// The label assigned to the utterance.
    pub label: IntentLabel,
    /// Raw entity strings keyed by field name.
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
}

impl Classification {
    /// A classification with the given label and no entities.
    #[must_use]
    pub fn of(label: IntentLabel) -> Self {
        Self { label, entities: BTreeMap::new() }
    }
}

/// Condensed view of the session handed to the classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDigest {
    /// Identifier of the busy pending task, if any.
    #[serde(default)]
    pub pending_task: Option<String>,
    /// Field currently being collected, if the pending task is collecting.
    #[serde(default)]
    pub awaiting_field: Option<String>,
    /// Whether the pending task is waiting for a yes/no confirmation.
    #[serde(default)]
    pub confirming: bool,
    /// The most recent turns, oldest first, as `role: content` lines.
    #[serde(default)]
    pub recent_turns: Vec<String>,
}

/// Everything the classifier needs to label one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyRequest {
    /// The raw user utterance.
    pub utterance: String,
    /// Summary of every task the registry can run.
    pub catalogue: Vec<TaskOutline>,
    /// Where the conversation currently stands.
    pub digest: SessionDigest,
}

/// Labels user utterances and extracts candidate entities.
pub trait IntentClassifier: Send + Sync {
    /// Classifies a single utterance.
    ///
    /// # Errors
    ///
    /// Returns an error if the classification collaborator cannot be reached
    /// or returns an unusable response.
    fn classify(&self, request: &ClassifyRequest) -> ClassifyFuture<'_>;
}
