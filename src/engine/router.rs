//! Pure routing from a classified utterance to a turn decision.
//!
//! The router performs no I/O and consults nothing but its arguments, so
//! every branch is reachable from a plain unit test. Given the same
//! classification, session state, and registry it always returns the same
//! decision.

use crate::ports::{Classification, IntentLabel, SmallTalkKind};
use crate::registry::TaskRegistry;
use crate::session::SessionState;

/// What the orchestrator should do with the current turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Begin a new instance of the named task.
    StartTask(String),
    /// Feed the utterance to the already-pending task.
    ResumeTask,
    /// The user asked for a different task while one is pending.
    Divert(String),
    /// Reply conversationally without touching task state.
    SmallTalk(SmallTalkKind),
    /// Nothing actionable; ask the user to rephrase.
    Clarify,
}

/// Decides the turn. Small talk always wins; everything else depends on
/// whether a live task is pending.
#[must_use]
pub fn route(
    intent: &Classification,
    state: &SessionState,
    registry: &TaskRegistry,
) -> RouteDecision {
    match &intent.label {
        IntentLabel::SmallTalk { kind } => RouteDecision::SmallTalk(*kind),
        IntentLabel::Task { id } => {
            if !registry.contains(id) {
                return RouteDecision::Clarify;
            }
            match &state.pending {
                Some(pending) if !pending.is_terminal() => {
                    if pending.task_id == *id {
                        RouteDecision::ResumeTask
                    } else {
                        RouteDecision::Divert(id.clone())
                    }
                }
                _ => RouteDecision::StartTask(id.clone()),
            }
        }
        IntentLabel::Affirm | IntentLabel::Deny | IntentLabel::FieldInput => {
            if state.is_busy() {
                RouteDecision::ResumeTask
            } else {
                RouteDecision::Clarify
            }
        }
        IntentLabel::Unclear => RouteDecision::Clarify,
    }
}
