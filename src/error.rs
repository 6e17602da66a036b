//! Error taxonomy for registry construction and turn processing.
//!
//! `SchemaError` is startup-fatal: the registry refuses to build and the
//! service never starts on a partial task set. `TurnError` covers transport
//! failures of the per-turn collaborators. Field validation misses, route
//! ambiguity, backend rejections and session expiry are deliberately not
//! errors; they resolve inside a turn as re-prompts or task failure states.

use thiserror::Error;

/// Fatal failures while building the task registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The API specification document could not be parsed.
    #[error("invalid API specification: {0}")]
    ApiSpec(String),
    /// The custom task source could not be parsed.
    #[error("invalid custom task source: {0}")]
    CustomTasks(String),
    /// Merging the two sources produced an irreconcilable definition.
    #[error("conflicting definition for task '{task}': {detail}")]
    Conflict {
        /// Task identifier the collision occurred on.
        task: String,
        /// What could not be reconciled.
        detail: String,
    },
    /// A schema violates a structural rule.
    #[error("malformed schema for task '{task}': {detail}")]
    Shape {
        /// Task identifier of the offending schema.
        task: String,
        /// The structural rule that was broken.
        detail: String,
    },
    /// A schema references a hook or handler that is not registered.
    #[error("task '{task}' references unregistered hook or handler '{name}'")]
    UnknownHook {
        /// Task identifier carrying the reference.
        task: String,
        /// The missing hook or handler name.
        name: String,
    },
}

/// Transport failures of per-turn collaborators.
#[derive(Debug, Error)]
pub enum TurnError {
    /// The screening collaborator call failed.
    #[error("screening call failed: {0}")]
    Screening(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The intent classification call failed.
    #[error("intent classification failed: {0}")]
    Classification(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The audit sink rejected a record.
    #[error("audit write failed: {0}")]
    Audit(#[source] Box<dyn std::error::Error + Send + Sync>),
}
