//! Screening port for safety and compliance checks on user input.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// Boxed future type alias used by [`Screening`] to keep the trait dyn-compatible.
pub type ScreeningFuture<'a> = Pin<
    Box<dyn Future<Output = Result<ScreeningVerdict, Box<dyn Error + Send + Sync>>> + Send + 'a>,
>;

/// The verdict returned by the screen for one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningVerdict {
    /// Whether the utterance may proceed to routing.
    pub safe: bool,
    /// What was violated, when `safe` is false.
    #[serde(default)]
    pub violation: Option<String>,
}

impl ScreeningVerdict {
    /// A verdict that lets the utterance through.
    #[must_use]
    pub fn pass() -> Self {
        Self { safe: true, violation: None }
    }

    /// A verdict that blocks the utterance with the given violation.
    #[must_use]
    pub fn block(violation: impl Into<String>) -> Self {
        Self { safe: false, violation: Some(violation.into()) }
    }
}

/// Screens each user utterance before any routing happens.
///
/// An unsafe verdict ends the turn with a refusal; the utterance is never
/// routed and never audited.
pub trait Screening: Send + Sync {
    /// Screens a single utterance.
    ///
    /// # Errors
    ///
    /// Returns an error if the screening collaborator cannot be reached.
    fn screen(&self, utterance: &str) -> ScreeningFuture<'_>;
}
