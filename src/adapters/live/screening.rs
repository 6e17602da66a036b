//! Live screening adapter backed by a configurable blocklist.
//!
//! The check is deliberately local and deterministic: a turn is blocked
//! when it contains any configured term, case-insensitively. Anything
//! heavier belongs behind its own [`Screening`] implementation.

use crate::ports::screening::{Screening, ScreeningFuture, ScreeningVerdict};

/// Screens utterances against a lowercase term blocklist.
pub struct BlocklistScreener {
    terms: Vec<String>,
}

impl BlocklistScreener {
    /// Creates a screener for the given terms. Terms are lowercased once.
    #[must_use]
    pub fn new(terms: &[String]) -> Self {
        Self { terms: terms.iter().map(|t| t.to_lowercase()).collect() }
    }
}

impl Screening for BlocklistScreener {
    fn screen(&self, utterance: &str) -> ScreeningFuture<'_> {
        let lowered = utterance.to_lowercase();
        let hit = self.terms.iter().find(|term| lowered.contains(term.as_str())).cloned();
        Box::pin(async move {
            Ok(match hit {
                Some(term) => ScreeningVerdict::block(format!("blocked term: {term}")),
                None => ScreeningVerdict::pass(),
            })
        })
    }
}
