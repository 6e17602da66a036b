//! Scripted adapter for the `Screening` port.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::ports::screening::{Screening, ScreeningFuture, ScreeningVerdict};

/// Serves pre-arranged screening verdicts, one per screened utterance.
pub struct ScriptedScreening {
    verdicts: Mutex<VecDeque<ScreeningVerdict>>,
    pass_when_empty: bool,
}

impl ScriptedScreening {
    /// Creates a screener that passes every utterance.
    #[must_use]
    pub fn safe() -> Self {
        Self { verdicts: Mutex::new(VecDeque::new()), pass_when_empty: true }
    }

    /// Creates a screener that serves the given verdicts in order and
    /// panics once they run out.
    #[must_use]
    pub fn with_verdicts(verdicts: Vec<ScreeningVerdict>) -> Self {
        Self { verdicts: Mutex::new(verdicts.into()), pass_when_empty: false }
    }
}

impl Screening for ScriptedScreening {
    fn screen(&self, _utterance: &str) -> ScreeningFuture<'_> {
        let next = self.verdicts.lock().expect("screening lock poisoned").pop_front();
        let verdict = match next {
            Some(verdict) => verdict,
            None if self.pass_when_empty => ScreeningVerdict::pass(),
            None => panic!("scripted screening exhausted"),
        };
        Box::pin(async move { Ok(verdict) })
    }
}
