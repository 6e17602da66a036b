//! Scripted adapter for the `IntentClassifier` port.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::ports::classifier::{
    Classification, ClassifyFuture, ClassifyRequest, IntentClassifier,
};

/// Serves pre-arranged classifications, one per classified turn.
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<Classification>>,
}

impl ScriptedClassifier {
    /// Creates a classifier that serves the given classifications in order
    /// and panics once they run out.
    #[must_use]
    pub fn with_script(script: Vec<Classification>) -> Self {
        Self { script: Mutex::new(script.into()) }
    }
}

impl IntentClassifier for ScriptedClassifier {
    fn classify(&self, _request: &ClassifyRequest) -> ClassifyFuture<'_> {
        let next = self
            .script
            .lock()
            .expect("classifier lock poisoned")
            .pop_front()
            .unwrap_or_else(|| panic!("scripted classifier exhausted"));
        Box::pin(async move { Ok(next) })
    }
}
