//! Scripted adapter for the `Knowledge` port.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::ports::knowledge::{AnswerFuture, Knowledge, KnowledgeAnswer, KnowledgeRequest};

/// Serves pre-arranged answers and records every question asked.
pub struct ScriptedKnowledge {
    answers: Mutex<VecDeque<KnowledgeAnswer>>,
    queries: Arc<Mutex<Vec<KnowledgeRequest>>>,
}

impl ScriptedKnowledge {
    /// Creates a source that serves the given answers in order and panics
    /// once they run out.
    #[must_use]
    pub fn with_answers(answers: Vec<KnowledgeAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle onto the requests seen so far.
    #[must_use]
    pub fn queries(&self) -> Arc<Mutex<Vec<KnowledgeRequest>>> {
        Arc::clone(&self.queries)
    }
}

impl Knowledge for ScriptedKnowledge {
    fn answer(&self, request: &KnowledgeRequest) -> AnswerFuture<'_> {
        self.queries.lock().expect("knowledge lock poisoned").push(request.clone());
        let answer = self
            .answers
            .lock()
            .expect("knowledge lock poisoned")
            .pop_front()
            .unwrap_or_else(|| panic!("scripted knowledge exhausted"));
        Box::pin(async move { Ok(answer) })
    }
}
