//! Collaborator context bundling all port trait objects.

use crate::adapters::live::audit::{JsonlAuditSink, TracingAuditSink};
use crate::adapters::live::backend::HttpBackend;
use crate::adapters::live::classifier::{HttpClassifier, RuleClassifier};
use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::knowledge::AccountFactsKnowledge;
use crate::adapters::live::screening::BlocklistScreener;
use crate::adapters::scripted::{
    ManualClock, RecordingAuditSink, ScriptedBackend, ScriptedClassifier, ScriptedKnowledge,
    ScriptedScreening,
};
use crate::config::EngineConfig;
use crate::ports::audit::AuditSink;
use crate::ports::backend::BackendExecutor;
use crate::ports::classifier::IntentClassifier;
use crate::ports::clock::Clock;
use crate::ports::knowledge::Knowledge;
use crate::ports::screening::Screening;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external collaborator. Constructors
/// wire up different adapter implementations (live, scripted); tests swap
/// individual fields to observe or steer one collaborator at a time.
pub struct CollaboratorContext {
    /// Clock for timestamps and idle checks.
    pub clock: Box<dyn Clock>,
    /// Safety screening applied to every utterance before anything else.
    pub screening: Box<dyn Screening>,
    /// Intent classifier turning an utterance into a label plus entities.
    pub classifier: Box<dyn IntentClassifier>,
    /// Backend executor for tasks bound to an API endpoint.
    pub backend: Box<dyn BackendExecutor>,
    /// Knowledge source for internal tasks with no registered handler.
    pub knowledge: Box<dyn Knowledge>,
    /// Audit sink receiving one record per settled task.
    pub audit: Box<dyn AuditSink>,
}

impl CollaboratorContext {
    /// Creates a live context wired from the engine configuration.
    ///
    /// The classifier is the deterministic rule classifier unless an LLM
    /// model is configured; the audit trail goes to a JSONL file when a
    /// path is configured, otherwise to the log.
    #[must_use]
    pub fn live(config: &EngineConfig) -> Self {
        let classifier: Box<dyn IntentClassifier> = match &config.llm {
            Some(settings) => Box::new(HttpClassifier::new(settings.clone())),
            None => Box::new(RuleClassifier),
        };
        let audit: Box<dyn AuditSink> = match &config.audit_log_path {
            Some(path) => Box::new(JsonlAuditSink::new(path)),
            None => Box::new(TracingAuditSink::new()),
        };

        Self {
            clock: Box::new(LiveClock),
            screening: Box::new(BlocklistScreener::new(&config.blocked_terms)),
            classifier,
            backend: Box::new(HttpBackend::new(
                config.backend_base_url.clone().unwrap_or_default(),
            )),
            knowledge: Box::new(AccountFactsKnowledge::from_config(config)),
            audit,
        }
    }

    /// Creates a scripted context with empty scripts and a frozen clock.
    ///
    /// Screening passes everything; the other scripted collaborators panic
    /// if reached, so a test only scripts the ports its scenario touches.
    #[must_use]
    pub fn scripted() -> Self {
        Self {
            clock: Box::new(ManualClock::default()),
            screening: Box::new(ScriptedScreening::safe()),
            classifier: Box::new(ScriptedClassifier::with_script(vec![])),
            backend: Box::new(ScriptedBackend::with_reports(vec![])),
            knowledge: Box::new(ScriptedKnowledge::with_answers(vec![])),
            audit: Box::new(RecordingAuditSink::new()),
        }
    }
}
