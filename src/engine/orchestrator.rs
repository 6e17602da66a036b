//! The per-turn orchestrator: screening, classification, routing, and the
//! state machine, stitched to the collaborator ports.
//!
//! `take_turn` is the engine's single entry point. It holds `&mut` session
//! state for the whole turn, so turns within a session are strictly
//! sequential; the registry behind it is shared and immutable. Collaborator
//! failures that make the turn impossible surface as [`TurnError`];
//! everything else is an ordinary reply.

use std::sync::Arc;

use chrono::Duration;

use crate::config::EngineConfig;
use crate::context::CollaboratorContext;
use crate::engine::executor::{self, TaskWorld, TurnInput};
use crate::engine::prompts;
use crate::engine::router::{self, RouteDecision};
use crate::error::TurnError;
use crate::ports::{AuditRecord, AuditStatus, Classification, ClassifyRequest, SessionDigest};
use crate::registry::TaskRegistry;
use crate::session::{FailureReason, PendingTask, Role, SessionState, TaskStatus};

/// Drives one conversation turn at a time against a shared registry.
pub struct Orchestrator {
    registry: Arc<TaskRegistry>,
    config: EngineConfig,
}

impl Orchestrator {
    /// Creates an orchestrator over an already-built registry.
    #[must_use]
    pub fn new(registry: Arc<TaskRegistry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// The registry this orchestrator serves.
    #[must_use]
    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Runs one full turn and returns the reply to show the user.
    ///
    /// # Errors
    ///
    /// Returns a [`TurnError`] when screening, classification, or the
    /// audit sink fail outright. Backend and knowledge failures do not
    /// error the turn; they settle the pending task as failed instead.
    pub async fn take_turn(
        &self,
        ctx: &CollaboratorContext,
        state: &mut SessionState,
        utterance: &str,
    ) -> Result<String, TurnError> {
        let now = ctx.clock.now();
        state.clear_terminal_pending();

        let mut notice = String::new();
        let timeout = Duration::minutes(self.config.session_timeout_minutes);
        if state.is_busy() && now.signed_duration_since(state.last_active) > timeout {
            if let Some(mut pending) = state.pending.take() {
                pending.advance(TaskStatus::Failed { reason: FailureReason::SessionExpired });
                self.audit(ctx, &state.session_id, &pending)?;
                notice = prompts::expiry_notice(&pending.task_id);
            }
        }

        state.record_user(utterance);

        let verdict =
            ctx.screening.screen(utterance).await.map_err(TurnError::Screening)?;
        if !verdict.safe {
            tracing::info!(
                session = %state.session_id,
                violation = verdict.violation.as_deref().unwrap_or("unspecified"),
                "screening blocked the utterance"
            );
            let reply = prefixed(&notice, prompts::REFUSAL.to_string());
            state.record_assistant(reply.clone());
            state.last_active = now;
            return Ok(reply);
        }

        let request = ClassifyRequest {
            utterance: utterance.to_string(),
            catalogue: self.registry.summary(),
            digest: self.digest(state),
        };
        let intent =
            ctx.classifier.classify(&request).await.map_err(TurnError::Classification)?;
        tracing::debug!(session = %state.session_id, label = ?intent.label, "classified");
        state.current_intent = Some(intent.clone());

        let decision = router::route(&intent, state, &self.registry);
        let body = match decision {
            RouteDecision::StartTask(id) => {
                self.start(ctx, state, &intent, utterance, &id, now).await
            }
            RouteDecision::ResumeTask => self.resume(ctx, state, &intent, utterance).await,
            RouteDecision::Divert(id) => {
                self.divert(ctx, state, &intent, utterance, &id, now).await?
            }
            RouteDecision::SmallTalk(kind) => prompts::small_talk_reply(kind).to_string(),
            RouteDecision::Clarify => {
                if state.is_busy() {
                    self.with_resume("Sorry, I didn't catch that.".to_string(), state)
                } else {
                    prompts::clarify_prompt(&self.registry.summary())
                }
            }
        };

        if let Some(pending) = state.pending.as_ref() {
            if pending.is_terminal() {
                self.audit(ctx, &state.session_id, pending)?;
            }
        }

        let reply = prefixed(&notice, body);
        state.record_assistant(reply.clone());
        state.last_active = now;
        Ok(reply)
    }

    /// Closes the session, auditing any task still in flight.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::Audit`] when the audit sink rejects the record.
    pub fn end_session(
        &self,
        ctx: &CollaboratorContext,
        state: &mut SessionState,
    ) -> Result<(), TurnError> {
        let Some(pending) = state.pending.take() else { return Ok(()) };
        if pending.is_terminal() {
            return Ok(());
        }
        let record = AuditRecord {
            timestamp: ctx.clock.now(),
            session_id: state.session_id.clone(),
            task_id: pending.task_id.clone(),
            status: AuditStatus::Abandoned,
            reason: Some("SESSION_CLOSED".into()),
            node_path: pending.node_path,
        };
        ctx.audit.record(&record).map_err(TurnError::Audit)
    }

    async fn start(
        &self,
        ctx: &CollaboratorContext,
        state: &mut SessionState,
        intent: &Classification,
        utterance: &str,
        id: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> String {
        let Some(schema) = self.registry.get(id) else {
            return prompts::clarify_prompt(&self.registry.summary());
        };
        let world = TaskWorld {
            ctx,
            schema,
            hooks: self.registry.hooks(),
            confirm_over: &self.config.confirm_over,
            scratch: &state.scratch,
        };
        let input = TurnInput { label: &intent.label, utterance, entities: &intent.entities };
        let (pending, outcome) = executor::start_task(&world, &input, now).await;
        state.pending = Some(pending);
        state.scratch.extend(outcome.facts);
        outcome.reply
    }

    async fn resume(
        &self,
        ctx: &CollaboratorContext,
        state: &mut SessionState,
        intent: &Classification,
        utterance: &str,
    ) -> String {
        let Some(pending) = state.pending.as_mut() else {
            return prompts::clarify_prompt(&self.registry.summary());
        };
        let Some(schema) = self.registry.get(&pending.task_id) else {
            tracing::warn!(task = %pending.task_id, "pending task lost its schema");
            return prompts::clarify_prompt(&self.registry.summary());
        };
        let world = TaskWorld {
            ctx,
            schema,
            hooks: self.registry.hooks(),
            confirm_over: &self.config.confirm_over,
            scratch: &state.scratch,
        };
        let input = TurnInput { label: &intent.label, utterance, entities: &intent.entities };
        let outcome = executor::resume_task(&world, pending, &input).await;
        state.scratch.extend(outcome.facts);
        outcome.reply
    }

    /// Handles a mid-task switch: absorb it as a one-shot when possible,
    /// otherwise decline. Either way the original task's prompt is
    /// regenerated so the user lands back where they were.
    async fn divert(
        &self,
        ctx: &CollaboratorContext,
        state: &mut SessionState,
        intent: &Classification,
        utterance: &str,
        id: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<String, TurnError> {
        let current =
            state.pending.as_ref().map(|p| p.task_id.clone()).unwrap_or_default();
        let Some(schema) = self.registry.get(id) else {
            return Ok(self.with_resume("Sorry, I didn't catch that.".to_string(), state));
        };
        // The aside can see what the interrupted task has collected so far,
        // so a balance question mid-transfer can project the new balance.
        let mut visible = state.scratch.clone();
        if let Some(pending) = state.pending.as_ref() {
            visible.extend(pending.fields.clone());
        }
        let world = TaskWorld {
            ctx,
            schema,
            hooks: self.registry.hooks(),
            confirm_over: &self.config.confirm_over,
            scratch: &visible,
        };
        let input = TurnInput { label: &intent.label, utterance, entities: &intent.entities };
        match executor::try_divert(&world, &input, now).await {
            Some((aside, outcome)) => {
                self.audit(ctx, &state.session_id, &aside)?;
                state.scratch.extend(outcome.facts);
                Ok(self.with_resume(outcome.reply, state))
            }
            None => Ok(self.with_resume(prompts::divert_reject(&current), state)),
        }
    }

    /// Regenerates the pending task's open question, if any.
    fn resume_line(&self, state: &SessionState) -> String {
        let Some(pending) = state.pending.as_ref() else { return String::new() };
        let Some(schema) = self.registry.get(&pending.task_id) else { return String::new() };
        match pending.status {
            TaskStatus::Confirming => prompts::confirmation_prompt(schema, &pending.fields),
            _ => schema
                .first_missing_required(&pending.fields)
                .map(|spec| prompts::field_prompt(spec, &pending.fields))
                .unwrap_or_default(),
        }
    }

    fn with_resume(&self, reply: String, state: &SessionState) -> String {
        let line = self.resume_line(state);
        if line.is_empty() {
            reply
        } else {
            format!("{reply} {line}")
        }
    }

    fn digest(&self, state: &SessionState) -> SessionDigest {
        let mut digest = SessionDigest::default();
        if let Some(pending) = &state.pending {
            if !pending.is_terminal() {
                digest.pending_task = Some(pending.task_id.clone());
                digest.confirming = matches!(pending.status, TaskStatus::Confirming);
                if matches!(pending.status, TaskStatus::Collecting) {
                    digest.awaiting_field = self
                        .registry
                        .get(&pending.task_id)
                        .and_then(|s| s.first_missing_required(&pending.fields))
                        .map(|spec| spec.name.clone());
                }
            }
        }
        digest.recent_turns = state
            .history
            .iter()
            .rev()
            .take(6)
            .rev()
            .map(|entry| {
                let role = match entry.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                format!("{role}: {}", entry.content)
            })
            .collect();
        digest
    }

    /// Writes one anonymized audit record for a settled task.
    ///
    /// Records carry identifiers, statuses, and the node path. Field
    /// values never appear.
    fn audit(
        &self,
        ctx: &CollaboratorContext,
        session_id: &str,
        pending: &PendingTask,
    ) -> Result<(), TurnError> {
        let (status, reason) = match &pending.status {
            TaskStatus::Done => (AuditStatus::Done, None),
            TaskStatus::Failed { reason } => match reason {
                FailureReason::UserCancelled | FailureReason::SessionExpired => {
                    (AuditStatus::Abandoned, Some(reason.to_string()))
                }
                FailureReason::Execution { .. } | FailureReason::Hook { .. } => {
                    (AuditStatus::Failed, Some(reason.to_string()))
                }
            },
            other => {
                tracing::warn!(task = %pending.task_id, status = other.label(), "audit of a live task");
                (AuditStatus::Abandoned, Some(other.label().to_string()))
            }
        };
        let record = AuditRecord {
            timestamp: ctx.clock.now(),
            session_id: session_id.to_string(),
            task_id: pending.task_id.clone(),
            status,
            reason,
            node_path: pending.node_path.clone(),
        };
        ctx.audit.record(&record).map_err(TurnError::Audit)
    }
}

fn prefixed(notice: &str, body: String) -> String {
    if notice.is_empty() {
        body
    } else {
        format!("{notice} {body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scripted::{
        ManualClock, RecordingAuditSink, ScriptedBackend, ScriptedClassifier, ScriptedScreening,
    };
    use crate::ports::{ExecutionReport, IntentLabel, ScreeningVerdict};
    use crate::registry::HookRegistry;

    fn engine() -> Orchestrator {
        let api = serde_json::json!({
            "paths": {
                "/transfers": {
                    "post": {
                        "summary": "transfer_money",
                        "description": "Send money to another account",
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "required": ["recipient", "amount"],
                                        "properties": {
                                            "recipient": { "type": "string" },
                                            "amount": { "type": "number" }
                                        }
                                    }
                                }
                            }
                        },
                        "x-prompts": {
                            "recipient": "Who do you want to send money to?",
                            "amount": "How much do you want to send to {recipient}?"
                        }
                    }
                },
                "/cards/lost": {
                    "post": {
                        "summary": "report_lost_card",
                        "description": "Report a lost card",
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "required": ["card_last_four"],
                                        "properties": { "card_last_four": { "type": "string" } }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        })
        .to_string();
        let registry = TaskRegistry::build(&api, None, HookRegistry::new()).unwrap();
        Orchestrator::new(Arc::new(registry), EngineConfig::default())
    }

    fn classified(script: Vec<Classification>) -> CollaboratorContext {
        let mut ctx = CollaboratorContext::scripted();
        ctx.classifier = Box::new(ScriptedClassifier::with_script(script));
        ctx
    }

    fn task_intent(id: &str, entities: &[(&str, &str)]) -> Classification {
        let mut c = Classification::of(IntentLabel::Task { id: id.into() });
        for (k, v) in entities {
            c.entities.insert((*k).to_string(), (*v).to_string());
        }
        c
    }

    // --- turn tests ---

    #[tokio::test]
    async fn collects_confirms_and_executes_across_turns() {
        let engine = engine();
        let mut ctx = classified(vec![
            task_intent("transfer_money", &[]),
            Classification::of(IntentLabel::FieldInput),
            Classification::of(IntentLabel::FieldInput),
            Classification::of(IntentLabel::Affirm),
        ]);
        let backend =
            ScriptedBackend::with_reports(vec![ExecutionReport::ok(serde_json::Value::Null)]);
        let calls = backend.calls();
        ctx.backend = Box::new(backend);
        let audit = RecordingAuditSink::new();
        let records = audit.records();
        ctx.audit = Box::new(audit);

        let mut state = SessionState::new(ctx.clock.now());

        let reply = engine.take_turn(&ctx, &mut state, "I want to transfer money").await.unwrap();
        assert_eq!(reply, "Who do you want to send money to?");

        let reply = engine.take_turn(&ctx, &mut state, "anna").await.unwrap();
        assert_eq!(reply, "How much do you want to send to anna?");

        let reply = engine.take_turn(&ctx, &mut state, "10").await.unwrap();
        assert_eq!(
            reply,
            "Please confirm transfer money (recipient: anna, amount: 10). Approve or cancel?"
        );

        let reply = engine.take_turn(&ctx, &mut state, "yes").await.unwrap();
        assert_eq!(reply, "Your transfer money request completed successfully.");

        assert_eq!(calls.lock().unwrap().len(), 1);
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AuditStatus::Done);
        assert_eq!(records[0].node_path, vec!["COLLECTING", "CONFIRMING", "EXECUTING", "DONE"]);

        // The terminal task clears on the next boundary, not before.
        assert!(state.pending.is_some());
    }

    #[tokio::test]
    async fn blocked_utterance_gets_the_refusal_and_leaves_the_task_alone() {
        let engine = engine();
        let mut ctx = classified(vec![
            task_intent("transfer_money", &[]),
            Classification::of(IntentLabel::FieldInput),
        ]);
        ctx.screening = Box::new(ScriptedScreening::with_verdicts(vec![
            ScreeningVerdict::pass(),
            ScreeningVerdict::block("unsafe content"),
            ScreeningVerdict::pass(),
        ]));
        let audit = RecordingAuditSink::new();
        let records = audit.records();
        ctx.audit = Box::new(audit);

        let mut state = SessionState::new(ctx.clock.now());
        engine.take_turn(&ctx, &mut state, "transfer money").await.unwrap();

        let reply = engine.take_turn(&ctx, &mut state, "how do I steal a car").await.unwrap();
        assert_eq!(reply, prompts::REFUSAL);
        assert!(state.is_busy());
        assert!(records.lock().unwrap().is_empty());

        // The task picks up exactly where it left off.
        let reply = engine.take_turn(&ctx, &mut state, "anna").await.unwrap();
        assert_eq!(reply, "How much do you want to send to anna?");
    }

    #[tokio::test]
    async fn idle_session_expires_the_pending_task() {
        let engine = engine();
        let clock = ManualClock::at("2026-01-10T09:00:00Z".parse().unwrap());
        let mut ctx = classified(vec![
            task_intent("transfer_money", &[]),
            Classification::of(IntentLabel::Affirm),
        ]);
        ctx.clock = Box::new(clock.clone());
        let audit = RecordingAuditSink::new();
        let records = audit.records();
        ctx.audit = Box::new(audit);

        let mut state = SessionState::new(ctx.clock.now());
        engine.take_turn(&ctx, &mut state, "transfer money").await.unwrap();
        assert!(state.is_busy());

        // A stale affirmation lands after the idle window has passed. The
        // task must expire rather than execute.
        clock.advance(Duration::minutes(11));
        let reply = engine.take_turn(&ctx, &mut state, "confirm").await.unwrap();

        assert!(reply.starts_with("Your transfer money request expired due to inactivity."));
        assert!(reply.contains("What would you like to do?"));
        assert!(!state.is_busy());
        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AuditStatus::Abandoned);
        assert_eq!(records[0].reason.as_deref(), Some("SESSION_EXPIRED"));
        assert!(records[0].node_path.ends_with(&["FAILED".to_string()]));
    }

    #[tokio::test]
    async fn rejected_diversion_restates_the_open_question() {
        let engine = engine();
        let ctx = classified(vec![
            task_intent("transfer_money", &[("recipient", "anna")]),
            task_intent("report_lost_card", &[]),
        ]);

        let mut state = SessionState::new(ctx.clock.now());
        engine.take_turn(&ctx, &mut state, "send money to anna").await.unwrap();

        let reply = engine.take_turn(&ctx, &mut state, "I lost my card").await.unwrap();
        assert_eq!(
            reply,
            "Let's finish your transfer money request first. \
             How much do you want to send to anna?"
        );
        assert_eq!(state.pending.as_ref().unwrap().task_id, "transfer_money");
    }

    #[tokio::test]
    async fn clarify_when_idle_lists_the_catalogue() {
        let engine = engine();
        let ctx = classified(vec![Classification::of(IntentLabel::Unclear)]);
        let mut state = SessionState::new(ctx.clock.now());

        let reply = engine.take_turn(&ctx, &mut state, "ummm").await.unwrap();
        assert!(reply.contains("transfer money: Send money to another account"));
        assert!(reply.contains("report lost card: Report a lost card"));
    }

    #[tokio::test]
    async fn audit_records_never_carry_field_values() {
        let engine = engine();
        let mut ctx = classified(vec![
            task_intent("transfer_money", &[("recipient", "anna"), ("amount", "10")]),
            Classification::of(IntentLabel::Affirm),
        ]);
        ctx.backend = Box::new(ScriptedBackend::with_reports(vec![ExecutionReport::ok(
            serde_json::Value::Null,
        )]));
        let audit = RecordingAuditSink::new();
        let records = audit.records();
        ctx.audit = Box::new(audit);

        let mut state = SessionState::new(ctx.clock.now());
        engine.take_turn(&ctx, &mut state, "send 10 dollars to anna").await.unwrap();
        engine.take_turn(&ctx, &mut state, "yes").await.unwrap();

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        let serialized = serde_json::to_value(&records[0]).unwrap();
        assert!(!serialized.to_string().contains("anna"));
        let keys: Vec<&String> = serialized.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["node_path", "reason", "session_id", "status", "task_id", "timestamp"]);
    }

    #[tokio::test]
    async fn ending_a_busy_session_audits_an_abandonment() {
        let engine = engine();
        let ctx = classified(vec![task_intent("transfer_money", &[])]);
        let mut state = SessionState::new(ctx.clock.now());
        engine.take_turn(&ctx, &mut state, "transfer money").await.unwrap();

        let audit = RecordingAuditSink::new();
        let records = audit.records();
        let mut ctx = ctx;
        ctx.audit = Box::new(audit);
        engine.end_session(&ctx, &mut state).unwrap();

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AuditStatus::Abandoned);
        assert_eq!(records[0].reason.as_deref(), Some("SESSION_CLOSED"));
        assert!(state.pending.is_none());
    }
}
