//! The task state machine: COLLECTING, CONFIRMING, EXECUTING, then DONE
//! or FAILED.
//!
//! Transitions are driven one utterance at a time. The confirmation
//! decision is made exactly once, at the moment the last required field
//! lands; execution brackets the action with the schema's hooks. A
//! finished task's record is returned still attached so the caller can
//! audit it before it is cleared.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::context::CollaboratorContext;
use crate::engine::collect::{self, CollectSignal};
use crate::engine::prompts;
use crate::ports::{BackendRequest, IntentLabel, KnowledgeRequest};
use crate::registry::{FieldRule, HookContext, HookRegistry, TaskBinding, TaskSchema};
use crate::session::{FailureReason, PendingTask, TaskStatus};

/// Read-only surroundings of one state-machine step.
pub struct TaskWorld<'a> {
    /// Collaborator ports for execution and knowledge lookups.
    pub ctx: &'a CollaboratorContext,
    /// Schema of the task being stepped.
    pub schema: &'a TaskSchema,
    /// Hook and handler callables.
    pub hooks: &'a HookRegistry,
    /// Engine-wide confirmation ceilings, consulted after the schema's own.
    pub confirm_over: &'a BTreeMap<String, f64>,
    /// Session scratch facts, visible to hooks and knowledge lookups.
    pub scratch: &'a BTreeMap<String, Value>,
}

/// The classified utterance driving this step.
pub struct TurnInput<'a> {
    /// Classifier label for the utterance.
    pub label: &'a IntentLabel,
    /// The raw utterance text.
    pub utterance: &'a str,
    /// Entities the classifier extracted, keyed by field name.
    pub entities: &'a BTreeMap<String, String>,
}

/// What one step produced.
#[derive(Debug, Default, PartialEq)]
pub struct StepOutcome {
    /// Reply text for the user.
    pub reply: String,
    /// Facts to merge into the session scratch map.
    pub facts: BTreeMap<String, Value>,
}

impl StepOutcome {
    fn reply(text: impl Into<String>) -> Self {
        Self { reply: text.into(), facts: BTreeMap::new() }
    }
}

/// Starts a new task instance, seeding any extracted entities first.
///
/// When seeding already satisfies every required field the instance moves
/// straight through the confirmation decision, so a single rich utterance
/// can run a task end to end.
pub async fn start_task(
    world: &TaskWorld<'_>,
    input: &TurnInput<'_>,
    now: DateTime<Utc>,
) -> (PendingTask, StepOutcome) {
    let mut pending = PendingTask::new(&world.schema.id, now);
    collect::seed_entities(world.schema, &mut pending.fields, input.entities);
    let outcome = proceed(world, &mut pending, input).await;
    (pending, outcome)
}

/// Feeds one utterance to the already pending task.
pub async fn resume_task(
    world: &TaskWorld<'_>,
    pending: &mut PendingTask,
    input: &TurnInput<'_>,
) -> StepOutcome {
    match pending.status {
        TaskStatus::Collecting => collecting_step(world, pending, input).await,
        TaskStatus::Confirming => confirming_step(world, pending, input).await,
        TaskStatus::Executing | TaskStatus::Done | TaskStatus::Failed { .. } => {
            tracing::warn!(
                task = %pending.task_id,
                status = pending.status.label(),
                "resume reached a settled task"
            );
            StepOutcome::reply(format!(
                "Your {} request has already finished.",
                prompts::display_name(&pending.task_id)
            ))
        }
    }
}

/// Attempts to absorb a mid-task switch as a one-shot execution.
///
/// Absorption requires that the extracted entities already satisfy every
/// required field and that no confirmation would be needed. Anything else
/// returns `None` and the caller keeps the original task in place.
pub async fn try_divert(
    world: &TaskWorld<'_>,
    input: &TurnInput<'_>,
    now: DateTime<Utc>,
) -> Option<(PendingTask, StepOutcome)> {
    let mut fields = BTreeMap::new();
    collect::seed_entities(world.schema, &mut fields, input.entities);
    if world.schema.first_missing_required(&fields).is_some()
        || needs_confirmation(world.schema, world.confirm_over, &fields)
    {
        return None;
    }
    let mut pending = PendingTask::new(&world.schema.id, now);
    pending.fields = fields;
    let outcome = execute(world, &mut pending, input).await;
    Some((pending, outcome))
}

async fn collecting_step(
    world: &TaskWorld<'_>,
    pending: &mut PendingTask,
    input: &TurnInput<'_>,
) -> StepOutcome {
    match input.label {
        // Restating the task merges any newly extracted entities, then
        // re-prompts whatever is still missing.
        IntentLabel::Task { .. } => {
            collect::seed_entities(world.schema, &mut pending.fields, input.entities);
            proceed(world, pending, input).await
        }
        IntentLabel::Affirm | IntentLabel::Deny
            if !absorbs_affirmation(world.schema, pending, input.utterance) =>
        {
            if matches!(input.label, IntentLabel::Deny) {
                cancel(pending)
            } else {
                proceed(world, pending, input).await
            }
        }
        _ => match collect::apply_input(
            world.schema,
            &mut pending.fields,
            input.utterance,
            input.entities,
        ) {
            CollectSignal::Prompt(next) => {
                StepOutcome::reply(prompts::field_prompt(&next, &pending.fields))
            }
            CollectSignal::Invalid { field, message } => StepOutcome::reply(format!(
                "{message} {}",
                prompts::field_prompt(&field, &pending.fields)
            )),
            CollectSignal::Filled => proceed(world, pending, input).await,
        },
    }
}

async fn confirming_step(
    world: &TaskWorld<'_>,
    pending: &mut PendingTask,
    input: &TurnInput<'_>,
) -> StepOutcome {
    match input.label {
        IntentLabel::Affirm => execute(world, pending, input).await,
        IntentLabel::Deny => cancel(pending),
        _ => StepOutcome::reply(prompts::confirmation_prompt(world.schema, &pending.fields)),
    }
}

/// Prompts the next missing field, or settles the confirmation decision.
///
/// The decision is taken exactly once per instance: either the task moves
/// to CONFIRMING here, or it executes without ever asking.
async fn proceed(
    world: &TaskWorld<'_>,
    pending: &mut PendingTask,
    input: &TurnInput<'_>,
) -> StepOutcome {
    if let Some(next) = world.schema.first_missing_required(&pending.fields) {
        return StepOutcome::reply(prompts::field_prompt(next, &pending.fields));
    }
    if needs_confirmation(world.schema, world.confirm_over, &pending.fields) {
        pending.advance(TaskStatus::Confirming);
        return StepOutcome::reply(prompts::confirmation_prompt(world.schema, &pending.fields));
    }
    execute(world, pending, input).await
}

/// Runs the execution bracket: pre-hook, dispatch, post-hook.
async fn execute(
    world: &TaskWorld<'_>,
    pending: &mut PendingTask,
    input: &TurnInput<'_>,
) -> StepOutcome {
    pending.advance(TaskStatus::Executing);

    if let Some(name) = &world.schema.pre_hook {
        let verdict = match world.hooks.hook(name) {
            Some(hook) => hook(&hook_context(pending, world)),
            None => Err(format!("hook '{name}' is not registered")),
        };
        if let Err(detail) = verdict {
            let reply = prompts::failure_reply(&pending.task_id, &detail);
            pending.advance(TaskStatus::Failed { reason: FailureReason::Hook { detail } });
            return StepOutcome::reply(reply);
        }
    }

    let settled = dispatch(world, pending, input).await;

    match settled {
        Ok((reply, facts)) => {
            if let Some(name) = &world.schema.post_hook {
                let verdict = match world.hooks.hook(name) {
                    Some(hook) => hook(&hook_context(pending, world)),
                    None => Err(format!("hook '{name}' is not registered")),
                };
                if let Err(detail) = verdict {
                    tracing::warn!(
                        task = %pending.task_id,
                        hook = %name,
                        detail,
                        "post-completion hook failed"
                    );
                }
            }
            pending.advance(TaskStatus::Done);
            StepOutcome { reply, facts }
        }
        Err(detail) => {
            let reply = prompts::failure_reply(&pending.task_id, &detail);
            pending.advance(TaskStatus::Failed { reason: FailureReason::Execution { detail } });
            StepOutcome::reply(reply)
        }
    }
}

/// Invokes the task's action and maps the result to reply text and facts.
///
/// Transport failures and application rejections both come back as `Err`
/// here; the distinction is already logged, and the user sees a detail
/// string either way.
async fn dispatch(
    world: &TaskWorld<'_>,
    pending: &PendingTask,
    input: &TurnInput<'_>,
) -> Result<(String, BTreeMap<String, Value>), String> {
    match &world.schema.binding {
        TaskBinding::Backend { endpoint, method } => {
            let request = BackendRequest {
                endpoint: endpoint.clone(),
                method: *method,
                fields: pending.fields.clone(),
            };
            match world.ctx.backend.execute(&request).await {
                Ok(report) if report.success => {
                    Ok((prompts::completion_reply(&pending.task_id, &report.payload), BTreeMap::new()))
                }
                Ok(report) => {
                    Err(report.error.unwrap_or_else(|| "the request was rejected".into()))
                }
                Err(error) => {
                    tracing::warn!(task = %pending.task_id, %error, "backend call failed");
                    Err("the request could not be completed".into())
                }
            }
        }
        TaskBinding::Internal => match &world.schema.handler {
            Some(name) => {
                let outcome = match world.hooks.handler(name) {
                    Some(handler) => handler(&hook_context(pending, world))?,
                    None => return Err(format!("handler '{name}' is not registered")),
                };
                let reply = if outcome.reply.is_empty() {
                    prompts::completion_reply(&pending.task_id, &outcome.payload)
                } else {
                    outcome.reply
                };
                Ok((reply, outcome.facts))
            }
            None => {
                let mut context = world.scratch.clone();
                context.extend(pending.fields.clone());
                let request = KnowledgeRequest {
                    query: input.utterance.to_string(),
                    task_id: pending.task_id.clone(),
                    context,
                };
                match world.ctx.knowledge.answer(&request).await {
                    Ok(answer) => Ok((answer.answer, answer.facts)),
                    Err(error) => {
                        tracing::warn!(task = %pending.task_id, %error, "knowledge lookup failed");
                        Err("the request could not be completed".into())
                    }
                }
            }
        },
    }
}

fn hook_context<'a>(pending: &'a PendingTask, world: &'a TaskWorld<'_>) -> HookContext<'a> {
    HookContext { task_id: &pending.task_id, fields: &pending.fields, scratch: world.scratch }
}

fn cancel(pending: &mut PendingTask) -> StepOutcome {
    pending.advance(TaskStatus::Failed { reason: FailureReason::UserCancelled });
    StepOutcome::reply(prompts::cancelled_reply(&pending.task_id))
}

/// Whether the completed field set requires an explicit approval.
///
/// The schema's always-confirm flag wins; otherwise a numeric field
/// strictly above its ceiling forces confirmation. A value exactly at the
/// ceiling does not. Schema-level ceilings shadow engine-wide ones.
fn needs_confirmation(
    schema: &TaskSchema,
    global: &BTreeMap<String, f64>,
    fields: &BTreeMap<String, Value>,
) -> bool {
    if schema.confirmation_required {
        return true;
    }
    fields.iter().any(|(name, value)| {
        let Some(number) = value.as_f64() else { return false };
        schema
            .confirm_over
            .get(name)
            .or_else(|| global.get(name))
            .is_some_and(|ceiling| number > *ceiling)
    })
}

/// Whether an affirm or deny should instead fill the awaited field.
///
/// Only boolean fields, and choice fields whose options include the
/// utterance, absorb a yes or no. A free-text field never does, so "no"
/// while collecting a recipient still cancels.
fn absorbs_affirmation(schema: &TaskSchema, pending: &PendingTask, utterance: &str) -> bool {
    let Some(awaited) = schema.first_missing_required(&pending.fields) else { return false };
    match &awaited.rule {
        FieldRule::Boolean => true,
        FieldRule::OneOf { values } => {
            let trimmed = utterance.trim();
            values.iter().any(|v| v.eq_ignore_ascii_case(trimmed))
        }
        _ => false,
    }
}
