//! Every user-visible string the engine produces.
//!
//! Replies are assembled here and nowhere else, so transcript wording can
//! change without touching the state machine. All builders are pure
//! string functions over already-collected state.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::Value;

use crate::ports::SmallTalkKind;
use crate::registry::{FieldSpec, TaskOutline, TaskSchema};

/// Fixed reply for utterances the screening port blocked.
pub const REFUSAL: &str =
    "I'm sorry, I cannot process that request. It violates our safety policies.";

/// Task identifier rendered for humans: underscores become spaces.
#[must_use]
pub fn display_name(task_id: &str) -> String {
    task_id.replace('_', " ")
}

/// Renders a collected value the way a person would say it.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn value_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(true) => "yes".into(),
        Value::Bool(false) => "no".into(),
        other => other.to_string(),
    }
}

/// Prompt asking for one missing field.
///
/// A schema-supplied template may reference already-collected fields by
/// name in braces; without a template the prompt falls back to a plain
/// request for the field.
#[must_use]
pub fn field_prompt(spec: &FieldSpec, fields: &BTreeMap<String, Value>) -> String {
    let Some(template) = &spec.prompt else {
        return format!("Please provide the {}.", display_name(&spec.name));
    };
    let mut prompt = template.clone();
    for (name, value) in fields {
        prompt = prompt.replace(&format!("{{{name}}}"), &value_display(value));
    }
    prompt
}

/// Summary of the collected fields, ending in an approve-or-cancel ask.
#[must_use]
pub fn confirmation_prompt(schema: &TaskSchema, fields: &BTreeMap<String, Value>) -> String {
    let mut prompt = format!("Please confirm {}", display_name(&schema.id));
    let mut parts = Vec::new();
    for spec in schema.required.iter().chain(schema.optional.iter()) {
        if let Some(value) = fields.get(&spec.name) {
            parts.push(format!("{}: {}", display_name(&spec.name), value_display(value)));
        }
    }
    if !parts.is_empty() {
        let _ = write!(prompt, " ({})", parts.join(", "));
    }
    prompt.push_str(". Approve or cancel?");
    prompt
}

/// Fallback when no route produced anything actionable.
#[must_use]
pub fn clarify_prompt(catalogue: &[TaskOutline]) -> String {
    let mut prompt = String::from("Sorry, I didn't catch that. I can help with:\n");
    for outline in catalogue {
        let _ = writeln!(prompt, "  - {}: {}", display_name(&outline.id), outline.description);
    }
    prompt.push_str("What would you like to do?");
    prompt
}

/// Canned conversational replies, one per small-talk kind.
#[must_use]
pub fn small_talk_reply(kind: SmallTalkKind) -> &'static str {
    match kind {
        SmallTalkKind::Greeting => "Hello! How can I help you today?",
        SmallTalkKind::Farewell => "Goodbye! Have a great day.",
        SmallTalkKind::Chitchat => "I'm just a bot, but I'm here to help! How can I assist you?",
        SmallTalkKind::OffTopic => "I can only assist with the tasks I support. How can I help?",
    }
}

/// Reply when a mid-task switch cannot be absorbed in one turn.
#[must_use]
pub fn divert_reject(current_task: &str) -> String {
    format!("Let's finish your {} request first.", display_name(current_task))
}

/// Reply after the user cancels a pending task.
#[must_use]
pub fn cancelled_reply(task_id: &str) -> String {
    format!("Okay, I've cancelled the {} request.", display_name(task_id))
}

/// Reply after successful execution. A `message` string in the backend
/// payload wins over the generic completion line.
#[must_use]
pub fn completion_reply(task_id: &str, payload: &Value) -> String {
    if let Some(message) = payload.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    format!("Your {} request completed successfully.", display_name(task_id))
}

/// Reply when execution or a pre-hook ends the task.
#[must_use]
pub fn failure_reply(task_id: &str, detail: &str) -> String {
    format!("Unable to complete {}: {detail}", display_name(task_id))
}

/// Prefix when a pending task just expired from inactivity.
#[must_use]
pub fn expiry_notice(task_id: &str) -> String {
    format!("Your {} request expired due to inactivity.", display_name(task_id))
}
