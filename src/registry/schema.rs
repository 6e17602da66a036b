//! Core schema types shared by both registry sources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method for backend-bound tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP PATCH.
    Patch,
    /// HTTP DELETE.
    Delete,
}

impl Method {
    /// Parses a method key as it appears in an API specification.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "patch" => Some(Self::Patch),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Whether the method changes backend state. Mutating methods default
    /// to requiring confirmation.
    #[must_use]
    pub fn is_mutating(self) -> bool {
        !matches!(self, Self::Get)
    }

    /// Uppercase name for display and wire use.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

/// Where a task executes once all its fields are collected and confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskBinding {
    /// Handled inside the engine: a registered handler if the schema names
    /// one, otherwise the knowledge collaborator.
    Internal,
    /// Dispatched to a backend endpoint.
    Backend {
        /// Endpoint path, e.g. `/transfers`.
        endpoint: String,
        /// HTTP method used for the call.
        method: Method,
    },
}

/// Typed shape constraint interpreting a raw utterance into a field value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldRule {
    /// Any non-empty text.
    #[default]
    Text,
    /// A number, optionally bounded. Accepts the first numeric token in the
    /// utterance, with currency symbols and thousands separators stripped.
    Number {
        /// Inclusive lower bound.
        #[serde(default)]
        min: Option<f64>,
        /// Inclusive upper bound.
        #[serde(default)]
        max: Option<f64>,
    },
    /// A whole number.
    Integer,
    /// A yes/no value.
    Boolean,
    /// One of a fixed set of values, matched case-insensitively.
    OneOf {
        /// The allowed values.
        values: Vec<String>,
    },
}

impl FieldRule {
    /// Stable kind name used when checking that a merge keeps rule kinds.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number { .. } => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::OneOf { .. } => "one_of",
        }
    }

    /// Interprets a raw utterance against this rule.
    ///
    /// # Errors
    ///
    /// Returns a user-facing validation note when the utterance does not
    /// satisfy the rule.
    pub fn interpret(&self, utterance: &str) -> Result<Value, String> {
        let trimmed = utterance.trim();
        match self {
            Self::Text => {
                if trimmed.is_empty() {
                    Err("A value is required.".into())
                } else {
                    Ok(Value::String(trimmed.to_string()))
                }
            }
            Self::Number { min, max } => {
                let n = first_number(trimmed).ok_or("Please provide a number.")?;
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("Please provide a number of at least {min}."));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("Please provide a number of at most {max}."));
                    }
                }
                serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .ok_or_else(|| "Please provide a finite number.".into())
            }
            Self::Integer => {
                let n = first_number(trimmed).ok_or("Please provide a whole number.")?;
                if n.fract() != 0.0 {
                    return Err("Please provide a whole number.".into());
                }
                #[allow(clippy::cast_possible_truncation)]
                Ok(Value::Number(serde_json::Number::from(n as i64)))
            }
            Self::Boolean => {
                let lower = trimmed.to_lowercase();
                match lower.as_str() {
                    "yes" | "y" | "true" => Ok(Value::Bool(true)),
                    "no" | "n" | "false" => Ok(Value::Bool(false)),
                    _ => Err("Please answer yes or no.".into()),
                }
            }
            Self::OneOf { values } => {
                let lower = trimmed.to_lowercase();
                values
                    .iter()
                    .find(|v| v.to_lowercase() == lower)
                    .map(|v| Value::String(v.clone()))
                    .ok_or_else(|| format!("Please choose one of: {}.", values.join(", ")))
            }
        }
    }
}

/// Extracts the first numeric token from an utterance.
///
/// Currency symbols, commas and surrounding words are ignored, so replies
/// like "okey transfer 10" or "$1,000.50" both yield a number.
pub(crate) fn first_number(utterance: &str) -> Option<f64> {
    for raw in utterance.split_whitespace() {
        let cleaned: String =
            raw.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-').collect();
        if cleaned.chars().any(|c| c.is_ascii_digit()) {
            if let Ok(n) = cleaned.parse::<f64>() {
                return Some(n);
            }
        }
    }
    None
}

/// A single field a task collects before execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within one schema.
    pub name: String,
    /// Validation rule for this field.
    #[serde(default)]
    pub rule: FieldRule,
    /// Prompt template used to ask for this field. `{name}` placeholders
    /// are substituted with already-collected values.
    #[serde(default)]
    pub prompt: Option<String>,
}

impl FieldSpec {
    /// A text field with no prompt template.
    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self { name: name.into(), rule: FieldRule::Text, prompt: None }
    }
}

/// Immutable description of one task the engine can run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSchema {
    /// Unique task identifier.
    pub id: String,
    /// Human-readable description, also handed to the classifier.
    #[serde(default)]
    pub description: String,
    /// Fields that must be collected before execution, in collection order.
    #[serde(default)]
    pub required: Vec<FieldSpec>,
    /// Fields that may be filled from extracted entities but are never
    /// prompted for.
    #[serde(default)]
    pub optional: Vec<FieldSpec>,
    /// Whether execution always needs an explicit confirmation.
    #[serde(default)]
    pub confirmation_required: bool,
    /// Where the task executes.
    pub binding: TaskBinding,
    /// Hook run immediately before the execution action.
    #[serde(default)]
    pub pre_hook: Option<String>,
    /// Hook run immediately after a successful execution action.
    #[serde(default)]
    pub post_hook: Option<String>,
    /// Internal handler name. Only valid on internally bound tasks.
    #[serde(default)]
    pub handler: Option<String>,
    /// Field name to numeric ceiling. A collected value strictly above its
    /// ceiling forces a confirmation step.
    #[serde(default)]
    pub confirm_over: BTreeMap<String, f64>,
}

impl TaskSchema {
    /// Whether execution dispatches to a backend endpoint.
    #[must_use]
    pub fn has_backend(&self) -> bool {
        matches!(self.binding, TaskBinding::Backend { .. })
    }

    /// Looks up a field spec by name across required and optional lists.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.required.iter().chain(self.optional.iter()).find(|f| f.name == name)
    }

    /// The first required field, in schema order, with no collected value.
    ///
    /// Re-running this after an interruption lands on the same field, which
    /// is what makes re-prompting idempotent.
    #[must_use]
    pub fn first_missing_required(&self, fields: &BTreeMap<String, Value>) -> Option<&FieldSpec> {
        self.required.iter().find(|f| !fields.contains_key(&f.name))
    }
}

/// One `(id, description)` pair in the catalogue handed to the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutline {
    /// Task identifier.
    pub id: String,
    /// Human-readable description.
    pub description: String,
}
