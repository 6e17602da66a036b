//! Loads task definitions from the custom YAML source.
//!
//! Custom tasks are authored explicitly, so unlike the API-derived side
//! every attribute here is optional: an absent attribute means "leave the
//! API-derived value alone" during the merge, while a present one wins.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::schema::{FieldSpec, TaskBinding, TaskSchema};
use crate::error::SchemaError;

#[derive(Debug, Deserialize)]
struct CustomTaskFile {
    #[serde(default)]
    tasks: Vec<CustomTask>,
}

/// One task definition from the custom YAML source.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomTask {
    /// Task identifier; collides with API-derived tasks on purpose when
    /// the author wants to override them.
    pub id: String,
    /// Description override.
    #[serde(default)]
    pub description: Option<String>,
    /// Required field specs, in collection order.
    #[serde(default)]
    pub required: Vec<FieldSpec>,
    /// Optional field specs.
    #[serde(default)]
    pub optional: Vec<FieldSpec>,
    /// Confirmation override.
    #[serde(default)]
    pub confirmation_required: Option<bool>,
    /// Pre-execution hook name.
    #[serde(default)]
    pub pre_hook: Option<String>,
    /// Post-execution hook name.
    #[serde(default)]
    pub post_hook: Option<String>,
    /// Internal handler name.
    #[serde(default)]
    pub handler: Option<String>,
    /// Per-field confirmation ceilings.
    #[serde(default)]
    pub confirm_over: BTreeMap<String, f64>,
}

impl CustomTask {
    /// Converts a custom-only task into a full schema. Custom tasks are
    /// always internally bound; only the API side can attach endpoints.
    #[must_use]
    pub fn into_schema(self) -> TaskSchema {
        TaskSchema {
            id: self.id,
            description: self.description.unwrap_or_default(),
            required: self.required,
            optional: self.optional,
            confirmation_required: self.confirmation_required.unwrap_or(false),
            binding: TaskBinding::Internal,
            pre_hook: self.pre_hook,
            post_hook: self.post_hook,
            handler: self.handler,
            confirm_over: self.confirm_over,
        }
    }
}

/// Parses the custom YAML source into task definitions.
///
/// # Errors
///
/// Returns [`SchemaError::CustomTasks`] when the document is not valid YAML.
pub fn load(text: &str) -> Result<Vec<CustomTask>, SchemaError> {
    let file: CustomTaskFile =
        serde_yaml::from_str(text).map_err(|e| SchemaError::CustomTasks(e.to_string()))?;
    Ok(file.tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::schema::FieldRule;

    #[test]
    fn load_reads_explicit_field_specs() {
        let yaml = r#"
tasks:
  - id: report_lost_card
    description: Report a lost or stolen card
    confirmation_required: true
    handler: lost_card
    required:
      - name: card_last_four
        rule: { type: integer }
        prompt: "What are the last four digits of the card?"
"#;
        let tasks = load(yaml).unwrap();
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.id, "report_lost_card");
        assert_eq!(task.confirmation_required, Some(true));
        assert_eq!(task.handler.as_deref(), Some("lost_card"));
        assert_eq!(task.required[0].rule, FieldRule::Integer);
    }

    #[test]
    fn absent_attributes_stay_none() {
        let yaml = "tasks:\n  - id: check_balance\n";
        let tasks = load(yaml).unwrap();
        let task = &tasks[0];
        assert!(task.description.is_none());
        assert!(task.confirmation_required.is_none());
        assert!(task.required.is_empty());
    }

    #[test]
    fn custom_only_tasks_bind_internally() {
        let yaml = "tasks:\n  - id: check_balance\n    description: Check your balance\n";
        let schema = load(yaml).unwrap().remove(0).into_schema();
        assert_eq!(schema.binding, TaskBinding::Internal);
        assert!(!schema.confirmation_required);
    }

    #[test]
    fn invalid_yaml_is_a_custom_tasks_error() {
        let err = load("tasks: {nope").unwrap_err();
        assert!(matches!(err, SchemaError::CustomTasks(_)));
    }

    #[test]
    fn empty_document_yields_no_tasks() {
        assert!(load("tasks: []").unwrap().is_empty());
    }
}
