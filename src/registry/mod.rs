//! Task registry assembled from two heterogeneous schema sources.
//!
//! At startup the registry merges API-derived schemas with custom YAML
//! definitions into one immutable mapping from task identifier to schema.
//! Collisions resolve field-level: explicitly authored custom attributes
//! win, the backend binding always survives from the API side, and
//! anything irreconcilable aborts the build. A partial registry is never
//! served.

pub mod custom;
pub mod hooks;
pub mod openapi;
pub mod schema;

use std::collections::{BTreeMap, BTreeSet};

pub use custom::CustomTask;
pub use hooks::{Handler, HandlerOutcome, Hook, HookContext, HookRegistry};
pub use schema::{FieldRule, FieldSpec, Method, TaskBinding, TaskOutline, TaskSchema};

use crate::error::SchemaError;

/// Immutable mapping from task identifier to schema, plus the hook
/// callables the schemas reference.
///
/// Built once at startup and shared read-only across sessions. Two builds
/// from identical sources produce identical serialized output.
pub struct TaskRegistry {
    schemas: BTreeMap<String, TaskSchema>,
    hooks: HookRegistry,
}

impl TaskRegistry {
    /// Builds the registry from the API specification text and, when the
    /// custom-task feature is enabled, the custom YAML text.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when either source fails to parse, the
    /// merge hits an irreconcilable collision, a schema violates a shape
    /// rule, or a referenced hook or handler is not registered.
    pub fn build(
        api_spec: &str,
        custom_tasks: Option<&str>,
        hooks: HookRegistry,
    ) -> Result<Self, SchemaError> {
        let mut schemas: BTreeMap<String, TaskSchema> = BTreeMap::new();

        for schema in openapi::load(api_spec)? {
            let id = schema.id.clone();
            if schemas.insert(id.clone(), schema).is_some() {
                return Err(SchemaError::Conflict {
                    task: id,
                    detail: "duplicate task identifier in the API specification".into(),
                });
            }
        }

        if let Some(text) = custom_tasks {
            for task in custom::load(text)? {
                match schemas.get_mut(&task.id) {
                    Some(base) => merge_custom(base, task)?,
                    None => {
                        let schema = task.into_schema();
                        schemas.insert(schema.id.clone(), schema);
                    }
                }
            }
        }

        for schema in schemas.values() {
            validate_shape(schema, &hooks)?;
        }

        Ok(Self { schemas, hooks })
    }

    /// Whether a task with this identifier exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.schemas.contains_key(id)
    }

    /// Looks up a schema by task identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TaskSchema> {
        self.schemas.get(id)
    }

    /// The full schema map, in deterministic identifier order.
    #[must_use]
    pub fn schemas(&self) -> &BTreeMap<String, TaskSchema> {
        &self.schemas
    }

    /// The hook and handler callables schemas resolve against.
    #[must_use]
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Catalogue of `(id, description)` pairs handed to the classifier
    /// every turn, in deterministic order.
    #[must_use]
    pub fn summary(&self) -> Vec<TaskOutline> {
        self.schemas
            .values()
            .map(|s| TaskOutline { id: s.id.clone(), description: s.description.clone() })
            .collect()
    }

    /// Number of registered tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the registry holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.schemas.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Applies a custom definition on top of an API-derived schema.
///
/// Present attributes override; the binding always survives from the API
/// side. A custom field spec may tighten an existing field or promote it
/// from optional to required, but may not change its rule kind or demote
/// a required field.
fn merge_custom(base: &mut TaskSchema, task: CustomTask) -> Result<(), SchemaError> {
    if let Some(description) = task.description {
        base.description = description;
    }
    if let Some(confirmation) = task.confirmation_required {
        base.confirmation_required = confirmation;
    }
    if task.pre_hook.is_some() {
        base.pre_hook = task.pre_hook;
    }
    if task.post_hook.is_some() {
        base.post_hook = task.post_hook;
    }
    if task.handler.is_some() {
        base.handler = task.handler;
    }
    for (field, ceiling) in task.confirm_over {
        base.confirm_over.insert(field, ceiling);
    }

    for spec in task.required {
        if let Some(existing) = base.required.iter_mut().find(|f| f.name == spec.name) {
            check_same_kind(&base.id, existing, &spec)?;
            *existing = spec;
        } else if let Some(pos) = base.optional.iter().position(|f| f.name == spec.name) {
            let existing = base.optional.remove(pos);
            check_same_kind(&base.id, &existing, &spec)?;
            base.required.push(spec);
        } else {
            base.required.push(spec);
        }
    }

    for spec in task.optional {
        if base.required.iter().any(|f| f.name == spec.name) {
            return Err(SchemaError::Conflict {
                task: base.id.clone(),
                detail: format!("cannot demote required field '{}' to optional", spec.name),
            });
        }
        if let Some(existing) = base.optional.iter_mut().find(|f| f.name == spec.name) {
            check_same_kind(&base.id, existing, &spec)?;
            *existing = spec;
        } else {
            base.optional.push(spec);
        }
    }

    Ok(())
}

fn check_same_kind(
    task: &str,
    existing: &FieldSpec,
    incoming: &FieldSpec,
) -> Result<(), SchemaError> {
    if existing.rule.kind() == incoming.rule.kind() {
        Ok(())
    } else {
        Err(SchemaError::Conflict {
            task: task.to_string(),
            detail: format!(
                "field '{}' changes kind from {} to {}",
                incoming.name,
                existing.rule.kind(),
                incoming.rule.kind()
            ),
        })
    }
}

fn validate_shape(schema: &TaskSchema, hooks: &HookRegistry) -> Result<(), SchemaError> {
    let mut seen = BTreeSet::new();
    for spec in schema.required.iter().chain(schema.optional.iter()) {
        if spec.name.trim().is_empty() {
            return Err(SchemaError::Shape {
                task: schema.id.clone(),
                detail: "empty field name".into(),
            });
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(SchemaError::Shape {
                task: schema.id.clone(),
                detail: format!("field '{}' appears more than once", spec.name),
            });
        }
        if let FieldRule::OneOf { values } = &spec.rule {
            if values.is_empty() {
                return Err(SchemaError::Shape {
                    task: schema.id.clone(),
                    detail: format!("field '{}' allows no values", spec.name),
                });
            }
        }
    }

    if schema.handler.is_some() && schema.has_backend() {
        return Err(SchemaError::Shape {
            task: schema.id.clone(),
            detail: "an internal handler cannot be attached to a backend-bound task".into(),
        });
    }

    for name in [&schema.pre_hook, &schema.post_hook].into_iter().flatten() {
        if !hooks.has_hook(name) {
            return Err(SchemaError::UnknownHook { task: schema.id.clone(), name: name.clone() });
        }
    }
    if let Some(name) = &schema.handler {
        if !hooks.has_handler(name) {
            return Err(SchemaError::UnknownHook { task: schema.id.clone(), name: name.clone() });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_doc() -> String {
        serde_json::json!({
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
                                            "amount": { "type": "number", "minimum": 0.01 },
                                            "note": { "type": "string" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        })
        .to_string()
    }

    // --- merge tests ---

    #[test]
    fn custom_attributes_override_field_level() {
        let custom = r#"
tasks:
  - id: transfer_money
    description: Transfer funds between accounts
    pre_hook: check_transfer_limit
    confirm_over: { amount: 1000.0 }
    required:
      - name: amount
        rule: { type: number, min: 0.01, max: 50000.0 }
        prompt: "How much do you want to send to {recipient}?"
"#;
        let mut hooks = HookRegistry::new();
        hooks.register_hook("check_transfer_limit", |_| Ok(()));

        let registry = TaskRegistry::build(&api_doc(), Some(custom), hooks).unwrap();
        let schema = registry.get("transfer_money").unwrap();

        assert_eq!(schema.description, "Transfer funds between accounts");
        assert_eq!(schema.pre_hook.as_deref(), Some("check_transfer_limit"));
        assert_eq!(schema.confirm_over.get("amount"), Some(&1000.0));
        // Binding survives from the API side.
        assert!(schema.has_backend());
        // Field order stays recipient-then-amount; the amount rule tightened.
        assert_eq!(schema.required[0].name, "recipient");
        assert_eq!(schema.required[1].name, "amount");
        assert_eq!(
            schema.required[1].rule,
            FieldRule::Number { min: Some(0.01), max: Some(50000.0) }
        );
        assert!(schema.required[1].prompt.is_some());
    }

    #[test]
    fn rule_kind_change_is_a_conflict() {
        let custom = r"
tasks:
  - id: transfer_money
    required:
      - name: amount
        rule: { type: text }
";
        let err = TaskRegistry::build(&api_doc(), Some(custom), HookRegistry::new()).unwrap_err();
        match err {
            SchemaError::Conflict { task, detail } => {
                assert_eq!(task, "transfer_money");
                assert!(detail.contains("changes kind"));
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn demoting_required_to_optional_is_a_conflict() {
        let custom = r"
tasks:
  - id: transfer_money
    optional:
      - name: recipient
";
        let err = TaskRegistry::build(&api_doc(), Some(custom), HookRegistry::new()).unwrap_err();
        assert!(matches!(err, SchemaError::Conflict { .. }));
    }

    #[test]
    fn promoting_optional_to_required_is_allowed() {
        let custom = r"
tasks:
  - id: transfer_money
    required:
      - name: note
";
        let registry =
            TaskRegistry::build(&api_doc(), Some(custom), HookRegistry::new()).unwrap();
        let schema = registry.get("transfer_money").unwrap();
        assert!(schema.required.iter().any(|f| f.name == "note"));
        assert!(schema.optional.is_empty());
    }

    #[test]
    fn custom_only_tasks_join_the_union() {
        let custom = "tasks:\n  - id: check_balance\n    description: Check your balance\n";
        let registry =
            TaskRegistry::build(&api_doc(), Some(custom), HookRegistry::new()).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(!registry.get("check_balance").unwrap().has_backend());
    }

    #[test]
    fn disabled_custom_source_leaves_api_tasks_only() {
        let registry = TaskRegistry::build(&api_doc(), None, HookRegistry::new()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("transfer_money"));
    }

    // --- shape validation tests ---

    #[test]
    fn unknown_hook_aborts_the_build() {
        let custom = "tasks:\n  - id: transfer_money\n    pre_hook: does_not_exist\n";
        let err = TaskRegistry::build(&api_doc(), Some(custom), HookRegistry::new()).unwrap_err();
        match err {
            SchemaError::UnknownHook { task, name } => {
                assert_eq!(task, "transfer_money");
                assert_eq!(name, "does_not_exist");
            }
            other => panic!("expected UnknownHook, got {other:?}"),
        }
    }

    #[test]
    fn unknown_handler_aborts_the_build() {
        let custom = "tasks:\n  - id: check_balance\n    handler: missing\n";
        let err = TaskRegistry::build(&api_doc(), Some(custom), HookRegistry::new()).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownHook { .. }));
    }

    #[test]
    fn duplicate_field_name_is_a_shape_error() {
        let custom = r"
tasks:
  - id: broken
    required:
      - name: city
    optional:
      - name: city
";
        let err = TaskRegistry::build(&api_doc(), Some(custom), HookRegistry::new()).unwrap_err();
        assert!(matches!(err, SchemaError::Shape { .. }));
    }

    #[test]
    fn handler_on_backend_task_is_a_shape_error() {
        let mut hooks = HookRegistry::new();
        hooks.register_handler("h", |_| Ok(HandlerOutcome::reply("ok")));
        let custom = "tasks:\n  - id: transfer_money\n    handler: h\n";
        let err = TaskRegistry::build(&api_doc(), Some(custom), hooks).unwrap_err();
        assert!(matches!(err, SchemaError::Shape { .. }));
    }

    // --- determinism tests ---

    #[test]
    fn identical_sources_serialize_identically() {
        let custom = "tasks:\n  - id: check_balance\n    description: Check your balance\n";
        let first =
            TaskRegistry::build(&api_doc(), Some(custom), HookRegistry::new()).unwrap();
        let second =
            TaskRegistry::build(&api_doc(), Some(custom), HookRegistry::new()).unwrap();

        let a = serde_yaml::to_string(first.schemas()).unwrap();
        let b = serde_yaml::to_string(second.schemas()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn summary_lists_tasks_in_identifier_order() {
        let custom = "tasks:\n  - id: check_balance\n    description: Check your balance\n";
        let registry =
            TaskRegistry::build(&api_doc(), Some(custom), HookRegistry::new()).unwrap();
        let outline: Vec<_> = registry.summary().into_iter().map(|o| o.id).collect();
        assert_eq!(outline, vec!["check_balance", "transfer_money"]);
    }
}
