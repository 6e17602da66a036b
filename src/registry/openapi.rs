//! Loads task schemas from an OpenAPI-style JSON document.
//!
//! Only the subset the engine needs is read: `paths`, operation summaries,
//! request-body JSON schemas and a few `x-` extensions. Keys that are not
//! HTTP methods (`parameters`, `servers`, ...) are skipped. The task
//! identifier is the operation `summary`, falling back to `operationId`,
//! falling back to a `METHOD /path` composite.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::schema::{FieldRule, FieldSpec, Method, TaskBinding, TaskSchema};
use crate::error::SchemaError;

#[derive(Debug, Deserialize)]
struct ApiDocument {
    #[serde(default)]
    paths: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default, rename = "operationId")]
    operation_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "requestBody")]
    request_body: Option<RequestBody>,
    #[serde(default, rename = "x-confirmation-required")]
    confirmation_required: Option<bool>,
    #[serde(default, rename = "x-confirm-over")]
    confirm_over: BTreeMap<String, f64>,
    #[serde(default, rename = "x-prompts")]
    prompts: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RequestBody {
    #[serde(default)]
    content: BTreeMap<String, MediaType>,
}

#[derive(Debug, Deserialize)]
struct MediaType {
    #[serde(default)]
    schema: Option<BodySchema>,
}

#[derive(Debug, Deserialize)]
struct BodySchema {
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    properties: BTreeMap<String, Property>,
}

#[derive(Debug, Deserialize)]
struct Property {
    #[serde(default, rename = "type")]
    ty: Option<String>,
    #[serde(default)]
    minimum: Option<f64>,
    #[serde(default)]
    maximum: Option<f64>,
    #[serde(default, rename = "enum")]
    allowed: Option<Vec<String>>,
}

/// Parses an API specification document into task schemas.
///
/// # Errors
///
/// Returns [`SchemaError::ApiSpec`] when the document is not valid JSON or
/// an operation cannot be read.
pub fn load(text: &str) -> Result<Vec<TaskSchema>, SchemaError> {
    let doc: ApiDocument =
        serde_json::from_str(text).map_err(|e| SchemaError::ApiSpec(e.to_string()))?;

    let mut schemas = Vec::new();
    for (path, item) in &doc.paths {
        for (key, raw) in item {
            let Some(method) = Method::parse(key) else {
                continue;
            };
            let operation: Operation = serde_json::from_value(raw.clone())
                .map_err(|e| SchemaError::ApiSpec(format!("{key} {path}: {e}")))?;
            schemas.push(build_schema(path, method, operation));
        }
    }
    Ok(schemas)
}

fn build_schema(path: &str, method: Method, operation: Operation) -> TaskSchema {
    let id = operation
        .summary
        .clone()
        .or_else(|| operation.operation_id.clone())
        .unwrap_or_else(|| format!("{} {path}", method.as_str()));

    let body = operation
        .request_body
        .as_ref()
        .and_then(|rb| rb.content.values().next())
        .and_then(|media| media.schema.as_ref());

    let mut required = Vec::new();
    let mut optional = Vec::new();
    if let Some(body) = body {
        for name in &body.required {
            let rule = body.properties.get(name).map_or(FieldRule::Text, property_rule);
            required.push(FieldSpec {
                name: name.clone(),
                rule,
                prompt: operation.prompts.get(name).cloned(),
            });
        }
        for (name, property) in &body.properties {
            if body.required.contains(name) {
                continue;
            }
            optional.push(FieldSpec {
                name: name.clone(),
                rule: property_rule(property),
                prompt: operation.prompts.get(name).cloned(),
            });
        }
    }

    TaskSchema {
        id,
        description: operation.description.unwrap_or_default(),
        required,
        optional,
        confirmation_required: operation.confirmation_required.unwrap_or(method.is_mutating()),
        binding: TaskBinding::Backend { endpoint: path.to_string(), method },
        pre_hook: None,
        post_hook: None,
        handler: None,
        confirm_over: operation.confirm_over,
    }
}

fn property_rule(property: &Property) -> FieldRule {
    if let Some(values) = &property.allowed {
        return FieldRule::OneOf { values: values.clone() };
    }
    match property.ty.as_deref() {
        Some("number") => FieldRule::Number { min: property.minimum, max: property.maximum },
        Some("integer") => FieldRule::Integer,
        Some("boolean") => FieldRule::Boolean,
        _ => FieldRule::Text,
    }
}
