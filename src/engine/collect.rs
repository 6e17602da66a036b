//! Field collection for a task in COLLECTING.
//!
//! Collection is pointer-free: the awaited field is always recomputed as
//! the first required field without a value, so re-prompting after an
//! invalid or diverted turn needs no bookkeeping. Classifier entities are
//! validated through the same rules as typed input and never overwrite a
//! value the user already confirmed.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::registry::{FieldSpec, TaskSchema};

/// Result of applying one utterance to a collecting task.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectSignal {
    /// Still missing fields; ask for this one next.
    Prompt(FieldSpec),
    /// Every required field now has a value.
    Filled,
    /// The utterance failed the awaited field's rule.
    Invalid {
        /// The field that rejected the input.
        field: FieldSpec,
        /// The rule's rejection message.
        message: String,
    },
}

/// Copies classifier entities into the field map, one field at a time.
///
/// Each entity must name a known field and pass its validation rule to be
/// seeded; failing entities are dropped silently so a bad extraction can
/// never wedge the task. Existing values are never overwritten.
pub fn seed_entities(
    schema: &TaskSchema,
    fields: &mut BTreeMap<String, Value>,
    entities: &BTreeMap<String, String>,
) {
    for (name, raw) in entities {
        if fields.contains_key(name) {
            continue;
        }
        let Some(spec) = schema.field(name) else { continue };
        if let Ok(value) = spec.rule.interpret(raw) {
            fields.insert(name.clone(), value);
        }
    }
}

/// Applies one user utterance to the collecting task.
///
/// Entities for fields other than the awaited one are seeded first, then
/// the awaited field is filled: from a matching entity when the classifier
/// extracted one, otherwise from the raw utterance. Either path runs the
/// field's validation rule; on rejection nothing changes and the same
/// field is awaited again.
pub fn apply_input(
    schema: &TaskSchema,
    fields: &mut BTreeMap<String, Value>,
    utterance: &str,
    entities: &BTreeMap<String, String>,
) -> CollectSignal {
    let Some(awaited) = schema.first_missing_required(fields).cloned() else {
        return CollectSignal::Filled;
    };

    let others: BTreeMap<String, String> = entities
        .iter()
        .filter(|(name, _)| **name != awaited.name)
        .map(|(n, v)| (n.clone(), v.clone()))
        .collect();
    seed_entities(schema, fields, &others);

    let candidate = entities.get(&awaited.name).map_or(utterance, String::as_str);
    match awaited.rule.interpret(candidate) {
        Ok(value) => {
            fields.insert(awaited.name.clone(), value);
            match schema.first_missing_required(fields) {
                Some(next) => CollectSignal::Prompt(next.clone()),
                None => CollectSignal::Filled,
            }
        }
        Err(message) => CollectSignal::Invalid { field: awaited, message },
    }
}
