//! Command dispatch and handlers.

pub mod chat;
pub mod tasks;

use std::path::Path;

use serde_json::Value;

use crate::cli::Command;
use crate::config::EngineConfig;
use crate::registry::{HandlerOutcome, HookRegistry, TaskRegistry};

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if configuration loading or the selected
/// command handler fails.
pub fn dispatch(command: &Command, config_path: Option<&Path>) -> Result<(), String> {
    // .env may carry CONFAB_* overrides and ANTHROPIC_API_KEY.
    dotenvy::dotenv().ok();
    let config = EngineConfig::load(config_path)?;
    match command {
        Command::Chat => chat::run(&config),
        Command::Tasks => tasks::run(&config),
    }
}

/// Builds the task registry from the configured schema sources.
///
/// # Errors
///
/// Returns an error string when a source cannot be read or the merged
/// registry fails validation.
pub fn build_registry(config: &EngineConfig) -> Result<TaskRegistry, String> {
    let api_spec = std::fs::read_to_string(&config.api_spec_path)
        .map_err(|e| format!("Failed to read API spec {}: {e}", config.api_spec_path.display()))?;

    let custom = if config.enable_custom_tasks {
        match std::fs::read_to_string(&config.custom_tasks_path) {
            Ok(text) => Some(text),
            // A missing custom source is not an error; the API spec stands alone.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(format!(
                    "Failed to read custom tasks {}: {e}",
                    config.custom_tasks_path.display()
                ));
            }
        }
    } else {
        None
    };

    TaskRegistry::build(&api_spec, custom.as_deref(), hook_registry(config))
        .map_err(|e| format!("Failed to build task registry: {e}"))
}

/// Registers the callables the shipped task sources refer to by name.
fn hook_registry(config: &EngineConfig) -> HookRegistry {
    let mut hooks = HookRegistry::new();

    let remaining = config.daily_transfer_limit - config.transfers_used_today;
    hooks.register_hook("check_transfer_limit", move |cx| {
        match cx.fields.get("amount").and_then(Value::as_f64) {
            Some(amount) if amount > remaining => Err(format!(
                "the amount exceeds your remaining daily transfer limit of ${remaining:.2}"
            )),
            _ => Ok(()),
        }
    });

    hooks.register_hook("notify_recipient", |cx| {
        let recipient = cx.fields.get("recipient").and_then(Value::as_str).unwrap_or("recipient");
        tracing::info!(task_id = cx.task_id, recipient, "transfer notification queued");
        Ok(())
    });

    hooks.register_handler("lost_card", |cx| {
        let last_four = match cx.fields.get("card_last_four") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => "????".to_string(),
        };
        Ok(HandlerOutcome::reply(format!(
            "Your card ending in {last_four} is blocked and a replacement is on its way."
        )))
    });

    hooks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::registry::HookContext;

    #[test]
    fn hook_registry_covers_the_shipped_names() {
        let hooks = hook_registry(&EngineConfig::default());
        assert!(hooks.has_hook("check_transfer_limit"));
        assert!(hooks.has_hook("notify_recipient"));
        assert!(hooks.has_handler("lost_card"));
    }

    #[test]
    fn transfer_limit_hook_rejects_amounts_over_the_remaining_headroom() {
        // Default config: 10000 daily limit, 2500 already used.
        let hooks = hook_registry(&EngineConfig::default());
        let hook = hooks.hook("check_transfer_limit").unwrap();
        let scratch = BTreeMap::new();

        let mut fields = BTreeMap::new();
        fields.insert("amount".to_string(), serde_json::json!(9000.0));
        let cx = HookContext { task_id: "transfer_money", fields: &fields, scratch: &scratch };
        let err = hook(&cx).unwrap_err();
        assert!(err.contains("$7500.00"));

        fields.insert("amount".to_string(), serde_json::json!(100.0));
        let cx = HookContext { task_id: "transfer_money", fields: &fields, scratch: &scratch };
        assert!(hook(&cx).is_ok());
    }

    #[test]
    fn registry_builds_from_files_on_disk() {
        let dir = std::env::temp_dir().join("confab_commands_build");
        std::fs::create_dir_all(&dir).unwrap();
        let api_path = dir.join("openapi.json");
        let custom_path = dir.join("tasks.yaml");

        let api = serde_json::json!({
            "paths": {
                "/transfers": {
                    "post": {
                        "summary": "transfer_money",
                        "description": "Send money",
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
                        }
                    }
                }
            }
        });
        std::fs::write(&api_path, serde_json::to_string(&api).unwrap()).unwrap();
        std::fs::write(
            &custom_path,
            "tasks:\n  - id: transfer_money\n    pre_hook: check_transfer_limit\n",
        )
        .unwrap();

        let config = EngineConfig {
            api_spec_path: api_path,
            custom_tasks_path: custom_path,
            ..EngineConfig::default()
        };

        let registry = build_registry(&config).unwrap();
        assert!(registry.contains("transfer_money"));
        assert_eq!(
            registry.get("transfer_money").unwrap().pre_hook.as_deref(),
            Some("check_transfer_limit")
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_custom_source_is_not_an_error() {
        let dir = std::env::temp_dir().join("confab_commands_no_custom");
        std::fs::create_dir_all(&dir).unwrap();
        let api_path = dir.join("openapi.json");
        std::fs::write(&api_path, r#"{"paths": {}}"#).unwrap();

        let config = EngineConfig {
            api_spec_path: api_path,
            custom_tasks_path: dir.join("absent.yaml"),
            ..EngineConfig::default()
        };

        let registry = build_registry(&config).unwrap();
        assert!(registry.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
