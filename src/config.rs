//! Engine configuration from environment variables and an optional YAML
//! overlay.
//!
//! Environment variables give a baseline; a YAML overlay file, when
//! present, wins for any key it sets. Every knob has a default, so the
//! engine runs with no configuration at all.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default overlay location consulted when no path is given.
pub const DEFAULT_OVERLAY: &str = "config/engine.yaml";

/// Settings for the hosted-model intent classifier.
///
/// Absent entirely, the engine uses the built-in rule classifier instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Model identifier to request.
    pub model: String,
    /// Token ceiling per classification call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Override for the API endpoint, for test doubles.
    #[serde(default)]
    pub api_url: Option<String>,
}

fn default_max_tokens() -> u32 {
    512
}

/// Every knob the engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minutes of inactivity after which a pending task expires.
    pub session_timeout_minutes: i64,
    /// Whether the custom YAML task source is merged in at startup.
    pub enable_custom_tasks: bool,
    /// Engine-wide confirmation ceilings by field name, consulted when a
    /// schema has none of its own for that field.
    pub confirm_over: BTreeMap<String, f64>,
    /// Path to the API specification JSON.
    pub api_spec_path: PathBuf,
    /// Path to the custom task YAML.
    pub custom_tasks_path: PathBuf,
    /// Base URL prepended to endpoint paths by the live backend.
    pub backend_base_url: Option<String>,
    /// Hosted-model classifier settings; `None` selects the rule classifier.
    pub llm: Option<LlmSettings>,
    /// Terms the live screening adapter refuses outright.
    pub blocked_terms: Vec<String>,
    /// Append-only audit log path; `None` logs audit records via tracing.
    pub audit_log_path: Option<PathBuf>,
    /// Demo account balance surfaced by the knowledge adapter.
    pub account_balance: f64,
    /// Demo daily transfer ceiling enforced by the limit hook.
    pub daily_transfer_limit: f64,
    /// Demo amount already transferred today.
    pub transfers_used_today: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_timeout_minutes: 10,
            enable_custom_tasks: true,
            confirm_over: BTreeMap::new(),
            api_spec_path: PathBuf::from("config/openapi.json"),
            custom_tasks_path: PathBuf::from("config/tasks.yaml"),
            backend_base_url: None,
            llm: None,
            blocked_terms: vec![
                "hack".into(),
                "exploit".into(),
                "launder".into(),
                "steal".into(),
            ],
            audit_log_path: None,
            account_balance: 1000.0,
            daily_transfer_limit: 10000.0,
            transfers_used_today: 2500.0,
        }
    }
}

/// Keys a YAML overlay may set. Anything absent keeps its current value.
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    session_timeout_minutes: Option<i64>,
    enable_custom_tasks: Option<bool>,
    confirm_over: Option<BTreeMap<String, f64>>,
    api_spec_path: Option<PathBuf>,
    custom_tasks_path: Option<PathBuf>,
    backend_base_url: Option<String>,
    llm: Option<LlmSettings>,
    blocked_terms: Option<Vec<String>>,
    audit_log_path: Option<PathBuf>,
    account_balance: Option<f64>,
    daily_transfer_limit: Option<f64>,
    transfers_used_today: Option<f64>,
}

impl EngineConfig {
    /// Reads the baseline configuration from `CONFAB_*` environment
    /// variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(minutes) = env_parse("CONFAB_SESSION_TIMEOUT_MINUTES") {
            config.session_timeout_minutes = minutes;
        }
        if let Ok(raw) = env::var("CONFAB_ENABLE_CUSTOM_TASKS") {
            config.enable_custom_tasks =
                matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(path) = env::var("CONFAB_API_SPEC") {
            config.api_spec_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("CONFAB_CUSTOM_TASKS") {
            config.custom_tasks_path = PathBuf::from(path);
        }
        if let Ok(url) = env::var("CONFAB_BACKEND_URL") {
            config.backend_base_url = Some(url);
        }
        if let Ok(model) = env::var("CONFAB_MODEL") {
            config.llm = Some(LlmSettings { model, max_tokens: default_max_tokens(), api_url: None });
        }
        if let Ok(raw) = env::var("CONFAB_BLOCKED_TERMS") {
            config.blocked_terms = raw
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
        }
        if let Ok(path) = env::var("CONFAB_AUDIT_LOG") {
            config.audit_log_path = Some(PathBuf::from(path));
        }
        config
    }

    /// Loads the effective configuration: environment baseline, then the
    /// YAML overlay at `path` (or [`DEFAULT_OVERLAY`] when it exists).
    ///
    /// # Errors
    ///
    /// Returns an error when an explicitly given overlay cannot be read,
    /// or when any overlay fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let mut config = Self::from_env();
        let overlay_path = match path {
            Some(explicit) => Some(explicit.to_path_buf()),
            None => {
                let default = PathBuf::from(DEFAULT_OVERLAY);
                default.exists().then_some(default)
            }
        };
        if let Some(overlay_path) = overlay_path {
            let text = std::fs::read_to_string(&overlay_path).map_err(|e| {
                format!("Failed to read config overlay {}: {e}", overlay_path.display())
            })?;
            let overlay: ConfigOverlay = serde_yaml::from_str(&text).map_err(|e| {
                format!("Failed to parse config overlay {}: {e}", overlay_path.display())
            })?;
            config.apply_overlay(overlay);
        }
        Ok(config)
    }

    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.session_timeout_minutes {
            self.session_timeout_minutes = v;
        }
        if let Some(v) = overlay.enable_custom_tasks {
            self.enable_custom_tasks = v;
        }
        if let Some(v) = overlay.confirm_over {
            self.confirm_over = v;
        }
        if let Some(v) = overlay.api_spec_path {
            self.api_spec_path = v;
        }
        if let Some(v) = overlay.custom_tasks_path {
            self.custom_tasks_path = v;
        }
        if let Some(v) = overlay.backend_base_url {
            self.backend_base_url = Some(v);
        }
        if let Some(v) = overlay.llm {
            self.llm = Some(v);
        }
        if let Some(v) = overlay.blocked_terms {
            self.blocked_terms = v;
        }
        if let Some(v) = overlay.audit_log_path {
            self.audit_log_path = Some(v);
        }
        if let Some(v) = overlay.account_balance {
            self.account_balance = v;
        }
        if let Some(v) = overlay.daily_transfer_limit {
            self.daily_transfer_limit = v;
        }
        if let Some(v) = overlay.transfers_used_today {
            self.transfers_used_today = v;
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, raw, "ignoring unparseable environment override");
            None
        }
    }
}
