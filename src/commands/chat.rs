//! `confab chat` command.

use std::io::{stdin, stdout};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::context::CollaboratorContext;
use crate::engine::Orchestrator;
use crate::harness::ChatLoop;

/// Execute the `chat` command.
///
/// Builds the task registry, wires the live collaborators, and hands
/// stdin/stdout to the chat loop for one session.
///
/// # Errors
///
/// Returns an error string if the registry cannot be built, the async
/// runtime cannot start, or the session fails on an infrastructure
/// boundary.
pub fn run(config: &EngineConfig) -> Result<(), String> {
    let registry = super::build_registry(config)?;
    let engine = Orchestrator::new(Arc::new(registry), config.clone());
    let ctx = CollaboratorContext::live(config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;

    let stdin = stdin();
    let stdout = stdout();
    runtime.block_on(ChatLoop::new(stdin.lock(), stdout.lock()).run(&engine, &ctx))
}
