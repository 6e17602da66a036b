//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `confab`.
#[derive(Debug, Parser)]
#[command(name = "confab", version, about = "Turn-based dialogue engine for multi-step tasks")]
pub struct Cli {
    /// Path to a YAML configuration overlay.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an interactive chat session on stdin/stdout.
    Chat,
    /// List the tasks the engine can run.
    Tasks,
}
