//! Core library entry for the `confab` CLI.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod harness;
pub mod logging;
pub mod ports;
pub mod registry;
pub mod session;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => return Err(err.to_string()),
        // --help and --version render through Err but are not failures.
        Err(err) => {
            print!("{err}");
            return Ok(());
        }
    };
    logging::init();
    commands::dispatch(&cli.command, cli.config.as_deref())
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run(["confab", "unknown"]);
        assert!(result.is_err());
    }

    #[test]
    fn help_is_not_a_failure() {
        assert!(run(["confab", "--help"]).is_ok());
    }

    #[test]
    fn run_errors_on_missing_overlay() {
        let result = run(["confab", "tasks", "--config", "/nonexistent/overlay.yaml"]);
        let err = result.unwrap_err();
        assert!(err.starts_with("Failed to read config overlay"));
    }
}
