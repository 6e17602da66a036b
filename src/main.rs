//! Binary entrypoint for the `confab` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    match confab::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
