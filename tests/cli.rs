//! Integration tests for top-level CLI behavior.
//!
//! These run the real binary from the package root, so the shipped files
//! under `config/` are the task sources. The chat scenario stays on the
//! rule classifier and the fact-backed knowledge source, so nothing here
//! needs the network.

use std::io::Write as _;
use std::process::{Command, Stdio};

fn run_confab(args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_confab");
    Command::new(bin).args(args).output().expect("failed to run confab binary")
}

#[test]
fn tasks_subcommand_lists_the_shipped_tasks() {
    let output = run_confab(&["tasks"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("transfer_money"));
    assert!(stdout.contains("POST /transfers"));
    assert!(stdout.contains("check_balance"));
    assert!(stdout.contains("internal"));
    assert!(stdout.contains("report_lost_card"));
    assert!(stdout.contains("4 task(s) total."));
}

#[test]
fn chat_answers_a_balance_question_and_quits() {
    let bin = env!("CARGO_BIN_EXE_confab");
    let mut child = Command::new(bin)
        .arg("chat")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn confab binary");

    child
        .stdin
        .as_mut()
        .expect("child stdin")
        .write_all(b"what is my balance\n/quit\n")
        .expect("write to child stdin");

    let output = child.wait_with_output().expect("wait for confab binary");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("confab (type /quit to end the session)"));
    assert!(stdout.contains("bot> Your current balance is $1,000.00."));
    assert!(stdout.contains("bot> Goodbye! Have a great day."));
}

#[test]
fn help_lists_both_subcommands() {
    let output = run_confab(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("chat"));
    assert!(stdout.contains("tasks"));
    assert!(stdout.contains("--config"));
}

#[test]
fn unknown_subcommand_fails() {
    let output = run_confab(&["frobnicate"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("frobnicate"));
}

#[test]
fn missing_overlay_is_reported() {
    let output = run_confab(&["tasks", "--config", "/nonexistent/overlay.yaml"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read config overlay"));
}
