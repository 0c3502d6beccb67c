//! Canned operation stdout, built with the same marker functions the
//! provisioning operation uses.

use std::time::Duration;

use provrun::contract::markers::{status_code_line, status_line, summary_line, unverified_status_lines};
use provrun::exec::OperationResult;

const ACTION: &str = "Executing provisioning task";

/// Job accepted (202), then one status line per entry.
pub fn accepted_stdout(statuses: &[&str]) -> String {
    accepted_with_summaries(statuses, &[])
}

pub fn accepted_with_summaries(statuses: &[&str], summaries: &[&str]) -> String {
    let mut lines = vec!["[*] Running job 42".to_string()];
    lines.extend(statuses.iter().map(|s| status_line(s)));
    lines.extend(summaries.iter().map(|s| summary_line(s)));
    lines.push(status_code_line(ACTION, 202));
    lines.join("\n") + "\n"
}

/// Controller refused the job.
pub fn rejected_stdout(code: u16) -> String {
    format!("{}\n>> {ACTION} request HTTP response text:\nerror\n", status_code_line(ACTION, code))
}

/// Job accepted, but the poller ran out of attempts.
pub fn unverified_stdout() -> String {
    let mut lines: Vec<String> = unverified_status_lines().into_iter().collect();
    lines.push(status_code_line(ACTION, 202));
    lines.join("\n") + "\n"
}

pub fn exited(exit_code: i32, stdout: impl Into<String>) -> OperationResult {
    OperationResult {
        exit_code,
        stdout: stdout.into(),
        stderr: String::new(),
        elapsed: Duration::from_millis(20),
    }
}

pub fn ok(stdout: impl Into<String>) -> OperationResult {
    exited(0, stdout)
}
