// tests/bounded_exec.rs

#![cfg(unix)]

use std::time::{Duration, Instant};

use provrun::errors::ProvrunError;
use provrun::exec::{ExecRequest, TIMEOUT_EXIT_CODE, execute, timeout_message};

fn sh(script: &str, timeout: Duration) -> ExecRequest {
    ExecRequest::new("sh", vec!["-c".to_string(), script.to_string()], timeout)
}

#[tokio::test]
async fn never_ending_command_is_killed_at_the_deadline() {
    let timeout = Duration::from_secs(2);
    let start = Instant::now();

    let result = execute(&sh("echo started; sleep 60", timeout)).await.unwrap();
    let took = start.elapsed();

    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert!(result.timed_out());
    assert_eq!(result.stderr, timeout_message(timeout));
    assert_eq!(result.stderr, "Operation timed out! Took more than 2 seconds.\n");
    assert_eq!(result.elapsed, timeout);
    assert!(took >= timeout, "returned early: {took:?}");
    assert!(took < Duration::from_secs(5), "returned late: {took:?}");
}

#[tokio::test]
async fn background_grandchildren_do_not_hold_the_run_open() {
    let timeout = Duration::from_secs(1);
    let start = Instant::now();

    let result = execute(&sh("sleep 60 & sleep 60", timeout)).await.unwrap();

    assert!(result.timed_out());
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn exited_child_keeps_its_output_and_takes_its_group_down() {
    let timeout = Duration::from_secs(3);
    let start = Instant::now();

    // `$$` is the shell's pid, which is also the process group id.
    let script = "echo $$; echo 'HTTP response status code: 202'; sleep 30 &";
    let result = execute(&sh(script, timeout)).await.unwrap();
    let took = start.elapsed();

    assert!(result.success());
    assert!(took < timeout, "held past the deadline: {took:?}");
    let mut lines = result.stdout.lines();
    let pgid = lines.next().expect("pid line").trim().to_string();
    assert_eq!(lines.next(), Some("HTTP response status code: 202"));

    let pgid: i32 = pgid.parse().unwrap();
    for _ in 0..20 {
        if live_members(pgid) == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("process group {pgid} still has live members");
}

#[tokio::test]
async fn fast_command_reports_real_elapsed_time() {
    let result = execute(&sh("printf ok", Duration::from_secs(10))).await.unwrap();

    assert!(result.success());
    assert_eq!(result.stdout, "ok");
    assert!(result.elapsed < Duration::from_secs(10));
}

#[tokio::test]
async fn missing_executable_is_a_spawn_error() {
    let request = ExecRequest::new(
        "/definitely/not/a/real/provrun",
        Vec::new(),
        Duration::from_secs(1),
    );

    let err = execute(&request).await.unwrap_err();
    match err {
        ProvrunError::Spawn { program, .. } => {
            assert_eq!(program, "/definitely/not/a/real/provrun");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Non-zombie processes in group `pgid`, read from /proc.
fn live_members(pgid: i32) -> usize {
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .filter_map(|e| std::fs::read_to_string(e.path().join("stat")).ok())
        .filter(|stat| {
            // Fields after the parenthesised command: state ppid pgrp ...
            let Some((_, rest)) = stat.rsplit_once(") ") else {
                return false;
            };
            let mut fields = rest.split_whitespace();
            let state = fields.next();
            let group = fields.nth(1).and_then(|g| g.parse::<i32>().ok());
            group == Some(pgid) && state != Some("Z")
        })
        .count()
}
