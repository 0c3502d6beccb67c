// src/poller/mod.rs

//! Remote job poller.
//!
//! Runs inside the provisioning operation: after the controller accepted a
//! provisioning request, the job it created is polled until it reaches a
//! terminal status or the attempt budget runs out. The outcome is written to
//! stdout as contract markers for the orchestrator to read back.

use std::io::{self, Write};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::contract::markers::{status_line, summary_line, unverified_status_lines};
use crate::controller::{RestClient, job_path, sub_jobs_path};
use crate::errors::{ProvrunError, Result};
use crate::types::JobStatus;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 300;

static JOB_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/app/jobs/(\d+)").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollerSettings {
    /// Longest time the poller can spend waiting, ignoring request latency.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    /// The job reached a terminal status.
    Terminal,
    /// Attempts ran out first.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub job_id: u64,
    pub final_status: JobStatus,
    pub attempts: u32,
    pub job_body: String,
    pub sub_jobs_body: String,
    pub kind: PollKind,
}

/// Find the id of the job the controller created, in a submission response.
pub fn extract_job_id(body: &str) -> Option<u64> {
    JOB_ID_RE
        .captures(body)
        .and_then(|caps| caps[1].parse().ok())
}

#[derive(Debug)]
pub struct JobPoller<'a, C: RestClient + ?Sized> {
    client: &'a C,
    settings: PollerSettings,
}

impl<'a, C: RestClient + ?Sized> JobPoller<'a, C> {
    pub fn new(client: &'a C, settings: PollerSettings) -> Self {
        Self { client, settings }
    }

    /// Poll `job_id` until it is terminal or the budget is spent, then fetch
    /// the job and its sub-jobs once more.
    pub async fn wait_for_terminal(&self, job_id: u64) -> Result<PollOutcome> {
        let path = job_path(job_id);
        let mut status = JobStatus::Other("Running".to_string());
        let mut attempts = 0;

        while attempts < self.settings.max_attempts {
            attempts += 1;
            let resp = self.client.get(&path).await?;
            status = read_status(&resp.body)?;
            debug!(job_id, attempt = attempts, status = %status, "polled job");

            if status.is_terminal() {
                break;
            }
            tokio::time::sleep(self.settings.interval).await;
        }

        let kind = if status.is_terminal() {
            PollKind::Terminal
        } else {
            warn!(job_id, attempts, status = %status, "job did not finish in time");
            PollKind::Exhausted
        };

        let job_body = self.client.get(&path).await?.body;
        let sub_jobs_body = self.client.get(&sub_jobs_path(job_id)).await?.body;
        info!(job_id, attempts, status = %status, ?kind, "job polling finished");

        Ok(PollOutcome {
            job_id,
            final_status: status,
            attempts,
            job_body,
            sub_jobs_body,
            kind,
        })
    }
}

fn read_status(body: &str) -> Result<JobStatus> {
    let value: Value = serde_json::from_str(body)?;
    value
        .get("Status")
        .and_then(Value::as_str)
        .map(JobStatus::from)
        .ok_or_else(|| ProvrunError::Http(format!("job response has no Status field: {body}")))
}

/// Write the poll outcome as contract markers.
///
/// On a terminal outcome: one status line per job (the job itself first, then
/// every sub-job) followed by one summary line per job that has a summary.
/// On exhaustion only the unverified-status lines are written.
pub fn emit_outcome(outcome: &PollOutcome, out: &mut dyn Write) -> io::Result<()> {
    debug!(job_id = outcome.job_id, body = %outcome.job_body, "final job response");
    debug!(job_id = outcome.job_id, body = %outcome.sub_jobs_body, "sub-jobs response");

    if outcome.kind == PollKind::Exhausted {
        for line in unverified_status_lines() {
            writeln!(out, "{line}")?;
        }
        return Ok(());
    }

    if outcome.final_status == JobStatus::Completed {
        writeln!(out, "[*] Job completed successfully")?;
    } else {
        writeln!(out, "[*] Job failed. Current status: {}", outcome.final_status)?;
    }

    let mut jobs = Vec::new();
    match serde_json::from_str::<Value>(&outcome.job_body) {
        Ok(job) => jobs.push(job),
        Err(e) => warn!(job_id = outcome.job_id, error = %e, "final job response is not JSON"),
    }
    match serde_json::from_str::<Value>(&outcome.sub_jobs_body) {
        Ok(subs) => jobs.extend(sub_job_entries(subs)),
        Err(e) => warn!(job_id = outcome.job_id, error = %e, "sub-jobs response is not JSON"),
    }

    // The polled status stands in when the final body could not be read.
    if jobs.is_empty() {
        writeln!(out, "{}", status_line(outcome.final_status.as_str()))?;
        return Ok(());
    }

    for job in &jobs {
        if let Some(status) = job.get("Status").and_then(Value::as_str) {
            writeln!(out, "{}", status_line(status))?;
        }
    }
    for job in &jobs {
        if let Some(summary) = job.get("Summary").and_then(Value::as_str) {
            writeln!(out, "{}", summary_line(summary))?;
        }
    }
    Ok(())
}

/// Sub-jobs come back either as a bare array or wrapped in an object.
fn sub_job_entries(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
