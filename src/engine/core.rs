// src/engine/core.rs

//! Pure core of the template sequencer.
//!
//! This module contains the synchronous, deterministic pieces:
//! - [`SequenceState`], the explicit cursor over the ordered template list
//! - [`classify`], which turns one operation's exit code and parsed stdout
//!   into either a verdict or a fatal error
//!
//! The async shell (`engine::sequencer::Sequencer`) is responsible for
//! building payloads, spawning operations and cleaning up. The core is
//! unit tested without any Tokio, processes or filesystem.

use std::time::Duration;

use crate::contract::ContractReport;
use crate::errors::{ProvrunError, Result};
use crate::exec::OperationResult;

use super::{Verdict, VerdictOutcome};

/// Sequencer state.
///
/// `cursor` is `None` before the first template ran, then the index of the
/// last template started. Owned by exactly one sequencer; never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceState {
    cursor: Option<usize>,
    len: usize,
    verdicts: Vec<Verdict>,
    total_elapsed: Duration,
    done: bool,
}

impl SequenceState {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            ..Self::default()
        }
    }

    /// True while at least one template is left and nothing aborted the run.
    pub fn has_next(&self) -> bool {
        if self.done {
            return false;
        }
        match self.cursor {
            None => self.len > 0,
            Some(i) => i + 1 < self.len,
        }
    }

    /// Move the cursor to the next template and return its index.
    pub fn advance(&mut self) -> Option<usize> {
        if !self.has_next() {
            return None;
        }
        let next = self.cursor.map_or(0, |i| i + 1);
        self.cursor = Some(next);
        Some(next)
    }

    pub fn record(&mut self, verdict: Verdict) {
        self.total_elapsed += verdict.elapsed;
        self.verdicts.push(verdict);
    }

    /// Stop the sequence; `has_next` is false from now on.
    pub fn abort(&mut self, elapsed: Duration) {
        self.total_elapsed += elapsed;
        self.done = true;
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    pub fn total_elapsed(&self) -> Duration {
        self.total_elapsed
    }

    pub fn into_parts(self) -> (Vec<Verdict>, Duration) {
        (self.verdicts, self.total_elapsed)
    }
}

/// Classify one finished operation.
///
/// Order matters: connectivity first, then job creation, then the polled
/// statuses. `Err` means the whole sequence must stop.
pub fn classify(
    template: &str,
    result: &OperationResult,
    report: &ContractReport,
) -> Result<VerdictOutcome> {
    if result.cancelled() {
        return Err(ProvrunError::Cancelled {
            template: template.to_string(),
        });
    }

    if !result.success() {
        return Err(ProvrunError::ControllerUnreachable {
            template: template.to_string(),
            exit_code: result.exit_code,
            timed_out: result.timed_out(),
        });
    }

    if !report.job_accepted() {
        return Err(ProvrunError::JobCreationFailed {
            template: template.to_string(),
            status_code: report
                .status_code
                .clone()
                .unwrap_or_else(|| "none".to_string()),
        });
    }

    if report.inconclusive {
        return Ok(VerdictOutcome::Inconclusive);
    }

    if let Some(first) = report.not_completed().next() {
        return Ok(VerdictOutcome::Failed {
            reason: first.to_lowercase(),
        });
    }

    Ok(VerdictOutcome::Succeeded)
}
