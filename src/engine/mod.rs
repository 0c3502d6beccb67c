// src/engine/mod.rs

//! Orchestration engine for provrun.
//!
//! This module ties together:
//! - the payload builder and scratch cleanup
//! - the bounded executor (one operation per template)
//! - the result contract parser
//!
//! The pure classification and cursor logic lives in [`core`]; the async/IO
//! shell that actually spawns operations is implemented in [`sequencer`].
//! [`discovery`] resolves the target list from the controller when the
//! session asks for it.

use std::time::Duration;

use crate::payload::CleanupReport;

/// How one template run ended, when it did not abort the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictOutcome {
    Succeeded,
    /// At least one job status was not `Completed`. `reason` is the first such
    /// status, trimmed and lowercased.
    Failed { reason: String },
    /// The operation gave up polling before the job reached a terminal state.
    Inconclusive,
}

/// Per-template verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub template: String,
    pub outcome: VerdictOutcome,
    pub elapsed: Duration,
}

impl Verdict {
    pub fn succeeded(&self) -> bool {
        self.outcome == VerdictOutcome::Succeeded
    }
}

/// Progress notifications published by the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceEvent {
    TemplateStarted {
        index: usize,
        total: usize,
        template: String,
    },
    TemplateFinished {
        verdict: Verdict,
        /// Non-empty job summaries, in the order the operation printed them.
        summaries: Vec<String>,
    },
    /// A fatal classification stopped the sequence.
    Aborted { template: String, reason: String },
    CleanedUp(CleanupReport),
}

/// Outcome of a sequence that ran to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub verdicts: Vec<Verdict>,
    pub total_elapsed: Duration,
    pub cleanup: CleanupReport,
}

impl RunReport {
    /// True when every template succeeded.
    pub fn succeeded(&self) -> bool {
        self.verdicts.iter().all(Verdict::succeeded)
    }
}

pub mod core;
pub mod discovery;
pub mod sequencer;

pub use core::{SequenceState, classify};
pub use discovery::discover_targets;
pub use sequencer::Sequencer;
