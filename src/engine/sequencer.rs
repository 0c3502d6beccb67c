// src/engine/sequencer.rs

//! Async runtime shell of the template sequencer.
//!
//! Drives the pure core in `engine::core` against a real (or scripted)
//! executor and the filesystem, one template at a time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::TemplateConfig;
use crate::contract;
use crate::errors::{ProvrunError, Result};
use crate::exec::{OperationCommand, OperationExecutor};
use crate::fs::FileSystem;
use crate::payload::{PayloadBuilder, ScratchDir, ScratchGuard};

use super::core::{SequenceState, classify};
use super::{RunReport, SequenceEvent, Verdict};

/// Runs an ordered list of templates, one operation each, strictly in order.
///
/// This is the IO shell around [`SequenceState`] and [`classify`]: it writes
/// payloads, hands the operation to an `OperationExecutor`, and publishes
/// progress as [`SequenceEvent`]s. The scratch directory is cleaned exactly
/// once, whichever way the sequence ends.
pub struct Sequencer<E: OperationExecutor> {
    templates: Vec<TemplateConfig>,
    targets: Vec<String>,
    command: OperationCommand,
    payloads: PayloadBuilder,
    scratch: ScratchGuard,
    executor: E,
    state: SequenceState,
    events: Option<mpsc::UnboundedSender<SequenceEvent>>,
}

impl<E: OperationExecutor> fmt::Debug for Sequencer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("templates", &self.templates.len())
            .field("targets", &self.targets)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<E: OperationExecutor> Sequencer<E> {
    pub fn new(
        templates: Vec<TemplateConfig>,
        targets: Vec<String>,
        command: OperationCommand,
        fs: Arc<dyn FileSystem>,
        scratch_dir: impl Into<std::path::PathBuf>,
        executor: E,
    ) -> Self {
        let scratch_dir = scratch_dir.into();
        let state = SequenceState::new(templates.len());
        Self {
            templates,
            targets,
            command,
            payloads: PayloadBuilder::new(fs.clone(), scratch_dir.clone()),
            scratch: ScratchDir::new(fs, scratch_dir).guard(),
            executor,
            state,
            events: None,
        }
    }

    /// Publish progress on `tx`. Send failures (receiver gone) are ignored.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<SequenceEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Warn when the outer deadline can cut the operation's own polling short.
    pub fn check_budgets(&self, poll_ceiling: Duration) {
        let outer = self.command.timeout();
        if outer < poll_ceiling {
            warn!(
                template_timeout_secs = outer.as_secs_f64(),
                poll_ceiling_secs = poll_ceiling.as_secs_f64(),
                "template timeout is shorter than the job poller's budget; \
                 slow jobs will be reported as unreachable instead of inconclusive"
            );
        }
    }

    pub fn state(&self) -> &SequenceState {
        &self.state
    }

    pub fn has_next(&self) -> bool {
        self.state.has_next()
    }

    /// Run the next template.
    ///
    /// Returns `Ok(None)` when nothing is left. A fatal classification (or a
    /// failure to write the payload or start the operation) stops the
    /// sequence, cleans the scratch directory and is returned as `Err`.
    pub async fn advance_and_run(&mut self) -> Result<Option<Verdict>> {
        let Some(index) = self.state.advance() else {
            return Ok(None);
        };
        let template = self.templates[index].clone();
        let name = template.name.clone();

        info!(template = %name, index, total = self.templates.len(), "running template");
        self.emit(SequenceEvent::TemplateStarted {
            index,
            total: self.templates.len(),
            template: name.clone(),
        });

        match self.run_one(&template).await {
            Ok((verdict, summaries)) => {
                info!(
                    template = %name,
                    outcome = ?verdict.outcome,
                    elapsed_secs = verdict.elapsed.as_secs_f64(),
                    "template finished"
                );
                self.state.record(verdict.clone());
                self.emit(SequenceEvent::TemplateFinished {
                    verdict: verdict.clone(),
                    summaries,
                });
                Ok(Some(verdict))
            }
            Err((err, elapsed)) => {
                error!(template = %name, error = %err, "aborting sequence");
                self.state.abort(elapsed);
                self.emit(SequenceEvent::Aborted {
                    template: name,
                    reason: err.to_string(),
                });
                self.cleanup();
                Err(err)
            }
        }
    }

    /// Run every remaining template, then clean up.
    pub async fn run_to_completion(mut self) -> Result<RunReport> {
        while self.has_next() {
            self.advance_and_run().await?;
        }

        let cleanup = self.cleanup().unwrap_or_default();
        let (verdicts, total_elapsed) = std::mem::take(&mut self.state).into_parts();
        Ok(RunReport {
            verdicts,
            total_elapsed,
            cleanup,
        })
    }

    async fn run_one(
        &mut self,
        template: &TemplateConfig,
    ) -> std::result::Result<(Verdict, Vec<String>), (ProvrunError, Duration)> {
        let payload = self
            .payloads
            .build(template, &self.targets)
            .map_err(|e| (e, Duration::ZERO))?;

        let request = self.command.provision(&template.name, &payload);
        let result = self
            .executor
            .execute(request)
            .await
            .map_err(|e| (e, Duration::ZERO))?;

        debug!(
            template = %template.name,
            exit_code = result.exit_code,
            stdout_bytes = result.stdout.len(),
            stderr = %result.stderr.trim_end(),
            "operation result"
        );

        let report = contract::parse(&result.stdout);
        let outcome =
            classify(&template.name, &result, &report).map_err(|e| (e, result.elapsed))?;

        let summaries = report.non_empty_summaries().map(str::to_string).collect();
        let verdict = Verdict {
            template: template.name.clone(),
            outcome,
            elapsed: result.elapsed,
        };
        Ok((verdict, summaries))
    }

    fn cleanup(&mut self) -> Option<crate::payload::CleanupReport> {
        let report = self.scratch.finish()?;
        self.emit(SequenceEvent::CleanedUp(report));
        Some(report)
    }

    fn emit(&self, event: SequenceEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;

    use super::*;
    use crate::config::load_from_str;
    use crate::exec::{ExecRequest, OperationResult};
    use crate::fs::mock::MockFileSystem;

    /// Returns the same stdout for every request and counts invocations.
    struct Canned {
        stdout: String,
        calls: usize,
    }

    impl OperationExecutor for Canned {
        fn execute(
            &mut self,
            _request: ExecRequest,
        ) -> Pin<Box<dyn Future<Output = Result<OperationResult>> + Send + '_>> {
            self.calls += 1;
            let stdout = self.stdout.clone();
            Box::pin(async move {
                Ok(OperationResult {
                    exit_code: 0,
                    stdout,
                    stderr: String::new(),
                    elapsed: Duration::from_millis(5),
                })
            })
        }
    }

    fn sequencer(stdout: &str, fs: Arc<MockFileSystem>) -> Sequencer<Canned> {
        let config = load_from_str(
            r#"
[session]
controller = "10.0.0.9"
username = "admin"
targets = ["10.0.0.1"]

[[template]]
name = "a"

[[template]]
name = "b"
"#,
        )
        .unwrap();
        let command = OperationCommand::with_program("provrun", &config.session);
        Sequencer::new(
            config.template,
            config.session.trimmed_targets(),
            command,
            fs,
            "data",
            Canned {
                stdout: stdout.to_string(),
                calls: 0,
            },
        )
    }

    #[tokio::test]
    async fn advance_returns_none_when_exhausted() {
        let fs = Arc::new(MockFileSystem::new());
        let mut seq = sequencer("HTTP response status code: 202", fs.clone());

        assert!(seq.advance_and_run().await.unwrap().is_some());
        assert!(seq.advance_and_run().await.unwrap().is_some());
        assert!(seq.advance_and_run().await.unwrap().is_none());
        assert_eq!(seq.executor.calls, 2);
        assert_eq!(fs.file_count(), 2);
    }

    #[tokio::test]
    async fn fatal_result_stops_and_cleans() {
        let fs = Arc::new(MockFileSystem::new());
        let mut seq = sequencer("HTTP response status code: 404", fs.clone());

        let err = seq.advance_and_run().await.unwrap_err();
        assert!(matches!(err, ProvrunError::JobCreationFailed { .. }));
        assert!(!seq.has_next());
        assert_eq!(fs.file_count(), 0);
    }
}
