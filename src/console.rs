// src/console.rs

//! Human-readable progress output for `provrun run`.
//!
//! Everything here is driven by [`SequenceEvent`]s and the final
//! [`RunReport`]; the sequencer itself never prints.

use std::io::{self, Write};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::engine::{RunReport, SequenceEvent, Verdict, VerdictOutcome};

/// Print events as they arrive until the sequencer drops its sender.
pub async fn present(
    mut rx: mpsc::UnboundedReceiver<SequenceEvent>,
    targets: Vec<String>,
    mut out: impl Write,
) -> io::Result<()> {
    while let Some(event) = rx.recv().await {
        render_event(&event, &targets, &mut out)?;
        out.flush()?;
    }
    Ok(())
}

pub fn render_event(event: &SequenceEvent, targets: &[String], out: &mut dyn Write) -> io::Result<()> {
    match event {
        SequenceEvent::TemplateStarted { template, .. } => {
            writeln!(out, "---> Running template '{template}'")
        }
        SequenceEvent::TemplateFinished { verdict, summaries } => {
            // Summaries are printed in target order; extra ones are dropped.
            for (ip, summary) in targets.iter().zip(summaries) {
                writeln!(out, "->Summary output for {ip}:\n{summary}")?;
            }
            render_verdict(verdict, out)
        }
        SequenceEvent::Aborted { reason, .. } => writeln!(out, "ERROR: {reason}\n"),
        SequenceEvent::CleanedUp(report) if report.failed > 0 => writeln!(
            out,
            "WARNING: {} payload file(s) could not be removed",
            report.failed
        ),
        SequenceEvent::CleanedUp(_) => Ok(()),
    }
}

fn render_verdict(verdict: &Verdict, out: &mut dyn Write) -> io::Result<()> {
    match &verdict.outcome {
        VerdictOutcome::Succeeded => writeln!(
            out,
            "-> Completed successfully. Total executing time {}\n",
            secs(verdict.elapsed)
        ),
        VerdictOutcome::Failed { reason } => writeln!(out, "ERROR: provisioning job {reason}\n"),
        VerdictOutcome::Inconclusive => writeln!(
            out,
            "WARNING: could not verify the provisioning job status in time; \
             please validate it on the controller\n"
        ),
    }
}

/// Status table plus the closing line.
pub fn render_summary(report: &RunReport, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "*** Status Summary ***\n")?;
    writeln!(out, "{:<15} {}", "Template", "Status")?;
    writeln!(out, "{:<15} {:<10}", "-".repeat(15), "-".repeat(10))?;
    for verdict in &report.verdicts {
        let status = match verdict.outcome {
            VerdictOutcome::Succeeded => "Completed",
            VerdictOutcome::Failed { .. } => "Failed",
            VerdictOutcome::Inconclusive => "Inconclusive",
        };
        writeln!(out, "{:<15} {}", verdict.template, status)?;
    }

    writeln!(
        out,
        "\n>>> Configuration completed {} errors. Total time: {}",
        if report.succeeded() { "without" } else { "with" },
        secs(report.total_elapsed)
    )
}

fn secs(d: Duration) -> String {
    format!("{:.4}", d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::CleanupReport;

    fn verdict(template: &str, outcome: VerdictOutcome) -> Verdict {
        Verdict {
            template: template.to_string(),
            outcome,
            elapsed: Duration::from_millis(1500),
        }
    }

    fn rendered(event: SequenceEvent) -> String {
        let mut out = Vec::new();
        let targets = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];
        render_event(&event, &targets, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn finished_template_pairs_summaries_with_targets() {
        let text = rendered(SequenceEvent::TemplateFinished {
            verdict: verdict("vlan", VerdictOutcome::Succeeded),
            summaries: vec!["vlan 5 created".to_string()],
        });
        assert!(text.starts_with("->Summary output for 10.0.0.1:\nvlan 5 created\n"));
        assert!(!text.contains("10.0.0.2"));
        assert!(text.contains("Total executing time 1.5000"));
    }

    #[test]
    fn failed_template_prints_the_reason() {
        let text = rendered(SequenceEvent::TemplateFinished {
            verdict: verdict(
                "vlan",
                VerdictOutcome::Failed {
                    reason: "aborted".to_string(),
                },
            ),
            summaries: Vec::new(),
        });
        assert_eq!(text, "ERROR: provisioning job aborted\n\n");
    }

    #[test]
    fn clean_cleanup_is_silent() {
        assert!(rendered(SequenceEvent::CleanedUp(CleanupReport::default())).is_empty());
    }

    #[test]
    fn summary_table_marks_the_run_with_errors() {
        let report = RunReport {
            verdicts: vec![
                verdict("vlan", VerdictOutcome::Succeeded),
                verdict("mtu", VerdictOutcome::Inconclusive),
            ],
            total_elapsed: Duration::from_secs(3),
            cleanup: CleanupReport::default(),
        };
        let mut out = Vec::new();
        render_summary(&report, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("vlan            Completed"));
        assert!(text.contains("mtu             Inconclusive"));
        assert!(text.ends_with(">>> Configuration completed with errors. Total time: 3.0000\n"));
    }
}
