// tests/sequencer_scripted.rs

mod common;
use crate::common::{files_in, init_tracing, sequencer_in};

use std::error::Error;
use std::sync::Arc;

use tokio::sync::mpsc;

use provrun::engine::{SequenceEvent, VerdictOutcome};
use provrun::errors::ProvrunError;
use provrun::exec::TIMEOUT_EXIT_CODE;
use provrun::fs::RealFileSystem;
use provrun::payload::PayloadDocument;
use provrun_test_utils::with_timeout;
use provrun_test_utils::builders::{ConfigFileBuilder, TemplateConfigBuilder};
use provrun_test_utils::fake_executor::ScriptedExecutor;
use provrun_test_utils::fixtures::{
    accepted_stdout, accepted_with_summaries, exited, ok, rejected_stdout, unverified_stdout,
};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn every_template_runs_exactly_once_in_order() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let scratch = tmp.path().join("data");
    let cfg = ConfigFileBuilder::new()
        .with_scratch_dir(&scratch)
        .with_templates(&["vlan", "mtu", "lag"])
        .build();

    let executor = ScriptedExecutor::new();
    let requests = executor.requests();
    let report = sequencer_in(&cfg, executor).run_to_completion().await?;

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    let templates: Vec<_> = requests
        .iter()
        .map(|r| {
            let i = r.args.iter().position(|a| a == "--template").unwrap();
            r.args[i + 1].clone()
        })
        .collect();
    assert_eq!(templates, vec!["vlan", "mtu", "lag"]);
    assert!(requests.iter().all(|r| r.args.contains(&"--blocking".to_string())));

    assert!(report.succeeded());
    assert_eq!(report.verdicts.len(), 3);
    assert_eq!(report.cleanup.removed, 3);
    assert_eq!(files_in(&scratch), 0);
    Ok(())
}

#[tokio::test]
async fn two_completed_statuses_succeed() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .with_scratch_dir(tmp.path())
        .with_templates(&["vlan"])
        .build();
    let executor =
        ScriptedExecutor::new().then(ok(accepted_stdout(&["Completed", "Completed"])));

    let report = sequencer_in(&cfg, executor).run_to_completion().await?;

    assert_eq!(report.verdicts[0].outcome, VerdictOutcome::Succeeded);
    assert!(report.verdicts[0].succeeded());
    Ok(())
}

#[tokio::test]
async fn failed_status_is_recorded_and_the_sequence_continues() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .with_scratch_dir(tmp.path())
        .with_templates(&["vlan", "mtu"])
        .build();
    let executor = ScriptedExecutor::new()
        .then(ok(accepted_stdout(&["Completed", " Failed "])))
        .then(ok(accepted_stdout(&["Completed"])));
    let requests = executor.requests();

    let report = sequencer_in(&cfg, executor).run_to_completion().await?;

    assert_eq!(requests.lock().unwrap().len(), 2);
    assert_eq!(
        report.verdicts[0].outcome,
        VerdictOutcome::Failed {
            reason: "failed".to_string()
        }
    );
    assert!(report.verdicts[1].succeeded());
    assert!(!report.succeeded());
    Ok(())
}

#[tokio::test]
async fn rejected_job_aborts_after_that_template_and_cleans_up() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let scratch = tmp.path().join("data");
    let cfg = ConfigFileBuilder::new()
        .with_scratch_dir(&scratch)
        .with_templates(&["a", "b", "c", "d"])
        .build();
    // Fatal at index 1: exactly two invocations.
    let executor = ScriptedExecutor::new()
        .then(ok(accepted_stdout(&["Completed"])))
        .then(ok(rejected_stdout(500)));
    let requests = executor.requests();

    let err = sequencer_in(&cfg, executor)
        .run_to_completion()
        .await
        .unwrap_err();

    match err {
        ProvrunError::JobCreationFailed {
            template,
            status_code,
        } => {
            assert_eq!(template, "b");
            assert_eq!(status_code, "500");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(requests.lock().unwrap().len(), 2);
    assert_eq!(files_in(&scratch), 0);
    Ok(())
}

#[tokio::test]
async fn timed_out_operation_means_controller_unreachable() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .with_scratch_dir(tmp.path())
        .with_templates(&["a", "b"])
        .build();
    let executor = ScriptedExecutor::new().then(exited(TIMEOUT_EXIT_CODE, ""));
    let requests = executor.requests();

    let err = sequencer_in(&cfg, executor)
        .run_to_completion()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProvrunError::ControllerUnreachable {
            timed_out: true,
            ..
        }
    ));
    assert!(err.is_run_abort());
    assert_eq!(requests.lock().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn spawn_failure_aborts_and_cleans_up() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let scratch = tmp.path().join("data");
    let cfg = ConfigFileBuilder::new()
        .with_scratch_dir(&scratch)
        .with_templates(&["a", "b"])
        .build();
    let executor = ScriptedExecutor::new().then_spawn_failure();

    let err = sequencer_in(&cfg, executor)
        .run_to_completion()
        .await
        .unwrap_err();

    assert!(matches!(err, ProvrunError::Spawn { .. }));
    assert_eq!(files_in(&scratch), 0);
    Ok(())
}

#[tokio::test]
async fn unverified_job_is_inconclusive_not_success() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .with_scratch_dir(tmp.path())
        .with_templates(&["slow", "fast"])
        .build();
    let executor = ScriptedExecutor::new().then(ok(unverified_stdout()));

    let report = sequencer_in(&cfg, executor).run_to_completion().await?;

    assert_eq!(report.verdicts[0].outcome, VerdictOutcome::Inconclusive);
    assert!(report.verdicts[1].succeeded());
    assert!(!report.succeeded());
    Ok(())
}

#[tokio::test]
async fn payload_matches_template_and_trimmed_targets() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .with_scratch_dir(tmp.path())
        .with_targets(&[" 10.0.0.1", "10.0.0.2 "])
        .with_template(
            TemplateConfigBuilder::new("vlan")
                .global("vlan_number", "5")
                .device("10.0.0.1", "port_name", "1/5")
                .build(),
        )
        .build();
    let executor = ScriptedExecutor::new().capturing_payloads(Arc::new(RealFileSystem));
    let payloads = executor.payloads();

    sequencer_in(&cfg, executor).run_to_completion().await?;

    let payloads = payloads.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    let doc = PayloadDocument::from_json(&payloads[0])?;
    assert_eq!(doc.object_ids, vec!["10.0.0.1", "10.0.0.2"]);
    assert_eq!(doc.object_type, "System");
    assert_eq!(doc.params.arguments.globals, cfg.template[0].globals);
    assert_eq!(doc.params.arguments.devices, cfg.template[0].devices);
    Ok(())
}

#[tokio::test]
async fn events_describe_the_run_in_order() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .with_scratch_dir(tmp.path())
        .with_templates(&["vlan", "mtu"])
        .build();
    let executor = ScriptedExecutor::new()
        .then(ok(accepted_with_summaries(&["Completed"], &["", "10.0.0.1:\nok"])))
        .then(ok(rejected_stdout(404)));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let run = sequencer_in(&cfg, executor).with_events(tx).run_to_completion();
    let _ = with_timeout(run).await;

    let mut events = Vec::new();
    while let Some(e) = rx.recv().await {
        events.push(e);
    }

    assert_eq!(events.len(), 5);
    assert!(matches!(&events[0], SequenceEvent::TemplateStarted { index: 0, total: 2, template } if template == "vlan"));
    match &events[1] {
        SequenceEvent::TemplateFinished { verdict, summaries } => {
            assert!(verdict.succeeded());
            assert_eq!(summaries, &vec!["10.0.0.1:\nok".to_string()]);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(matches!(&events[2], SequenceEvent::TemplateStarted { index: 1, .. }));
    assert!(matches!(&events[3], SequenceEvent::Aborted { template, .. } if template == "mtu"));
    assert!(matches!(&events[4], SequenceEvent::CleanedUp(r) if r.removed == 2));
    Ok(())
}

#[tokio::test]
async fn dropped_sequencer_still_cleans_the_scratch_dir() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let scratch = tmp.path().join("data");
    let cfg = ConfigFileBuilder::new()
        .with_scratch_dir(&scratch)
        .with_templates(&["a", "b"])
        .build();

    let mut seq = sequencer_in(&cfg, ScriptedExecutor::new());
    seq.advance_and_run().await?;
    assert_eq!(files_in(&scratch), 1);

    drop(seq);
    assert_eq!(files_in(&scratch), 0);
    Ok(())
}
