// src/lib.rs

pub mod cli;
pub mod config;
pub mod console;
pub mod contract;
pub mod controller;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod payload;
pub mod poller;
pub mod provision;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, ProvisionAction, ProvisionArgs, RunArgs, SystemsArgs};
use crate::config::{ConfigFile, load_and_validate};
use crate::controller::HttpController;
use crate::engine::{RunReport, Sequencer, discover_targets};
use crate::exec::{OperationCommand, RealExecutor};
use crate::fs::RealFileSystem;
use crate::poller::PollerSettings;
use crate::provision::{
    ActionArgs, Capability, ProvisioningCapability, SystemsCapability, TEMPLATE_NAME_PARAM,
    run_action,
};

/// Every template succeeded (or the operation got a controller response).
pub const EXIT_OK: i32 = 0;
/// The run finished, but at least one template failed or was inconclusive.
pub const EXIT_WITH_FAILURES: i32 = 2;

/// High-level entry point used by `main.rs`; returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    match args.command {
        Command::Run(run_args) => run_templates(run_args).await,
        Command::Provision(provision_args) => run_provision(provision_args).await,
        Command::Systems(systems_args) => run_systems(systems_args).await,
    }
}

/// Orchestrator: run every template of the config file in order.
///
/// This wires together:
/// - config loading
/// - target discovery (if enabled)
/// - the sequencer and its executor
/// - Ctrl-C handling
/// - console output
async fn run_templates(args: RunArgs) -> Result<i32> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(EXIT_OK);
    }

    let session = &cfg.session;
    let command = OperationCommand::from_session(session)?;

    // Ctrl-C → kill the running operation, then clean up.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received; cancelling run");
        let _ = cancel_tx.send(true);
    });
    let mut executor = RealExecutor::with_cancel(cancel_rx);

    let targets = if session.auto_discovery {
        discover_targets(&mut executor, &command).await?
    } else {
        session.trimmed_targets()
    };
    info!(
        templates = cfg.template.len(),
        ?targets,
        controller = %session.controller,
        "starting provisioning run"
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let sequencer = Sequencer::new(
        cfg.template.clone(),
        targets.clone(),
        command,
        Arc::new(RealFileSystem),
        session.scratch_dir.clone(),
        executor,
    )
    .with_events(events_tx);
    sequencer.check_budgets(PollerSettings::default().ceiling());

    let (result, printed) = tokio::join!(
        sequencer.run_to_completion(),
        console::present(events_rx, targets, std::io::stdout()),
    );
    if let Err(e) = printed {
        warn!(error = %e, "failed to write progress to stdout");
    }

    let report: RunReport = result?;
    console::render_summary(&report, &mut std::io::stdout())?;

    Ok(if report.succeeded() {
        EXIT_OK
    } else {
        EXIT_WITH_FAILURES
    })
}

async fn run_provision(args: ProvisionArgs) -> Result<i32> {
    let conn = &args.connection;
    let client = HttpController::new(
        &conn.server,
        conn.protocol,
        conn.effective_port(),
        &conn.username,
        &conn.password,
    )?;
    let capability = ProvisioningCapability::new(Arc::new(RealFileSystem));

    let (action, action_args) = match &args.action {
        ProvisionAction::Execute {
            template,
            file,
            blocking,
            poll,
        } => (
            provision::provisioning::EXECUTE,
            ActionArgs {
                params: template_param(template),
                file: Some(file.clone()),
                blocking: *blocking,
                poll: poll.into(),
            },
        ),
        ProvisionAction::List => (provision::provisioning::LIST, ActionArgs::default()),
        ProvisionAction::Details { template } => (
            provision::provisioning::DETAILS,
            ActionArgs {
                params: template_param(template),
                ..Default::default()
            },
        ),
    };

    run_operation(&capability, action, &client, &action_args, &args.connection).await
}

async fn run_systems(args: SystemsArgs) -> Result<i32> {
    let conn = &args.connection;
    let client = HttpController::new(
        &conn.server,
        conn.protocol,
        conn.effective_port(),
        &conn.username,
        &conn.password,
    )?;
    let action = match args.action {
        cli::SystemsAction::List => provision::systems::LIST,
    };

    run_operation(
        &SystemsCapability,
        action,
        &client,
        &ActionArgs::default(),
        &args.connection,
    )
    .await
}

async fn run_operation(
    capability: &dyn Capability,
    action: &str,
    client: &HttpController,
    args: &ActionArgs,
    connection: &cli::ConnectionArgs,
) -> Result<i32> {
    let mut out = std::io::stdout();
    let response = run_action(capability, action, client, args, &connection.info(), &mut out).await?;
    debug!(status = response.status, "operation complete");
    Ok(EXIT_OK)
}

fn template_param(template: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(TEMPLATE_NAME_PARAM.to_string(), template.to_string())])
}

/// Simple dry-run output: print the session and every template.
fn print_dry_run(cfg: &ConfigFile) {
    let session = &cfg.session;
    println!("provrun dry-run");
    println!(
        "  session.controller = {}://{}:{}",
        session.protocol,
        session.controller,
        session.effective_port()
    );
    println!("  session.username = {}", session.username);
    if session.auto_discovery {
        println!("  session.targets = <discovered from controller>");
    } else {
        println!("  session.targets = {:?}", session.trimmed_targets());
    }
    println!("  session.scratch_dir = {}", session.scratch_dir.display());
    println!(
        "  session.template_timeout = {}s",
        session.effective_timeout().as_secs_f64()
    );
    println!();

    println!("templates ({}):", cfg.template.len());
    for template in &cfg.template {
        println!("  - {}", template.name);
        for (key, value) in &template.globals {
            println!("      {key} = {value}");
        }
        for (device, args) in &template.devices {
            println!("      [{device}]");
            for (key, value) in args {
                println!("        {key} = {value}");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
