// src/provision/mod.rs

//! Controller operations, run as `provrun provision ...` / `provrun systems ...`.
//!
//! Each resource type the controller exposes is one [`Capability`]. A
//! capability describes its actions, the parameters and arguments each one
//! needs, and executes them against a [`RestClient`]. The orchestrator never
//! calls these directly: it spawns them as separate processes and reads their
//! stdout through the result contract.

pub mod provisioning;
pub mod report;
pub mod systems;

use std::collections::BTreeMap;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;

use tracing::{debug, info};

use crate::controller::RestClient;
use crate::errors::{ProvrunError, Result};
use crate::poller::PollerSettings;

pub use provisioning::ProvisioningCapability;
pub use systems::SystemsCapability;

/// Template name parameter used by the provisioning actions.
pub const TEMPLATE_NAME_PARAM: &str = "template_name";

/// Which optional command-line arguments an action accepts.
///
/// An argument that is not needed must be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeededArgs {
    pub file: bool,
    pub blocking: bool,
}

/// Arguments of one action invocation.
#[derive(Debug, Clone, Default)]
pub struct ActionArgs {
    pub params: BTreeMap<String, String>,
    pub file: Option<PathBuf>,
    pub blocking: bool,
    pub poll: PollerSettings,
}

/// What the action got back from the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub status: u16,
    pub body: String,
    /// Print the body even when the status is a success.
    pub print_body: bool,
}

pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = Result<ActionResponse>> + Send + 'a>>;

/// One controller resource type and the actions it supports.
pub trait Capability: Send + Sync {
    /// Action names, in help order.
    fn actions(&self) -> &'static [&'static str];

    /// Human-readable action description; `None` for unknown actions.
    fn describe(&self, action: &str) -> Option<&'static str>;

    /// Parameters that must be present in [`ActionArgs::params`].
    fn expected_params(&self, action: &str) -> &'static [&'static str];

    fn needed_args(&self, action: &str) -> NeededArgs;

    fn execute<'a>(
        &'a self,
        action: &'a str,
        client: &'a dyn RestClient,
        args: &'a ActionArgs,
        out: &'a mut (dyn Write + Send),
    ) -> ActionFuture<'a>;
}

/// Reject unknown actions, missing or unexpected parameters, and optional
/// arguments the action does not take.
pub fn validate_args(capability: &dyn Capability, action: &str, args: &ActionArgs) -> Result<()> {
    if capability.describe(action).is_none() {
        return Err(invalid(format!(
            "action '{action}' is not supported; expected one of {:?}",
            capability.actions()
        )));
    }

    let expected = capability.expected_params(action);
    if let Some(extra) = args.params.keys().find(|k| !expected.contains(&k.as_str())) {
        return Err(invalid(format!("parameter '{extra}' is not supported")));
    }
    if let Some(missing) = expected.iter().find(|p| !args.params.contains_key(**p)) {
        return Err(invalid(format!("missing parameter '{missing}'")));
    }

    let needed = capability.needed_args(action);
    if needed.file != args.file.is_some() {
        let state = if needed.file { "Missing" } else { "Unsupported" };
        return Err(invalid(format!("{state} argument --file")));
    }
    if args.blocking && !needed.blocking {
        return Err(invalid("Unsupported argument --blocking".to_string()));
    }
    Ok(())
}

fn invalid(msg: String) -> ProvrunError {
    ProvrunError::ConfigError(msg)
}

/// Validate, print the settings header, execute, print the response.
///
/// `Ok` means the controller answered, whatever the HTTP status.
pub async fn run_action(
    capability: &dyn Capability,
    action: &str,
    client: &dyn RestClient,
    args: &ActionArgs,
    connection: &report::ConnectionInfo,
    out: &mut (dyn Write + Send),
) -> Result<ActionResponse> {
    validate_args(capability, action, args)?;
    let description = capability.describe(action).unwrap_or(action);
    debug!(action, ?args, "running controller action");

    report::print_header(out, description, connection)?;
    let response = capability.execute(action, client, args, out).await?;
    report::print_response(out, description, &response)?;

    info!(action, status = response.status, "controller action finished");
    Ok(response)
}
