// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! `provrun run` is the orchestrator. `provrun provision` and
//! `provrun systems` are the operations it spawns, one process per template
//! (or per discovery attempt); they can also be run by hand.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;
use crate::poller::{DEFAULT_MAX_ATTEMPTS, PollerSettings};
use crate::provision::report::ConnectionInfo;
use crate::types::{Protocol, parse_duration};

/// Command-line arguments for `provrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "provrun",
    version,
    about = "Run provisioning templates against network devices through a management controller.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROVRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run every template of a config file, in order.
    Run(RunArgs),
    /// Provisioning templates on the controller.
    Provision(ProvisionArgs),
    /// Systems known to the controller.
    Systems(SystemsArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Parse + validate, print templates, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// How to reach and log in to the controller.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Controller address.
    #[arg(short, long)]
    pub server: String,

    #[arg(short, long)]
    pub username: String,

    #[arg(short, long)]
    pub password: String,

    #[arg(short = 'r', long, default_value = "http")]
    pub protocol: Protocol,

    /// Defaults to the protocol's well-known port.
    #[arg(long)]
    pub port: Option<u16>,
}

impl ConnectionArgs {
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            server: self.server.clone(),
            protocol: self.protocol.to_string(),
            username: self.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub action: ProvisionAction,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProvisionAction {
    /// Execute a provisioning template.
    Execute {
        #[arg(short, long)]
        template: String,

        /// Payload document (JSON).
        #[arg(short, long, value_name = "PATH")]
        file: PathBuf,

        /// Wait for the created job to finish.
        #[arg(short, long)]
        blocking: bool,

        #[command(flatten)]
        poll: PollArgs,
    },
    /// List all templates.
    List,
    /// Show the arguments a template declares.
    Details {
        #[arg(short, long)]
        template: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct PollArgs {
    /// Pause between job status checks (e.g. "1s", "500ms").
    #[arg(long, value_name = "DURATION", default_value = "1s", value_parser = parse_duration)]
    pub poll_interval: Duration,

    /// Status checks before giving up on the job.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
}

impl From<&PollArgs> for PollerSettings {
    fn from(args: &PollArgs) -> Self {
        PollerSettings {
            interval: args.poll_interval,
            max_attempts: args.max_attempts,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct SystemsArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub action: SystemsAction,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum SystemsAction {
    /// List every system with its attributes.
    List,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_spawned_provisioning_command_line() {
        let args = CliArgs::try_parse_from([
            "provrun", "provision", "--server", "10.0.0.9", "--protocol", "https", "--port",
            "8443", "--username", "admin", "--password", "pw", "execute", "--template", "vlan",
            "--file", "data/abc", "--blocking",
        ])
        .unwrap();

        let Command::Provision(p) = args.command else {
            panic!("expected provision");
        };
        assert_eq!(p.connection.protocol, Protocol::Https);
        assert_eq!(p.connection.effective_port(), 8443);
        match p.action {
            ProvisionAction::Execute {
                template,
                blocking,
                poll,
                ..
            } => {
                assert_eq!(template, "vlan");
                assert!(blocking);
                assert_eq!(poll.poll_interval, Duration::from_secs(1));
                assert_eq!(poll.max_attempts, DEFAULT_MAX_ATTEMPTS);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn run_defaults_to_provrun_toml() {
        let args = CliArgs::try_parse_from(["provrun", "run"]).unwrap();
        let Command::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.config, default_config_path());
        assert_eq!(run.config, PathBuf::from("Provrun.toml"));
        assert!(!run.dry_run);
    }

    #[test]
    fn execute_requires_a_payload_file() {
        let res = CliArgs::try_parse_from([
            "provrun", "provision", "-s", "x", "-u", "u", "-p", "p", "execute", "-t", "vlan",
        ]);
        assert!(res.is_err());
    }
}
