// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{Protocol, parse_duration};

/// Default outer budget for a single template operation.
pub const DEFAULT_TEMPLATE_TIMEOUT: Duration = Duration::from_secs(120);

/// Top-level configuration exactly as read from a TOML file.
///
/// ```toml
/// [session]
/// controller = "10.209.24.10"
/// username = "admin"
/// password = "123456"
/// targets = ["10.209.24.39"]
///
/// [[template]]
/// name = "vlan"
/// [template.globals]
/// vlan_number = "5"
/// [template.devices."10.209.24.39"]
/// port_name = "1/5"
/// ```
///
/// Templates are an array of tables so that their order in the file is the
/// order in which they run.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub session: SessionConfig,

    #[serde(default)]
    pub template: Vec<TemplateConfig>,
}

/// A config file that passed validation.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub session: SessionConfig,
    pub template: Vec<TemplateConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(session: SessionConfig, template: Vec<TemplateConfig>) -> Self {
        Self { session, template }
    }

    pub fn template_names(&self) -> Vec<&str> {
        self.template.iter().map(|t| t.name.as_str()).collect()
    }
}

/// `[session]` section: everything shared by all templates of a run.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Management controller address (host or IP).
    pub controller: String,

    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub protocol: Protocol,

    /// Optional port; defaults to the protocol's well-known port.
    #[serde(default)]
    pub port: Option<u16>,

    /// Target devices shared by every template.
    #[serde(default)]
    pub targets: Vec<String>,

    /// Ask the controller for its systems instead of using `targets`.
    #[serde(default)]
    pub auto_discovery: bool,

    /// Directory that holds generated payload files for the run.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Duration string (e.g. `"120s"`) bounding each template operation.
    #[serde(default = "default_template_timeout")]
    pub template_timeout: String,

    /// Executable spawned for each operation; defaults to the running binary.
    #[serde(default)]
    pub operation_program: Option<PathBuf>,
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_template_timeout() -> String {
    "120s".to_string()
}

impl SessionConfig {
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    /// Parsed `template_timeout`, falling back to the default when the
    /// string does not parse (validation rejects that case up front).
    pub fn effective_timeout(&self) -> Duration {
        parse_duration(&self.template_timeout).unwrap_or(DEFAULT_TEMPLATE_TIMEOUT)
    }

    /// Targets with surrounding whitespace removed and blanks dropped.
    pub fn trimmed_targets(&self) -> Vec<String> {
        trim_targets(&self.targets)
    }
}

pub fn trim_targets(targets: &[String]) -> Vec<String> {
    targets
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// One `[[template]]` entry.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TemplateConfig {
    /// Template name as known by the controller.
    pub name: String,

    /// Arguments shared by all targets.
    #[serde(default)]
    pub globals: BTreeMap<String, String>,

    /// Per-target arguments, keyed by target id.
    #[serde(default)]
    pub devices: BTreeMap<String, BTreeMap<String, String>>,
}
