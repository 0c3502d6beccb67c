// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The operation executable could not be started at all.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The spawned operation exited non-zero or hit the outer deadline.
    #[error(
        "could not reach controller while running template '{template}' (exit code {exit_code}, timed out: {timed_out})"
    )]
    ControllerUnreachable {
        template: String,
        exit_code: i32,
        timed_out: bool,
    },

    #[error(
        "provisioning job for template '{template}' was not created successfully; status code returned: {status_code}"
    )]
    JobCreationFailed {
        template: String,
        status_code: String,
    },

    #[error("run cancelled during '{template}'")]
    Cancelled { template: String },

    #[error("failed to log in to controller on '{server}'")]
    Login { server: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("target discovery failed: {0}")]
    Discovery(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for ProvrunError {
    fn from(err: reqwest::Error) -> Self {
        ProvrunError::Http(err.to_string())
    }
}

impl ProvrunError {
    /// True for the errors that stop a sequence part-way through.
    pub fn is_run_abort(&self) -> bool {
        matches!(
            self,
            ProvrunError::ControllerUnreachable { .. }
                | ProvrunError::JobCreationFailed { .. }
                | ProvrunError::Cancelled { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ProvrunError>;
