// src/config/mod.rs

//! Configuration loading and validation for provrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate session settings and templates (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{
    ConfigFile, DEFAULT_TEMPLATE_TIMEOUT, RawConfigFile, SessionConfig, TemplateConfig,
    trim_targets,
};
