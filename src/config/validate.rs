// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile, trim_targets};
use crate::errors::{ProvrunError, Result};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ProvrunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.session, raw.template))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_templates(cfg)?;
    validate_session(cfg)?;
    validate_template_names(cfg)?;
    validate_device_targets(cfg)?;
    Ok(())
}

fn ensure_has_templates(cfg: &RawConfigFile) -> Result<()> {
    if cfg.template.is_empty() {
        return Err(ProvrunError::ConfigError(
            "config must contain at least one [[template]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_session(cfg: &RawConfigFile) -> Result<()> {
    let session = &cfg.session;

    if session.controller.trim().is_empty() {
        return Err(ProvrunError::ConfigError(
            "[session].controller must not be empty".to_string(),
        ));
    }

    if session.username.trim().is_empty() {
        return Err(ProvrunError::ConfigError(
            "[session].username must not be empty".to_string(),
        ));
    }

    if !session.auto_discovery && trim_targets(&session.targets).is_empty() {
        return Err(ProvrunError::ConfigError(
            "[session].targets must list at least one target unless auto_discovery = true"
                .to_string(),
        ));
    }

    let timeout = parse_duration(&session.template_timeout).map_err(|e| {
        ProvrunError::ConfigError(format!("[session].template_timeout: {e}"))
    })?;
    if timeout.is_zero() {
        return Err(ProvrunError::ConfigError(
            "[session].template_timeout must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_template_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for (idx, template) in cfg.template.iter().enumerate() {
        let name = template.name.trim();
        if name.is_empty() {
            return Err(ProvrunError::ConfigError(format!(
                "template #{} has an empty name",
                idx + 1
            )));
        }
        if !seen.insert(name) {
            return Err(ProvrunError::ConfigError(format!(
                "template '{}' is defined more than once",
                name
            )));
        }
    }
    Ok(())
}

fn validate_device_targets(cfg: &RawConfigFile) -> Result<()> {
    // Discovered targets are only known at run time.
    if cfg.session.auto_discovery {
        return Ok(());
    }

    let targets: HashSet<String> = trim_targets(&cfg.session.targets).into_iter().collect();
    for template in cfg.template.iter() {
        for device in template.devices.keys() {
            if !targets.contains(device.trim()) {
                return Err(ProvrunError::ConfigError(format!(
                    "template '{}' has arguments for unknown target '{}'",
                    template.name, device
                )));
            }
        }
    }
    Ok(())
}
