#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use provrun::config::{ConfigFile, RawConfigFile, SessionConfig, TemplateConfig};
use provrun::types::Protocol;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                session: SessionConfig {
                    controller: "10.0.0.9".to_string(),
                    username: "admin".to_string(),
                    password: "admin".to_string(),
                    protocol: Protocol::Http,
                    port: None,
                    targets: vec!["10.0.0.1".to_string()],
                    auto_discovery: false,
                    scratch_dir: PathBuf::from("data"),
                    template_timeout: "120s".to_string(),
                    operation_program: None,
                },
                template: Vec::new(),
            },
        }
    }

    pub fn with_targets(mut self, targets: &[&str]) -> Self {
        self.config.session.targets = targets.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.session.scratch_dir = dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: &str) -> Self {
        self.config.session.template_timeout = timeout.to_string();
        self
    }

    pub fn with_auto_discovery(mut self) -> Self {
        self.config.session.auto_discovery = true;
        self
    }

    pub fn with_template(mut self, template: TemplateConfig) -> Self {
        self.config.template.push(template);
        self
    }

    /// Add one bare template per name.
    pub fn with_templates(mut self, names: &[&str]) -> Self {
        for name in names {
            self.config.template.push(TemplateConfigBuilder::new(name).build());
        }
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TemplateConfig`.
pub struct TemplateConfigBuilder {
    template: TemplateConfig,
}

impl TemplateConfigBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            template: TemplateConfig {
                name: name.to_string(),
                globals: BTreeMap::new(),
                devices: BTreeMap::new(),
            },
        }
    }

    pub fn global(mut self, key: &str, value: &str) -> Self {
        self.template
            .globals
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn device(mut self, target: &str, key: &str, value: &str) -> Self {
        self.template
            .devices
            .entry(target.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> TemplateConfig {
        self.template
    }
}
