// src/payload/mod.rs

//! Payload documents for provisioning requests.
//!
//! - [`PayloadBuilder`] turns one template plus the run's target list into a
//!   JSON request document and writes it to a uniquely named file inside the
//!   scratch directory.
//! - [`scratch`] owns that directory's lifecycle: every file in it belongs to
//!   the current run and is removed when the run ends.

pub mod scratch;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::{TemplateConfig, trim_targets};
use crate::errors::Result;
use crate::fs::FileSystem;

pub use scratch::{CleanupReport, ScratchDir, ScratchGuard};

/// Object type tag the controller expects for device targets.
pub const OBJECT_TYPE_SYSTEM: &str = "System";

/// On-disk request document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadDocument {
    pub params: PayloadParams,
    pub object_ids: Vec<String>,
    pub object_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadParams {
    pub arguments: PayloadArguments,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadArguments {
    pub globals: BTreeMap<String, String>,
    pub devices: BTreeMap<String, BTreeMap<String, String>>,
}

impl PayloadDocument {
    pub fn from_template(template: &TemplateConfig, targets: &[String]) -> Self {
        Self {
            params: PayloadParams {
                arguments: PayloadArguments {
                    globals: template.globals.clone(),
                    devices: template.devices.clone(),
                },
            },
            object_ids: trim_targets(targets),
            object_type: OBJECT_TYPE_SYSTEM.to_string(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Writes payload documents into the scratch directory.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    fs: Arc<dyn FileSystem>,
    scratch_dir: PathBuf,
}

impl PayloadBuilder {
    pub fn new(fs: Arc<dyn FileSystem>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Build the document for `template` and write it to a fresh file.
    ///
    /// The returned path is not tracked here; the scratch cleanup removes it.
    pub fn build(&self, template: &TemplateConfig, targets: &[String]) -> Result<PathBuf> {
        let doc = PayloadDocument::from_template(template, targets);
        let text = serde_json::to_string_pretty(&doc)?;

        self.fs.create_dir_all(&self.scratch_dir)?;
        let path = self.scratch_dir.join(Uuid::new_v4().to_string());
        self.fs.write(&path, text.as_bytes())?;

        debug!(
            template = %template.name,
            path = %path.display(),
            targets = doc.object_ids.len(),
            "payload written"
        );
        Ok(path)
    }
}
