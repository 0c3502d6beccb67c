// src/provision/provisioning.rs

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, LazyLock};

use anyhow::Context;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::contract::markers::unverified_status_lines;
use crate::controller::{PROVISIONING_PATH, RestClient, TEMPLATES_PATH};
use crate::errors::{ProvrunError, Result};
use crate::fs::FileSystem;
use crate::payload::PayloadDocument;
use crate::poller::{JobPoller, emit_outcome, extract_job_id};

use super::report::print_data;
use super::{ActionArgs, ActionFuture, ActionResponse, Capability, NeededArgs, TEMPLATE_NAME_PARAM};

pub const EXECUTE: &str = "execute";
pub const LIST: &str = "list";
pub const DETAILS: &str = "details";

const HTTP_OK: u16 = 200;
const HTTP_ACCEPTED: u16 = 202;

static GLOBAL_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#<([^<>]*)>\|desc:(.*)").expect("valid regex"));
static LOCAL_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#<<([^<>]*)>>\|desc:(.*)").expect("valid regex"));

/// Arguments a provisioning template declares in its content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateArguments {
    /// Shared by all targets (`#<name>|desc:...`).
    pub global_args: BTreeMap<String, String>,
    /// Per-target (`#<<name>>|desc:...`).
    pub local_args: BTreeMap<String, String>,
}

impl TemplateArguments {
    pub fn from_content<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut args = Self::default();
        for line in lines.into_iter().filter(|l| l.starts_with("#<")) {
            if let Some(caps) = GLOBAL_ARG_RE.captures(line) {
                args.global_args.insert(caps[1].to_string(), caps[2].to_string());
            } else if let Some(caps) = LOCAL_ARG_RE.captures(line) {
                args.local_args.insert(caps[1].to_string(), caps[2].to_string());
            }
        }
        args
    }
}

/// Provisioning templates: run one, list them, or show a template's arguments.
#[derive(Debug, Clone)]
pub struct ProvisioningCapability {
    fs: Arc<dyn FileSystem>,
}

impl ProvisioningCapability {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    async fn execute_template(
        &self,
        client: &dyn RestClient,
        args: &ActionArgs,
        out: &mut (dyn Write + Send),
    ) -> Result<ActionResponse> {
        let template = template_param(args)?;
        let file = args
            .file
            .as_ref()
            .ok_or_else(|| ProvrunError::ConfigError("Missing argument --file".to_string()))?;

        let text = self
            .fs
            .read_to_string(file)
            .with_context(|| format!("reading payload file {}", file.display()))?;
        // Parsed only to check the shape; the file's text is sent unchanged.
        let doc = PayloadDocument::from_json(&text).map_err(|e| {
            ProvrunError::ConfigError(format!(
                "payload file {} is not a provisioning document: {e}",
                file.display()
            ))
        })?;
        info!(template, targets = doc.object_ids.len(), "submitting provisioning request");

        let path = format!("{PROVISIONING_PATH}/{template}");
        let resp = client.post(&path, text).await?;

        debug!(template, status = resp.status, body = %resp.body, "provisioning request answered");
        if args.blocking && resp.status == HTTP_ACCEPTED {
            match extract_job_id(&resp.body) {
                Some(job_id) => {
                    writeln!(out, "[*] Running job {job_id}")?;
                    let outcome = JobPoller::new(client, args.poll)
                        .wait_for_terminal(job_id)
                        .await?;
                    emit_outcome(&outcome, out)?;
                }
                None => {
                    warn!(template, body = %resp.body, "accepted response does not link a job");
                    for line in unverified_status_lines() {
                        writeln!(out, "{line}")?;
                    }
                }
            }
        }

        // After a poll, stdout carries job statuses only; the submission body
        // could hold a "Status" of its own.
        Ok(ActionResponse {
            status: resp.status,
            body: resp.body,
            print_body: !args.blocking,
        })
    }

    async fn list_templates(
        &self,
        client: &dyn RestClient,
        out: &mut (dyn Write + Send),
    ) -> Result<ActionResponse> {
        let resp = client.get(TEMPLATES_PATH).await?;
        if resp.status == HTTP_OK {
            let templates: Vec<Value> = serde_json::from_str(&resp.body)?;
            let titles: Vec<&str> = templates
                .iter()
                .filter_map(|t| t.get("title").and_then(Value::as_str))
                .collect();
            print_data(out, "Template list", &titles.join("\n"))?;
        }
        Ok(ActionResponse {
            status: resp.status,
            body: resp.body,
            print_body: false,
        })
    }

    async fn template_details(
        &self,
        client: &dyn RestClient,
        args: &ActionArgs,
        out: &mut (dyn Write + Send),
    ) -> Result<ActionResponse> {
        let template = template_param(args)?;
        let resp = client.get(&format!("{TEMPLATES_PATH}/{template}")).await?;
        if resp.status == HTTP_OK {
            let body: Value = serde_json::from_str(&resp.body)?;
            let content = body
                .get("content")
                .and_then(Value::as_array)
                .map(|lines| lines.iter().filter_map(Value::as_str).collect::<Vec<_>>())
                .unwrap_or_default();
            let details = TemplateArguments::from_content(content);
            print_data(out, "Template details", &serde_json::to_string_pretty(&details)?)?;
        }
        Ok(ActionResponse {
            status: resp.status,
            body: resp.body,
            print_body: false,
        })
    }
}

fn template_param(args: &ActionArgs) -> Result<&str> {
    args.params
        .get(TEMPLATE_NAME_PARAM)
        .map(String::as_str)
        .ok_or_else(|| ProvrunError::ConfigError(format!("missing parameter '{TEMPLATE_NAME_PARAM}'")))
}

impl Capability for ProvisioningCapability {
    fn actions(&self) -> &'static [&'static str] {
        &[EXECUTE, LIST, DETAILS]
    }

    fn describe(&self, action: &str) -> Option<&'static str> {
        match action {
            EXECUTE => Some("Executing provisioning task"),
            LIST => Some("Getting template list"),
            DETAILS => Some("Getting template details"),
            _ => None,
        }
    }

    fn expected_params(&self, action: &str) -> &'static [&'static str] {
        match action {
            EXECUTE | DETAILS => &[TEMPLATE_NAME_PARAM],
            _ => &[],
        }
    }

    fn needed_args(&self, action: &str) -> NeededArgs {
        match action {
            EXECUTE => NeededArgs {
                file: true,
                blocking: true,
            },
            _ => NeededArgs::default(),
        }
    }

    fn execute<'a>(
        &'a self,
        action: &'a str,
        client: &'a dyn RestClient,
        args: &'a ActionArgs,
        out: &'a mut (dyn Write + Send),
    ) -> ActionFuture<'a> {
        Box::pin(async move {
            match action {
                EXECUTE => self.execute_template(client, args, out).await,
                LIST => self.list_templates(client, out).await,
                DETAILS => self.template_details(client, args, out).await,
                other => Err(ProvrunError::ConfigError(format!(
                    "action '{other}' is not supported"
                ))),
            }
        })
    }
}
