// src/provision/systems.rs

use std::io::Write;

use crate::controller::{RestClient, SYSTEMS_PATH};
use crate::errors::ProvrunError;

use super::{ActionArgs, ActionFuture, ActionResponse, Capability, NeededArgs};

pub const LIST: &str = "list";

/// Read-only view of the systems the controller manages.
///
/// The response body is always printed so addresses can be scraped from it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemsCapability;

impl Capability for SystemsCapability {
    fn actions(&self) -> &'static [&'static str] {
        &[LIST]
    }

    fn describe(&self, action: &str) -> Option<&'static str> {
        (action == LIST).then_some("Getting systems")
    }

    fn expected_params(&self, _action: &str) -> &'static [&'static str] {
        &[]
    }

    fn needed_args(&self, _action: &str) -> NeededArgs {
        NeededArgs::default()
    }

    fn execute<'a>(
        &'a self,
        action: &'a str,
        client: &'a dyn RestClient,
        _args: &'a ActionArgs,
        _out: &'a mut (dyn Write + Send),
    ) -> ActionFuture<'a> {
        Box::pin(async move {
            if action != LIST {
                return Err(ProvrunError::ConfigError(format!(
                    "action '{action}' is not supported"
                )));
            }
            let resp = client.get(SYSTEMS_PATH).await?;
            // Pretty-print JSON so every address sits in its own quoted value.
            let body = serde_json::from_str::<serde_json::Value>(&resp.body)
                .ok()
                .and_then(|v| serde_json::to_string_pretty(&v).ok())
                .unwrap_or(resp.body);
            Ok(ActionResponse {
                status: resp.status,
                body,
                print_body: true,
            })
        })
    }
}
