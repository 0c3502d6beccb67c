// src/engine/discovery.rs

//! Target auto-discovery.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::errors::{ProvrunError, Result};
use crate::exec::{OperationCommand, OperationExecutor};

const DISCOVERY_ATTEMPTS: usize = 3;
const DISCOVERY_PAUSE: Duration = Duration::from_secs(1);
/// Step name reported when the run is cancelled mid-discovery.
pub const DISCOVERY_STEP: &str = "target discovery";

static QUOTED_IPV4_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'](\d{1,3}(?:\.\d{1,3}){3})["']"#).expect("valid regex")
});

/// Ask the controller for its systems and return their addresses.
///
/// Runs the systems listing operation up to three times, one second apart,
/// until one exits cleanly. A clean run with no addresses in its output is
/// not retried, and neither is a cancelled one.
pub async fn discover_targets<E: OperationExecutor>(
    executor: &mut E,
    command: &OperationCommand,
) -> Result<Vec<String>> {
    for attempt in 1..=DISCOVERY_ATTEMPTS {
        let result = executor.execute(command.list_systems()).await?;

        if result.cancelled() {
            return Err(ProvrunError::Cancelled {
                template: DISCOVERY_STEP.to_string(),
            });
        }

        if result.success() {
            let targets = scrape_addresses(&result.stdout);
            if targets.is_empty() {
                return Err(ProvrunError::Discovery(
                    "could not find any systems".to_string(),
                ));
            }
            info!(count = targets.len(), ?targets, "discovered targets");
            return Ok(targets);
        }

        warn!(
            attempt,
            exit_code = result.exit_code,
            stderr = %result.stderr.trim_end(),
            "systems listing failed"
        );
        if attempt < DISCOVERY_ATTEMPTS {
            tokio::time::sleep(DISCOVERY_PAUSE).await;
        }
    }

    Err(ProvrunError::Discovery(
        "could not connect to controller".to_string(),
    ))
}

/// Quoted IPv4 addresses in order of first appearance, without duplicates.
fn scrape_addresses(output: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in QUOTED_IPV4_RE.captures_iter(output) {
        let ip = &caps[1];
        if !found.iter().any(|f| f == ip) {
            found.push(ip.to_string());
        }
    }
    debug!(count = found.len(), "scraped addresses");
    found
}
