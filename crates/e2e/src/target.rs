//! Target reachability probe
//!
//! The storefront is an external deployment; before burning a whole
//! suite against a dead URL, poll it until it answers or the startup
//! window closes.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Poll `base_url` until it responds with a non-5xx status.
pub async fn wait_until_reachable(base_url: &str, startup_timeout: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = std::time::Instant::now();
    let mut attempts = 0;

    while start.elapsed() < startup_timeout {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                info!("Target is reachable at {}", base_url);
                return Ok(());
            }
            Ok(resp) => {
                warn!("Target returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for target at {}...", base_url);
                }
                // Connection refused is expected while a local deployment
                // is still starting.
                if !e.is_connect() {
                    warn!("Probe error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(100)).await;
    }

    Err(E2eError::TargetUnreachable {
        url: base_url.to_string(),
        attempts,
    })
}
