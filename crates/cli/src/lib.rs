//! Command-line support for the conformance setup tool.
//!
//! Holds the TOML file format for provisioning runs and the readiness wait
//! used before provisioning against a freshly started server.

mod file_config;

pub use file_config::{ConfigError, FileConfig};

use conformance_rpc::{RpcClient, RpcTransport};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Poll `server_info` until the server reports it is ready.
///
/// Connection errors count as "not ready yet" until `timeout` expires.
pub async fn wait_for_ready<T: RpcTransport>(
    client: &RpcClient<T>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), ReadyError> {
    let started = Instant::now();
    loop {
        match client.server_ready().await {
            Ok(true) => {
                info!(elapsed = ?started.elapsed(), "Server ready");
                return Ok(());
            }
            Ok(false) => debug!("Server not synced yet"),
            Err(e) => debug!(error = %e, "Server not reachable yet"),
        }

        if started.elapsed() >= timeout {
            return Err(ReadyError::Timeout(timeout));
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Errors while waiting for a server to become ready.
#[derive(Debug, thiserror::Error)]
pub enum ReadyError {
    #[error("Server not ready after {0:?}")]
    Timeout(Duration),
}
