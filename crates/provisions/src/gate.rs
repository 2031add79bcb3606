//! Batch convergence gate.
//!
//! Submissions are asynchronous relative to ledger finality. The gate turns
//! "N operations submitted" into "N operations visible" by waiting until the
//! validated ledger has moved past the one seen on entry.

use crate::backoff::Budget;
use crate::config::GateConfig;
use crate::{Phase, ProvisionError};
use conformance_rpc::{RpcClient, RpcTransport};
use conformance_types::LedgerIndex;
use tokio::time::Instant;
use tracing::{debug, info};

/// Blocks until the validated ledger advances.
pub struct ConvergenceGate<'a, T> {
    client: &'a RpcClient<T>,
    config: &'a GateConfig,
}

impl<'a, T: RpcTransport> ConvergenceGate<'a, T> {
    pub fn new(client: &'a RpcClient<T>, config: &'a GateConfig) -> Self {
        Self { client, config }
    }

    /// Wait for the validated ledger to pass the index observed on entry.
    ///
    /// Returns the first validated index beyond the entry point.
    pub async fn wait(&self, budget: &Budget) -> Result<LedgerIndex, ProvisionError> {
        let entered_at = self
            .client
            .validated_ledger()
            .await
            .map_err(ProvisionError::rpc(Phase::Convergence))?;
        info!(%entered_at, force_close = self.config.force_close, "Waiting for ledger to advance");

        if self.config.force_close {
            let open = self
                .client
                .ledger_accept()
                .await
                .map_err(ProvisionError::rpc(Phase::Convergence))?;
            debug!(%open, "Forced ledger close");
        }

        let started = Instant::now();
        loop {
            let last_seen = self
                .client
                .validated_ledger()
                .await
                .map_err(ProvisionError::rpc(Phase::Convergence))?;

            if last_seen > entered_at {
                info!(%entered_at, %last_seen, "Ledger advanced");
                return Ok(last_seen);
            }

            if started.elapsed() >= self.config.timeout {
                return Err(ProvisionError::GateTimeout {
                    entered_at,
                    last_seen,
                    timeout: self.config.timeout,
                });
            }

            budget
                .sleep(Phase::Convergence, self.config.poll_interval)
                .await?;
        }
    }
}
