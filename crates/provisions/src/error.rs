//! Error types for provisioning.

use crate::BatchProgress;
use conformance_rpc::RpcError;
use conformance_types::{Address, LedgerIndex, TypeError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Pipeline stage an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Funding,
    Trustline,
    Convergence,
    Verification,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Funding => "funding",
            Phase::Trustline => "trust line establishment",
            Phase::Convergence => "convergence",
            Phase::Verification => "verification",
        };
        f.write_str(name)
    }
}

/// Errors during provisioning.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Funding account missing or unparseable.
    #[error("Funding account unavailable: {0}")]
    FundingAccount(String),

    /// Zero accounts requested.
    #[error("Target account count must be positive")]
    InvalidTarget,

    /// Configuration that would make retry loops misbehave.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Trust line override that does not form a valid spec.
    #[error("Invalid trust line specification: {0}")]
    InvalidTrustline(#[from] TypeError),

    /// Transport or server error escaping a retry loop.
    #[error("RPC call failed during {phase}: {source}")]
    Rpc {
        phase: Phase,
        #[source]
        source: RpcError,
    },

    /// An operation used up its attempt ceiling.
    #[error("Provisioning timed out: {phase} gave up after {attempts} attempts")]
    ProvisioningTimeout { phase: Phase, attempts: u32 },

    /// The run's overall deadline passed.
    #[error("Deadline of {deadline:?} exceeded during {phase}")]
    DeadlineExceeded { phase: Phase, deadline: Duration },

    /// The run was cancelled.
    #[error("Cancelled during {0}")]
    Cancelled(Phase),

    /// The ledger did not advance in time.
    #[error("Ledger did not advance past {entered_at} within {timeout:?} (last seen {last_seen})")]
    GateTimeout {
        entered_at: LedgerIndex,
        last_seen: LedgerIndex,
        timeout: Duration,
    },

    /// Accounts whose trust line is not visible after convergence.
    #[error("{} account(s) lack the trust line after convergence", .missing.len())]
    VerificationFailed { missing: Vec<Address> },

    /// Post-condition on the progress counters failed.
    #[error("Batch incomplete: {0}")]
    IncompleteBatch(BatchProgress),
}

impl ProvisionError {
    pub(crate) fn rpc(phase: Phase) -> impl FnOnce(RpcError) -> Self {
        move |source| ProvisionError::Rpc { phase, source }
    }

    /// Whether this error aborts the pipeline instead of being reported as a
    /// failed batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProvisionError::FundingAccount(_)
                | ProvisionError::InvalidTarget
                | ProvisionError::InvalidConfig(_)
                | ProvisionError::InvalidTrustline(_)
        )
    }
}
