//! Configuration for batch provisioning.

use crate::ProvisionError;
use conformance_types::Drops;
use std::fmt;
use std::time::Duration;

/// Well-known genesis account of a fresh test network.
pub const GENESIS_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

/// Seed of [`GENESIS_ADDRESS`].
pub const GENESIS_SECRET: &str = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb";

/// Raw funding account credentials as configured.
///
/// Validated only when the pipeline starts, so a bad value surfaces as
/// [`ProvisionError::FundingAccount`] rather than at construction.
#[derive(Clone, PartialEq, Eq)]
pub struct FundingAccount {
    pub address: String,
    pub secret: String,
}

impl FundingAccount {
    /// Credentials from raw strings.
    pub fn new(address: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            secret: secret.into(),
        }
    }

    /// The genesis account.
    pub fn genesis() -> Self {
        Self::new(GENESIS_ADDRESS, GENESIS_SECRET)
    }
}

impl fmt::Debug for FundingAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FundingAccount")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Configuration for the convergence gate.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Time between validated-ledger polls.
    pub poll_interval: Duration,

    /// Give up if the ledger has not advanced within this long.
    pub timeout: Duration,

    /// Close the open ledger with `ledger_accept` on entry.
    ///
    /// Only standalone servers accept this.
    pub force_close: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
            force_close: false,
        }
    }
}

/// Configuration for a provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Account every new identity is funded from. `None` is a fatal
    /// misconfiguration.
    pub funding_account: Option<FundingAccount>,

    /// Native currency sent to each new identity.
    pub funding_amount: Drops,

    /// First wait after a submission, and the fixed wait for funding.
    pub base_wait: Duration,

    /// Multiplier applied to the trust line wait after each failed attempt.
    pub backoff_factor: f64,

    /// Ceiling the trust line wait saturates at.
    pub max_wait: Duration,

    /// Identities generated per account slot before funding gives up.
    pub max_funding_attempts: u32,

    /// Submissions per account before trust line establishment gives up.
    pub max_trustline_attempts: u32,

    /// Overall deadline for the run, checked before every attempt and wait.
    pub deadline: Option<Duration>,

    /// Accounts worked on at once. 1 keeps the run strictly sequential.
    pub concurrency: usize,

    /// Convergence gate settings.
    pub gate: GateConfig,

    /// Query every account's trust lines after the gate.
    pub verify_trustlines: bool,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            funding_account: Some(FundingAccount::genesis()),
            funding_amount: Drops::from_units(1_000),
            base_wait: Duration::from_secs(1),
            backoff_factor: 1.5,
            max_wait: Duration::from_secs(60),
            max_funding_attempts: 20,
            max_trustline_attempts: 20,
            deadline: None,
            concurrency: 1,
            gate: GateConfig::default(),
            verify_trustlines: false,
        }
    }
}

impl ProvisionConfig {
    /// Set the funding account.
    pub fn with_funding_account(mut self, account: FundingAccount) -> Self {
        self.funding_account = Some(account);
        self
    }

    /// Remove the funding account.
    pub fn without_funding_account(mut self) -> Self {
        self.funding_account = None;
        self
    }

    /// Set the amount each new identity is funded with.
    pub fn with_funding_amount(mut self, amount: Drops) -> Self {
        self.funding_amount = amount;
        self
    }

    /// Set the base wait and backoff growth factor.
    pub fn with_backoff(mut self, base_wait: Duration, factor: f64) -> Self {
        self.base_wait = base_wait;
        self.backoff_factor = factor;
        self
    }

    /// Set the ceiling for the trust line wait.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Set the per-operation attempt ceilings.
    pub fn with_max_attempts(mut self, funding: u32, trustline: u32) -> Self {
        self.max_funding_attempts = funding;
        self.max_trustline_attempts = trustline;
        self
    }

    /// Set the overall deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the number of accounts worked on at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the convergence gate configuration.
    pub fn with_gate(mut self, gate: GateConfig) -> Self {
        self.gate = gate;
        self
    }

    /// Enable or disable post-gate trust line verification.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify_trustlines = verify;
        self
    }

    /// Check values that would make the retry loops misbehave.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if !(self.backoff_factor.is_finite() && self.backoff_factor > 1.0) {
            return Err(ProvisionError::InvalidConfig(format!(
                "backoff_factor must be greater than 1.0, got {}",
                self.backoff_factor
            )));
        }
        if self.max_wait < self.base_wait {
            return Err(ProvisionError::InvalidConfig(format!(
                "max_wait ({:?}) must not be below base_wait ({:?})",
                self.max_wait, self.base_wait
            )));
        }
        if self.max_funding_attempts == 0 || self.max_trustline_attempts == 0 {
            return Err(ProvisionError::InvalidConfig(
                "attempt ceilings must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ProvisionError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.gate.poll_interval.is_zero() {
            return Err(ProvisionError::InvalidConfig(
                "gate poll_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
