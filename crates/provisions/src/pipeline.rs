//! The `setup_env` pipeline: fund, establish, converge.

use crate::accounts::{AccountProvisioner, FundingSource};
use crate::backoff::Budget;
use crate::config::ProvisionConfig;
use crate::gate::ConvergenceGate;
use crate::trustlines::{TrustlineEstablisher, TrustlineReceipt};
use crate::{BatchProgress, Phase, ProvisionError};
use conformance_rpc::{RpcClient, RpcTransport};
use conformance_types::{LedgerIndex, ProvisionedAccount, TrustlineSpec};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// A fully provisioned batch, handed over to the caller.
#[derive(Debug, Clone)]
pub struct ProvisionedBatch {
    /// Funded accounts, each holding the trust line.
    pub accounts: Vec<ProvisionedAccount>,
    /// One receipt per account, same order as `accounts`.
    pub receipts: Vec<TrustlineReceipt>,
    /// Final counters.
    pub progress: BatchProgress,
    /// Validated ledger observed when the gate opened.
    pub validated_ledger: LedgerIndex,
}

/// How a run ended when it did not hit a fatal error.
#[derive(Debug)]
pub enum SetupOutcome {
    /// Every account funded and holding the trust line.
    Complete(ProvisionedBatch),
    /// The batch could not be completed. Callers should not use a partially
    /// provisioned set.
    Failed {
        progress: BatchProgress,
        error: ProvisionError,
    },
}

impl SetupOutcome {
    /// Whether the batch completed.
    pub fn is_complete(&self) -> bool {
        matches!(self, SetupOutcome::Complete(_))
    }

    /// Counters at the end of the run.
    pub fn progress(&self) -> &BatchProgress {
        match self {
            SetupOutcome::Complete(batch) => &batch.progress,
            SetupOutcome::Failed { progress, .. } => progress,
        }
    }

    /// The batch, if it completed.
    pub fn into_batch(self) -> Option<ProvisionedBatch> {
        match self {
            SetupOutcome::Complete(batch) => Some(batch),
            SetupOutcome::Failed { .. } => None,
        }
    }
}

/// Provisions batches of accounts against one server.
pub struct ProvisioningPipeline<T> {
    client: RpcClient<T>,
    config: ProvisionConfig,
    cancel: CancellationToken,
}

impl<T: RpcTransport> ProvisioningPipeline<T> {
    /// Create a pipeline over `client`.
    pub fn new(client: RpcClient<T>, config: ProvisionConfig) -> Self {
        Self {
            client,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop every retry loop when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The RPC client.
    pub fn client(&self) -> &RpcClient<T> {
        &self.client
    }

    /// The configuration.
    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Provision `number_of_accounts` funded accounts holding the trust line
    /// described by `spec`, with its limit replaced by `trustline_limit` if
    /// given.
    ///
    /// Returns `Err` only for fatal problems found before any submission:
    /// a zero target, invalid configuration or trust line, or an unusable
    /// funding account. Everything else is reported as
    /// [`SetupOutcome::Failed`].
    pub async fn setup_env(
        &self,
        number_of_accounts: usize,
        spec: &TrustlineSpec,
        trustline_limit: Option<&str>,
    ) -> Result<SetupOutcome, ProvisionError> {
        if number_of_accounts == 0 {
            return Err(ProvisionError::InvalidTarget);
        }
        self.config.validate()?;

        let spec = match trustline_limit {
            Some(limit) => spec.with_limit(limit)?,
            None => spec.clone(),
        };
        let funder = FundingSource::resolve(self.config.funding_account.as_ref())?;

        let budget = Budget::new(self.config.deadline, self.cancel.child_token());
        let mut progress = BatchProgress::new(number_of_accounts);

        let (accounts, receipts, validated_ledger) = match self
            .run_phases(&funder, &spec, &budget, &mut progress)
            .await
        {
            Ok(phases) => phases,
            Err(error) => {
                error!(%error, %progress, "Provisioning failed");
                return Ok(SetupOutcome::Failed { progress, error });
            }
        };

        if !progress.is_complete() {
            error!(%progress, "Provisioning finished with an incomplete batch");
            return Ok(SetupOutcome::Failed {
                progress,
                error: ProvisionError::IncompleteBatch(progress),
            });
        }

        info!(%progress, %validated_ledger, "Provisioning complete");
        Ok(SetupOutcome::Complete(ProvisionedBatch {
            accounts,
            receipts,
            progress,
            validated_ledger,
        }))
    }

    async fn run_phases(
        &self,
        funder: &FundingSource,
        spec: &TrustlineSpec,
        budget: &Budget,
        progress: &mut BatchProgress,
    ) -> Result<(Vec<ProvisionedAccount>, Vec<TrustlineReceipt>, LedgerIndex), ProvisionError> {
        let accounts = AccountProvisioner::new(&self.client, &self.config, budget)
            .provision(funder, progress)
            .await?;

        let receipts = TrustlineEstablisher::new(&self.client, &self.config, budget)
            .establish(&accounts, spec, progress)
            .await?;

        let validated_ledger = ConvergenceGate::new(&self.client, &self.config.gate)
            .wait(budget)
            .await?;

        if self.config.verify_trustlines {
            self.verify_trustlines(&accounts, spec, budget).await?;
        }

        Ok((accounts, receipts, validated_ledger))
    }

    /// Confirm every account's trust line is visible in validated state.
    async fn verify_trustlines(
        &self,
        accounts: &[ProvisionedAccount],
        spec: &TrustlineSpec,
        budget: &Budget,
    ) -> Result<(), ProvisionError> {
        let mut missing = Vec::new();

        for account in accounts {
            budget.check(Phase::Verification)?;

            let lines = self
                .client
                .account_lines(account.address(), Some(&spec.issuer))
                .await
                .map_err(ProvisionError::rpc(Phase::Verification))?;

            let present = lines.iter().any(|line| {
                line.account == spec.issuer.as_str()
                    && line.currency == spec.currency.as_str()
                    && same_amount(&line.limit, &spec.limit)
            });
            if !present {
                warn!(address = %account.address(), "Trust line not visible after convergence");
                missing.push(account.address().clone());
            }
        }

        if missing.is_empty() {
            info!(accounts = accounts.len(), "Trust lines verified");
            Ok(())
        } else {
            Err(ProvisionError::VerificationFailed { missing })
        }
    }
}

/// Compare decimal strings by value, so `1e3` matches `1000.0`.
fn same_amount(a: &str, b: &str) -> bool {
    match (canonical_amount(a), canonical_amount(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

/// `(negative, significant digits, exponent)` of a decimal string, exact.
///
/// Zero is `(false, "", 0)` whatever its sign or spelling.
fn canonical_amount(s: &str) -> Option<(bool, String, i64)> {
    let s = s.trim();
    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i64>().ok()?),
        None => (unsigned, 0),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if (int.is_empty() && frac.is_empty())
        || !int.chars().chain(frac.chars()).all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let digits = format!("{int}{frac}");
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Some((false, String::new(), 0));
    }
    let significant = digits.trim_end_matches('0');
    let exponent = exponent
        .checked_sub(i64::try_from(frac.len()).ok()?)?
        .checked_add(i64::try_from(digits.len() - significant.len()).ok()?)?;
    Some((negative, significant.to_string(), exponent))
}
