//! Account provisioning.
//!
//! Each account slot generates a fresh identity, funds it from the funding
//! account and keeps it only if the payment is accepted. A rejected identity
//! is discarded and the slot starts over with a new one; the payment is never
//! resubmitted for the same identity.

use crate::backoff::Budget;
use crate::config::{FundingAccount, ProvisionConfig};
use crate::{tx, BatchProgress, Phase, ProvisionError};
use conformance_rpc::{RpcClient, RpcTransport};
use conformance_types::{Address, ProvisionedAccount, Secret};
use futures::StreamExt;
use std::pin::pin;
use tracing::{debug, error, info, warn};

/// Validated funding account credentials.
#[derive(Debug, Clone)]
pub struct FundingSource {
    address: Address,
    secret: Secret,
}

impl FundingSource {
    /// Resolve configured credentials into a usable funding source.
    ///
    /// Runs before any network call, so a missing or malformed funding
    /// account aborts the run without submitting anything.
    pub fn resolve(account: Option<&FundingAccount>) -> Result<Self, ProvisionError> {
        let result = match account {
            None => Err(ProvisionError::FundingAccount(
                "no funding account configured".to_string(),
            )),
            Some(account) => Address::parse(&account.address)
                .and_then(|address| Ok((address, Secret::new(account.secret.clone())?)))
                .map(|(address, secret)| Self { address, secret })
                .map_err(|e| ProvisionError::FundingAccount(e.to_string())),
        };

        if let Err(e) = &result {
            error!(error = %e, "Cannot resolve funding account");
        }
        result
    }

    /// The funding account address.
    pub fn address(&self) -> &Address {
        &self.address
    }
}

/// Brings a target number of funded identities into existence.
pub struct AccountProvisioner<'a, T> {
    client: &'a RpcClient<T>,
    config: &'a ProvisionConfig,
    budget: &'a Budget,
}

impl<'a, T: RpcTransport> AccountProvisioner<'a, T> {
    pub fn new(client: &'a RpcClient<T>, config: &'a ProvisionConfig, budget: &'a Budget) -> Self {
        Self {
            client,
            config,
            budget,
        }
    }

    /// Fund `progress.target()` new accounts.
    ///
    /// Returns exactly that many accounts in slot order, counting each one in
    /// `progress` as it is accepted. On error, `progress` reflects the
    /// accounts funded before the failure.
    pub async fn provision(
        &self,
        funder: &FundingSource,
        progress: &mut BatchProgress,
    ) -> Result<Vec<ProvisionedAccount>, ProvisionError> {
        let target = progress.target();
        info!(
            target,
            funder = %funder.address(),
            amount = %self.config.funding_amount,
            "Provisioning accounts"
        );

        let mut funded = pin!(futures::stream::iter(0..target)
            .map(|slot| self.fund_slot(funder, slot))
            .buffered(self.config.concurrency));

        let mut accounts = Vec::with_capacity(target);
        while let Some(result) = funded.next().await {
            let account = result?;
            if progress.record_funded() {
                accounts.push(account);
            }
        }

        info!(funded = accounts.len(), "All accounts funded");
        Ok(accounts)
    }

    /// Generate identities for one slot until one is funded.
    async fn fund_slot(
        &self,
        funder: &FundingSource,
        slot: usize,
    ) -> Result<ProvisionedAccount, ProvisionError> {
        let max_attempts = self.config.max_funding_attempts;

        for attempt in 1..=max_attempts {
            self.budget.check(Phase::Funding)?;

            let candidate = match self.client.wallet_propose().await {
                Ok(candidate) => candidate,
                Err(e) if e.is_transient() => {
                    warn!(slot, attempt, error = %e, "Could not generate identity, retrying");
                    self.budget
                        .sleep(Phase::Funding, self.config.base_wait)
                        .await?;
                    continue;
                }
                Err(e) => return Err(ProvisionError::rpc(Phase::Funding)(e)),
            };
            let payment = tx::payment(
                &funder.address,
                candidate.address(),
                self.config.funding_amount,
            );
            let submitted = match self.client.submit(payment, &funder.secret).await {
                Err(e) if !e.is_transient() => {
                    return Err(ProvisionError::rpc(Phase::Funding)(e));
                }
                submitted => submitted,
            };

            self.budget
                .sleep(Phase::Funding, self.config.base_wait)
                .await?;

            match submitted {
                Ok(outcome) if outcome.is_success() => {
                    debug!(slot, attempt, address = %candidate.address(), "Account funded");
                    return Ok(candidate);
                }
                Ok(outcome) => warn!(
                    slot,
                    attempt,
                    address = %candidate.address(),
                    engine_result = outcome
                        .engine_result
                        .as_ref()
                        .map(|r| r.as_str())
                        .unwrap_or("<missing>"),
                    "Funding not accepted, discarding identity"
                ),
                Err(e) => warn!(
                    slot,
                    attempt,
                    address = %candidate.address(),
                    error = %e,
                    "Funding submission failed, discarding identity"
                ),
            }
        }

        Err(ProvisionError::ProvisioningTimeout {
            phase: Phase::Funding,
            attempts: max_attempts,
        })
    }
}
