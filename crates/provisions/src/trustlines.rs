//! Trust line establishment.

use crate::backoff::{Backoff, Budget};
use crate::config::ProvisionConfig;
use crate::{tx, BatchProgress, Phase, ProvisionError};
use conformance_rpc::{RpcClient, RpcTransport};
use conformance_types::{Address, ProvisionedAccount, TrustlineSpec};
use futures::StreamExt;
use std::pin::pin;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Record of one account's successful trust line submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustlineReceipt {
    /// The account holding the line.
    pub address: Address,
    /// Submissions issued, including the accepted one.
    pub attempts: u32,
    /// Wait slept after each submission, in order.
    pub waits: Vec<Duration>,
    /// Hash of the accepted transaction, if reported.
    pub hash: Option<String>,
}

impl TrustlineReceipt {
    /// Submissions that were not accepted.
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Establishes the same trust line on every provisioned account.
///
/// Unlike funding, a rejected submission is retried for the same account
/// with a growing wait until it is accepted or the attempt ceiling is hit.
pub struct TrustlineEstablisher<'a, T> {
    client: &'a RpcClient<T>,
    config: &'a ProvisionConfig,
    budget: &'a Budget,
}

impl<'a, T: RpcTransport> TrustlineEstablisher<'a, T> {
    pub fn new(client: &'a RpcClient<T>, config: &'a ProvisionConfig, budget: &'a Budget) -> Self {
        Self {
            client,
            config,
            budget,
        }
    }

    /// Establish `spec` on every account, in the order given.
    ///
    /// Returns one receipt per account and counts each in `progress`.
    pub async fn establish(
        &self,
        accounts: &[ProvisionedAccount],
        spec: &TrustlineSpec,
        progress: &mut BatchProgress,
    ) -> Result<Vec<TrustlineReceipt>, ProvisionError> {
        info!(
            accounts = accounts.len(),
            currency = %spec.currency,
            issuer = %spec.issuer,
            limit = %spec.limit,
            "Establishing trust lines"
        );

        let mut established = pin!(futures::stream::iter(accounts)
            .map(|account| self.establish_one(account, spec))
            .buffered(self.config.concurrency));

        let mut receipts = Vec::with_capacity(accounts.len());
        while let Some(result) = established.next().await {
            let receipt = result?;
            if progress.record_trustline() {
                receipts.push(receipt);
            }
        }

        let retries: u32 = receipts.iter().map(TrustlineReceipt::retries).sum();
        info!(established = receipts.len(), retries, "All trust lines established");
        Ok(receipts)
    }

    async fn establish_one(
        &self,
        account: &ProvisionedAccount,
        spec: &TrustlineSpec,
    ) -> Result<TrustlineReceipt, ProvisionError> {
        let max_attempts = self.config.max_trustline_attempts;
        let trust_set = tx::trust_set(account.address(), spec);
        let mut backoff = Backoff::new(
            self.config.base_wait,
            self.config.backoff_factor,
            self.config.max_wait,
        );
        let mut waits = Vec::new();

        for attempt in 1..=max_attempts {
            self.budget.check(Phase::Trustline)?;

            let submitted = match self.client.submit(trust_set.clone(), account.secret()).await {
                Err(e) if !e.is_transient() => {
                    return Err(ProvisionError::rpc(Phase::Trustline)(e));
                }
                submitted => submitted,
            };

            let wait = backoff.current();
            self.budget.sleep(Phase::Trustline, wait).await?;
            waits.push(wait);

            match submitted {
                Ok(outcome) => match &outcome.engine_result {
                    Some(result) if result.is_success() => {
                        debug!(address = %account.address(), attempt, "Trust line established");
                        return Ok(TrustlineReceipt {
                            address: account.address().clone(),
                            attempts: attempt,
                            waits,
                            hash: outcome.hash,
                        });
                    }
                    Some(result) => warn!(
                        address = %account.address(),
                        attempt,
                        engine_result = %result,
                        message = outcome.message.as_deref().unwrap_or(""),
                        "Trust line not accepted, retrying"
                    ),
                    None => warn!(
                        address = %account.address(),
                        attempt,
                        raw = %outcome.raw,
                        "Trust line response missing engine_result, retrying"
                    ),
                },
                Err(e) => warn!(
                    address = %account.address(),
                    attempt,
                    error = %e,
                    "Trust line submission failed, retrying"
                ),
            }

            if attempt < max_attempts {
                backoff.grow();
            }
        }

        Err(ProvisionError::ProvisioningTimeout {
            phase: Phase::Trustline,
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conformance_test_helpers::{Scripted, ScriptedLedger};
    use conformance_types::{CurrencyCode, Secret};
    use tracing_test::traced_test;

    fn spec() -> TrustlineSpec {
        TrustlineSpec::new(
            CurrencyCode::parse("EUR").unwrap(),
            Address::parse("rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe").unwrap(),
            "100",
        )
        .unwrap()
    }

    fn account(address: &str) -> ProvisionedAccount {
        ProvisionedAccount::new(
            Address::parse(address).unwrap(),
            Secret::new("sScriptedHolder").unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_missing_engine_result_logged_and_retried() {
        let client = RpcClient::new(
            ScriptedLedger::new().script("TrustSet", [Scripted::MissingEngineResult]),
        );
        let config = ProvisionConfig::default().with_backoff(Duration::from_millis(100), 3.0);
        let budget = Budget::unbounded();
        let accounts = vec![account("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh")];
        let mut progress = BatchProgress::new(1);
        assert!(progress.record_funded());

        let receipts = TrustlineEstablisher::new(&client, &config, &budget)
            .establish(&accounts, &spec(), &mut progress)
            .await
            .unwrap();

        assert_eq!(receipts[0].attempts, 2);
        assert_eq!(
            receipts[0].waits,
            vec![Duration::from_millis(100), Duration::from_millis(300)]
        );
        assert_eq!(progress.trustlines_established(), 1);
        assert!(logs_contain("missing engine_result"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_busy_server_retried_for_same_account() {
        let client = RpcClient::new(ScriptedLedger::new().script(
            "TrustSet",
            [Scripted::server_error("tooBusy"), Scripted::TransportFailure],
        ));
        let config = ProvisionConfig::default().with_backoff(Duration::from_secs(1), 2.0);
        let budget = Budget::unbounded();
        let accounts = vec![account("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh")];
        let mut progress = BatchProgress::new(1);
        progress.record_funded();

        let receipts = TrustlineEstablisher::new(&client, &config, &budget)
            .establish(&accounts, &spec(), &mut progress)
            .await
            .unwrap();

        assert_eq!(receipts[0].attempts, 3);
        assert_eq!(
            receipts[0].waits,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        assert_eq!(client.transport().submissions("TrustSet").len(), 3);
        assert!(logs_contain("tooBusy"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_saturates_at_max_wait() {
        let client = RpcClient::new(
            ScriptedLedger::new().script("TrustSet", vec![Scripted::engine("terQUEUED"); 4]),
        );
        let config = ProvisionConfig::default()
            .with_backoff(Duration::from_secs(1), 1e20)
            .with_max_wait(Duration::from_secs(5));
        let budget = Budget::unbounded();
        let accounts = vec![account("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh")];
        let mut progress = BatchProgress::new(1);
        progress.record_funded();

        let receipts = TrustlineEstablisher::new(&client, &config, &budget)
            .establish(&accounts, &spec(), &mut progress)
            .await
            .unwrap();

        let capped = Duration::from_secs(5);
        assert_eq!(
            receipts[0].waits,
            vec![Duration::from_secs(1), capped, capped, capped, capped]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipts_follow_input_order() {
        let client = RpcClient::new(
            ScriptedLedger::new().script("TrustSet", [Scripted::engine("terQUEUED")]),
        );
        let config = ProvisionConfig::default();
        let budget = Budget::unbounded();
        let accounts = vec![
            account("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"),
            account("rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe"),
        ];
        let mut progress = BatchProgress::new(2);
        progress.record_funded();
        progress.record_funded();

        let receipts = TrustlineEstablisher::new(&client, &config, &budget)
            .establish(&accounts, &spec(), &mut progress)
            .await
            .unwrap();

        assert_eq!(receipts[0].address, *accounts[0].address());
        assert_eq!(receipts[1].address, *accounts[1].address());
        assert_eq!(receipts[0].retries(), 1);
        assert_eq!(receipts[1].retries(), 0);
    }
}
