//! End-to-end provisioning scenarios against a scripted ledger.

use conformance_provisions::{
    FundingAccount, GateConfig, Phase, ProvisionConfig, ProvisionError, ProvisioningPipeline,
    SetupOutcome,
};
use conformance_rpc::RpcClient;
use conformance_test_helpers::{Scripted, ScriptedLedger};
use conformance_types::{Address, CurrencyCode, TrustlineSpec};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const ISSUER: &str = "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe";

fn spec() -> TrustlineSpec {
    TrustlineSpec::new(
        CurrencyCode::parse("USD").unwrap(),
        Address::parse(ISSUER).unwrap(),
        "1000000",
    )
    .unwrap()
}

fn config() -> ProvisionConfig {
    ProvisionConfig::default()
        .with_backoff(Duration::from_secs(1), 2.0)
        .with_max_attempts(10, 10)
        .with_gate(GateConfig {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
            force_close: false,
        })
}

fn pipeline(
    ledger: ScriptedLedger,
    config: ProvisionConfig,
) -> (
    Arc<ScriptedLedger>,
    ProvisioningPipeline<Arc<ScriptedLedger>>,
) {
    let ledger = Arc::new(ledger);
    let pipeline = ProvisioningPipeline::new(RpcClient::new(ledger.clone()), config);
    (ledger, pipeline)
}

fn rejections(code: &str, count: usize) -> Vec<Scripted> {
    vec![Scripted::engine(code); count]
}

fn expect_failed(outcome: SetupOutcome) -> ProvisionError {
    match outcome {
        SetupOutcome::Failed { error, .. } => error,
        SetupOutcome::Complete(batch) => panic!("expected failure, got {:?}", batch.progress),
    }
}

#[tokio::test(start_paused = true)]
async fn test_three_accounts_first_try() {
    let (ledger, pipeline) = pipeline(ScriptedLedger::new(), config());

    let outcome = pipeline.setup_env(3, &spec(), None).await.unwrap();
    let batch = outcome.into_batch().expect("batch should complete");

    assert_eq!(batch.accounts.len(), 3);
    assert_eq!(batch.receipts.len(), 3);
    assert_eq!(batch.progress.accounts_funded(), 3);
    assert_eq!(batch.progress.trustlines_established(), 3);
    assert!(batch.receipts.iter().all(|r| r.retries() == 0));

    // Every account is distinct and each receipt belongs to its account
    let addresses: HashSet<_> = batch.accounts.iter().map(|a| a.address().clone()).collect();
    assert_eq!(addresses.len(), 3);
    for (account, receipt) in batch.accounts.iter().zip(&batch.receipts) {
        assert_eq!(account.address(), &receipt.address);
    }

    assert_eq!(ledger.wallets_issued(), 3);
    assert_eq!(ledger.submissions("Payment").len(), 3);
    assert_eq!(ledger.submissions("TrustSet").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_two_accounts_each_submission_fails_once() {
    let ledger = ScriptedLedger::new()
        .script("Payment", [Scripted::engine("tecUNFUNDED_PAYMENT")])
        .script(
            "TrustSet",
            [
                Scripted::engine("terQUEUED"),
                Scripted::success(),
                Scripted::engine("terQUEUED"),
                Scripted::success(),
            ],
        );
    let (ledger, pipeline) = pipeline(ledger, config());

    let outcome = pipeline.setup_env(2, &spec(), None).await.unwrap();
    let batch = outcome.into_batch().expect("batch should complete");

    assert_eq!(batch.accounts.len(), 2);
    assert!(batch.progress.is_complete());

    // The rejected identity was discarded and replaced
    assert_eq!(ledger.wallets_issued(), 3);
    assert_eq!(ledger.submissions("Payment").len(), 3);
    assert_eq!(ledger.funded_accounts().len(), 2);
    let rejected = ledger.submissions("Payment")[0]["Destination"].clone();
    assert!(batch
        .accounts
        .iter()
        .all(|a| rejected != a.address().as_str()));

    // Trust lines were retried for the same account
    assert_eq!(ledger.submissions("TrustSet").len(), 4);
    assert!(batch.receipts.iter().all(|r| r.attempts == 2));
}

#[tokio::test(start_paused = true)]
async fn test_funding_account_unresolvable_is_fatal() {
    let (ledger, pipeline) = pipeline(ScriptedLedger::new(), config().without_funding_account());

    let result = pipeline.setup_env(3, &spec(), None).await;

    assert!(matches!(result, Err(ProvisionError::FundingAccount(_))));
    assert!(ledger.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_funding_account_is_fatal() {
    let config = config().with_funding_account(FundingAccount::new("genesis", "snoPBr"));
    let (ledger, pipeline) = pipeline(ScriptedLedger::new(), config);

    let error = pipeline.setup_env(1, &spec(), None).await.unwrap_err();

    assert!(error.is_fatal());
    assert!(ledger.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_trustline_retries_converge_with_growing_backoff() {
    let ledger = ScriptedLedger::new().script("TrustSet", rejections("terRETRY", 3));
    let (ledger, pipeline) = pipeline(ledger, config());

    let batch = pipeline
        .setup_env(1, &spec(), None)
        .await
        .unwrap()
        .into_batch()
        .unwrap();

    let receipt = &batch.receipts[0];
    assert_eq!(receipt.attempts, 4);
    assert_eq!(
        receipt.waits,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8),
        ]
    );
    assert_eq!(ledger.submissions("TrustSet").len(), 4);

    // Always the same account
    let holders: HashSet<_> = ledger
        .submissions("TrustSet")
        .iter()
        .map(|tx| tx["Account"].clone())
        .collect();
    assert_eq!(holders.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_resets_between_accounts() {
    let ledger = ScriptedLedger::new().script("TrustSet", rejections("terQUEUED", 2));
    let (_ledger, pipeline) = pipeline(ledger, config());

    let batch = pipeline
        .setup_env(2, &spec(), None)
        .await
        .unwrap()
        .into_batch()
        .unwrap();

    assert_eq!(
        batch.receipts[0].waits,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
    assert_eq!(batch.receipts[1].waits, vec![Duration::from_secs(1)]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_engine_result_is_transient() {
    let ledger = ScriptedLedger::new().script("TrustSet", [Scripted::MissingEngineResult]);
    let (_ledger, pipeline) = pipeline(ledger, config());

    let batch = pipeline
        .setup_env(1, &spec(), None)
        .await
        .unwrap()
        .into_batch()
        .unwrap();

    assert_eq!(batch.receipts[0].attempts, 2);
}

#[tokio::test(start_paused = true)]
async fn test_permanent_trustline_rejection_hits_ceiling() {
    let ledger = ScriptedLedger::new().script("TrustSet", rejections("tecNO_PERMISSION", 50));
    let (ledger, pipeline) = pipeline(ledger, config().with_max_attempts(10, 3));

    let outcome = pipeline.setup_env(1, &spec(), None).await.unwrap();

    assert_eq!(outcome.progress().accounts_funded(), 1);
    assert_eq!(outcome.progress().trustlines_established(), 0);
    assert!(matches!(
        expect_failed(outcome),
        ProvisionError::ProvisioningTimeout {
            phase: Phase::Trustline,
            attempts: 3
        }
    ));
    assert_eq!(ledger.submissions("TrustSet").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_funding_rejections_hit_ceiling() {
    let ledger = ScriptedLedger::new().script("Payment", rejections("tecUNFUNDED_PAYMENT", 50));
    let (ledger, pipeline) = pipeline(ledger, config().with_max_attempts(4, 10));

    let outcome = pipeline.setup_env(2, &spec(), None).await.unwrap();

    assert_eq!(outcome.progress().accounts_funded(), 0);
    assert!(matches!(
        expect_failed(outcome),
        ProvisionError::ProvisioningTimeout {
            phase: Phase::Funding,
            attempts: 4
        }
    ));
    assert_eq!(ledger.wallets_issued(), 4);
    assert!(ledger.submissions("TrustSet").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_stops_retries() {
    let ledger = ScriptedLedger::new().script("TrustSet", rejections("terQUEUED", 100));
    let config = config()
        .with_max_attempts(100, 100)
        .with_deadline(Duration::from_secs(20));
    let (_ledger, pipeline) = pipeline(ledger, config);

    let error = expect_failed(pipeline.setup_env(1, &spec(), None).await.unwrap());

    assert!(matches!(
        error,
        ProvisionError::DeadlineExceeded {
            phase: Phase::Trustline,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start_submits_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let (ledger, pipeline) = pipeline(ScriptedLedger::new(), config());
    let pipeline = pipeline.with_cancellation(token);

    let error = expect_failed(pipeline.setup_env(2, &spec(), None).await.unwrap());

    assert!(matches!(error, ProvisionError::Cancelled(Phase::Funding)));
    assert!(ledger.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_busy_server_during_trustlines_is_retried() {
    let ledger = ScriptedLedger::new().script("TrustSet", [Scripted::server_error("tooBusy")]);
    let (ledger, pipeline) = pipeline(ledger, config());

    let batch = pipeline
        .setup_env(1, &spec(), None)
        .await
        .unwrap()
        .into_batch()
        .unwrap();

    assert_eq!(batch.receipts[0].attempts, 2);
    assert_eq!(
        batch.receipts[0].waits,
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
    assert_eq!(ledger.submissions("TrustSet").len(), 2);
    assert_eq!(ledger.wallets_issued(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_funding_calls_regenerate_identity() {
    let ledger = ScriptedLedger::new().script(
        "Payment",
        [
            Scripted::server_error("noCurrent"),
            Scripted::TransportFailure,
        ],
    );
    let (ledger, pipeline) = pipeline(ledger, config());

    let batch = pipeline
        .setup_env(1, &spec(), None)
        .await
        .unwrap()
        .into_batch()
        .unwrap();

    assert_eq!(ledger.wallets_issued(), 3);
    assert_eq!(ledger.submissions("Payment").len(), 3);
    assert_eq!(
        ledger.funded_accounts(),
        vec![batch.accounts[0].address().to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_persistent_server_errors_hit_ceiling() {
    let ledger = ScriptedLedger::new().script(
        "TrustSet",
        vec![Scripted::server_error("tooBusy"); 50],
    );
    let (ledger, pipeline) = pipeline(ledger, config().with_max_attempts(10, 3));

    let error = expect_failed(pipeline.setup_env(1, &spec(), None).await.unwrap());

    assert!(matches!(
        error,
        ProvisionError::ProvisioningTimeout {
            phase: Phase::Trustline,
            attempts: 3
        }
    ));
    assert_eq!(ledger.submissions("TrustSet").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_gate_transport_error_reported_not_raised() {
    let (_ledger, pipeline) = pipeline(ScriptedLedger::new().failing("ledger"), config());

    let outcome = pipeline.setup_env(2, &spec(), None).await.unwrap();

    assert!(!outcome.is_complete());
    assert!(outcome.progress().is_complete());
    assert!(matches!(
        expect_failed(outcome),
        ProvisionError::Rpc {
            phase: Phase::Convergence,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_gate_times_out_on_stalled_ledger() {
    let (_ledger, pipeline) = pipeline(ScriptedLedger::new().frozen(), config());

    let outcome = pipeline.setup_env(1, &spec(), None).await.unwrap();

    // Counters are complete, but the state was never observed as final
    assert!(outcome.progress().is_complete());
    assert!(matches!(
        expect_failed(outcome),
        ProvisionError::GateTimeout { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_gate_force_close_on_standalone_ledger() {
    let config = config().with_gate(GateConfig {
        force_close: true,
        ..GateConfig::default()
    });
    let (ledger, pipeline) = pipeline(ScriptedLedger::new().frozen(), config);

    let batch = pipeline
        .setup_env(1, &spec(), None)
        .await
        .unwrap()
        .into_batch()
        .unwrap();

    assert_eq!(ledger.count("ledger_accept"), 1);
    assert_eq!(batch.validated_ledger.0, ledger.validated_index());
}

#[tokio::test(start_paused = true)]
async fn test_verification_queries_every_account() {
    let (ledger, pipeline) = pipeline(ScriptedLedger::new(), config().with_verification(true));

    let outcome = pipeline.setup_env(3, &spec(), None).await.unwrap();

    assert!(outcome.is_complete());
    assert_eq!(ledger.count("account_lines"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_trustline_limit_override() {
    let (ledger, pipeline) = pipeline(ScriptedLedger::new(), config().with_verification(true));

    let outcome = pipeline.setup_env(2, &spec(), Some("5e9")).await.unwrap();

    assert!(outcome.is_complete());
    for tx in ledger.submissions("TrustSet") {
        assert_eq!(tx["LimitAmount"]["value"], "5e9");
        assert_eq!(tx["LimitAmount"]["issuer"], ISSUER);
    }
}

#[tokio::test(start_paused = true)]
async fn test_invalid_inputs_rejected_before_any_call() {
    let (ledger, pipeline) = pipeline(ScriptedLedger::new(), config());

    assert!(matches!(
        pipeline.setup_env(0, &spec(), None).await,
        Err(ProvisionError::InvalidTarget)
    ));
    assert!(matches!(
        pipeline.setup_env(1, &spec(), Some("unlimited")).await,
        Err(ProvisionError::InvalidTrustline(_))
    ));
    assert!(ledger.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_bounded_concurrency_keeps_counts_exact() {
    let ledger = ScriptedLedger::new()
        .script("Payment", rejections("telINSUF_FEE_P", 3))
        .script("TrustSet", rejections("terQUEUED", 5));
    let (ledger, pipeline) = pipeline(ledger, config().with_concurrency(4));

    let batch = pipeline
        .setup_env(10, &spec(), None)
        .await
        .unwrap()
        .into_batch()
        .unwrap();

    assert_eq!(batch.accounts.len(), 10);
    assert_eq!(batch.receipts.len(), 10);
    assert_eq!(ledger.funded_accounts().len(), 10);
    assert_eq!(ledger.wallets_issued(), 13);
    assert_eq!(ledger.submissions("TrustSet").len(), 15);

    let addresses: HashSet<_> = batch.accounts.iter().map(|a| a.address().clone()).collect();
    assert_eq!(addresses.len(), 10);
}
