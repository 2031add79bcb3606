//! Bulk account and trust line provisioning for conformance scenarios.
//!
//! Large scenarios (hundreds of accounts before an AMM test, for example)
//! need a known starting state: N independent accounts, each funded and each
//! holding the same trust line. Servers under load reject submissions now and
//! then, so every step retries until it succeeds or its budget runs out.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ AccountProvisioner                                          │
//! │                                                             │
//! │   per slot: wallet_propose → Payment → wait(base)           │
//! │     accepted → keep identity, count funded                  │
//! │     rejected → discard identity, generate a new one         │
//! └─────────────────────────────────────────────────────────────┘
//!                     │  exactly N accounts
//!                     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ TrustlineEstablisher                                        │
//! │                                                             │
//! │   per account: TrustSet → wait(backoff)                     │
//! │     accepted → receipt, count trust line                    │
//! │     rejected / no engine_result → grow backoff, resubmit    │
//! └─────────────────────────────────────────────────────────────┘
//!                     │  exactly N trust lines
//!                     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ ConvergenceGate                                             │
//! │                                                             │
//! │   poll validated ledger until it passes the entry index     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every retry loop is bounded by a per-operation attempt ceiling and by the
//! run's [`Budget`] (deadline plus cancellation).
//!
//! # Components
//!
//! - [`ProvisioningPipeline`] - Runs the three phases via `setup_env`
//! - [`ProvisionConfig`] - Funding source, backoff, ceilings, concurrency
//! - [`BatchProgress`] - Funded / established counters for one run
//! - [`SetupOutcome`] - Completed batch or reported failure

mod accounts;
mod backoff;
mod config;
mod error;
mod gate;
mod pipeline;
mod progress;
mod trustlines;
pub mod tx;

pub use accounts::{AccountProvisioner, FundingSource};
pub use backoff::{Backoff, Budget};
pub use config::{FundingAccount, GateConfig, ProvisionConfig, GENESIS_ADDRESS, GENESIS_SECRET};
pub use error::{Phase, ProvisionError};
pub use gate::ConvergenceGate;
pub use pipeline::{ProvisionedBatch, ProvisioningPipeline, SetupOutcome};
pub use progress::BatchProgress;
pub use trustlines::{TrustlineEstablisher, TrustlineReceipt};
