//! Ledger value types for the conformance harness.
//!
//! These types describe the small slice of the ledger protocol the harness
//! touches directly: account addresses and their seed credentials, native
//! currency amounts, trust line definitions, ledger positions and the engine
//! result codes a server reports for a submitted transaction.
//!
//! Everything else about the protocol lives inside the servers under test.

mod account;
mod engine_result;
mod error;
mod identifiers;
mod trustline;

pub use account::{ProvisionedAccount, Secret};
pub use engine_result::{EngineResult, EngineResultClass};
pub use error::TypeError;
pub use identifiers::{Address, Drops, LedgerIndex};
pub use trustline::{CurrencyCode, TrustlineSpec};
