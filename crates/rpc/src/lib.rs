//! JSON-RPC client shim for the ledger servers under test.
//!
//! Every call is a single `{"method", "params"}` POST to one endpoint and
//! yields the decoded `result` object. The servers themselves (full node or
//! read-optimized API server) are treated as black boxes.
//!
//! # Components
//!
//! - [`RpcTransport`] - One request in, one `result` object out
//! - [`HttpTransport`] - `reqwest`-backed transport for a live endpoint
//! - [`RpcClient`] - Typed wrappers for the handful of methods the harness uses

mod client;
mod error;
mod transport;
mod types;

pub use client::RpcClient;
pub use error::RpcError;
pub use transport::{extract_result, HttpTransport, RpcTransport, DEFAULT_REQUEST_TIMEOUT};
pub use types::{RpcRequest, SubmitOutcome, TrustLine};
