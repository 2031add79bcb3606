//! Types for RPC client communication.

use conformance_types::EngineResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single JSON-RPC request.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Vec<Value>,
}

impl RpcRequest {
    /// Request with one parameter object.
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params: vec![params],
        }
    }

    /// The first parameter object, if any.
    pub fn first_param(&self) -> Option<&Value> {
        self.params.first()
    }
}

/// Response from `wallet_propose`.
#[derive(Debug, Deserialize)]
pub(crate) struct WalletProposeResponse {
    pub account_id: String,
    pub master_seed: String,
}

/// Response from `submit`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubmitResponse {
    #[serde(default)]
    pub engine_result: Option<String>,
    #[serde(default)]
    pub engine_result_message: Option<String>,
    #[serde(default)]
    pub tx_json: Option<SubmittedTx>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubmittedTx {
    #[serde(default)]
    pub hash: Option<String>,
}

/// Result of a transaction submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// Engine result code, if the server reported one.
    pub engine_result: Option<EngineResult>,
    /// Human-readable explanation of the code.
    pub message: Option<String>,
    /// Transaction hash.
    pub hash: Option<String>,
    /// The full `result` object, kept for logging malformed responses.
    pub raw: Value,
}

impl SubmitOutcome {
    /// Check if the submission was accepted.
    pub fn is_success(&self) -> bool {
        self.engine_result
            .as_ref()
            .is_some_and(EngineResult::is_success)
    }
}

/// One entry of an `account_lines` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrustLine {
    /// The counterparty (issuer) of the line.
    pub account: String,
    pub currency: String,
    #[serde(default)]
    pub balance: String,
    pub limit: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountLinesResponse {
    #[serde(default)]
    pub lines: Vec<TrustLine>,
}

/// Response from `server_info`.
#[derive(Debug, Deserialize)]
pub(crate) struct ServerInfoResponse {
    pub info: ServerInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerInfo {
    #[serde(default)]
    pub server_state: Option<String>,
    #[serde(default)]
    pub complete_ledgers: Option<String>,
}

impl ServerInfo {
    /// Synced enough to accept submissions.
    pub fn is_ready(&self) -> bool {
        match self.server_state.as_deref() {
            Some(state) => matches!(state, "full" | "proposing" | "validating" | "standalone"),
            // API servers report no consensus state, only the ledgers they hold.
            None => self
                .complete_ledgers
                .as_deref()
                .is_some_and(|ledgers| !ledgers.is_empty() && ledgers != "empty"),
        }
    }
}
