//! Typed RPC client.

use crate::types::{
    AccountLinesResponse, ServerInfoResponse, SubmitResponse, WalletProposeResponse,
};
use crate::{RpcError, RpcRequest, RpcTransport, SubmitOutcome, TrustLine};
use conformance_types::{Address, EngineResult, LedgerIndex, ProvisionedAccount, Secret};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

/// Typed wrapper over an [`RpcTransport`].
#[derive(Debug, Clone)]
pub struct RpcClient<T> {
    transport: T,
}

impl<T: RpcTransport> RpcClient<T> {
    /// Create a client over the given transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issue a raw request and return its `result` object.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        debug!(method, "RPC request");
        self.transport.call(&RpcRequest::new(method, params)).await
    }

    /// Ask the server for a fresh keypair.
    pub async fn wallet_propose(&self) -> Result<ProvisionedAccount, RpcError> {
        const METHOD: &str = "wallet_propose";

        let response: WalletProposeResponse =
            decode(METHOD, self.request(METHOD, json!({})).await?)?;
        let address =
            Address::parse(&response.account_id).map_err(|e| RpcError::decode(METHOD, e))?;
        let secret = Secret::new(response.master_seed).map_err(|e| RpcError::decode(METHOD, e))?;

        Ok(ProvisionedAccount::new(address, secret))
    }

    /// Sign-and-submit a transaction with the given seed.
    ///
    /// A response without `engine_result` is returned as an outcome with
    /// `engine_result: None`, not as an error; callers decide how to treat it.
    pub async fn submit(&self, tx_json: Value, secret: &Secret) -> Result<SubmitOutcome, RpcError> {
        const METHOD: &str = "submit";

        let raw = self
            .request(
                METHOD,
                json!({ "tx_json": tx_json, "secret": secret.expose() }),
            )
            .await?;
        let response: SubmitResponse = serde_json::from_value(raw.clone()).unwrap_or_default();

        Ok(SubmitOutcome {
            engine_result: response.engine_result.map(EngineResult::new),
            message: response.engine_result_message,
            hash: response.tx_json.and_then(|tx| tx.hash),
            raw,
        })
    }

    /// Index of the current open ledger.
    pub async fn ledger_current(&self) -> Result<LedgerIndex, RpcError> {
        const METHOD: &str = "ledger_current";

        let result = self.request(METHOD, json!({})).await?;
        ledger_index_field(METHOD, &result, "ledger_current_index")
    }

    /// Index of the most recent validated ledger.
    pub async fn validated_ledger(&self) -> Result<LedgerIndex, RpcError> {
        const METHOD: &str = "ledger";

        let result = self
            .request(METHOD, json!({ "ledger_index": "validated" }))
            .await?;
        ledger_index_field(METHOD, &result, "ledger_index").or_else(|_| {
            let header = result.get("ledger").cloned().unwrap_or(Value::Null);
            ledger_index_field(METHOD, &header, "ledger_index")
        })
    }

    /// Force the open ledger to close (standalone servers only).
    ///
    /// Returns the index of the new open ledger.
    pub async fn ledger_accept(&self) -> Result<LedgerIndex, RpcError> {
        const METHOD: &str = "ledger_accept";

        let result = self.request(METHOD, json!({})).await?;
        ledger_index_field(METHOD, &result, "ledger_current_index")
    }

    /// Trust lines held by `address`, optionally filtered to one counterparty.
    pub async fn account_lines(
        &self,
        address: &Address,
        peer: Option<&Address>,
    ) -> Result<Vec<TrustLine>, RpcError> {
        const METHOD: &str = "account_lines";

        let mut params = json!({ "account": address, "ledger_index": "validated" });
        if let Some(peer) = peer {
            params["peer"] = json!(peer);
        }

        let response: AccountLinesResponse = decode(METHOD, self.request(METHOD, params).await?)?;
        Ok(response.lines)
    }

    /// Whether the server is synced and able to take submissions.
    pub async fn server_ready(&self) -> Result<bool, RpcError> {
        const METHOD: &str = "server_info";

        let response: ServerInfoResponse = decode(METHOD, self.request(METHOD, json!({})).await?)?;
        Ok(response.info.is_ready())
    }
}

fn decode<R: DeserializeOwned>(method: &str, result: Value) -> Result<R, RpcError> {
    serde_json::from_value(result).map_err(|e| RpcError::decode(method, e))
}

/// Read a ledger index that may be encoded as a number or a decimal string.
fn ledger_index_field(method: &str, result: &Value, field: &str) -> Result<LedgerIndex, RpcError> {
    let index = match result.get(field) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    };

    index
        .map(LedgerIndex)
        .ok_or_else(|| RpcError::decode(method, format!("missing or invalid {}", field)))
}
