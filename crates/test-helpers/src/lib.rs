//! Test helpers for the conformance harness.
//!
//! [`ScriptedLedger`] is an in-memory stand-in for a ledger server. It
//! answers the handful of RPC methods the harness uses, lets a test script
//! the engine result of each submission per transaction type, and records
//! every request for later assertions.

use async_trait::async_trait;
use conformance_rpc::{extract_result, RpcError, RpcRequest, RpcTransport};
use conformance_types::EngineResult;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};

/// Base58 alphabet used for generated addresses.
const LEDGER_ALPHABET: &[u8] = b"rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz";

/// Validated ledger index of a fresh [`ScriptedLedger`].
pub const INITIAL_VALIDATED_LEDGER: u64 = 2;

/// Scripted response to one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// Reply with this engine result. `tesSUCCESS` applies the transaction.
    Engine(String),
    /// Reply with a `result` object that has no `engine_result`.
    MissingEngineResult,
    /// Fail the call at the transport level (HTTP 503).
    TransportFailure,
    /// Reply with `status: error` and this error code, as a busy server does.
    ServerError(String),
}

impl Scripted {
    /// Reply with `code`.
    pub fn engine(code: &str) -> Self {
        Scripted::Engine(code.to_string())
    }

    /// Reply with `tesSUCCESS`.
    pub fn success() -> Self {
        Scripted::engine(EngineResult::SUCCESS)
    }

    /// Reply with server error `code` (`tooBusy`, `noCurrent`, ...).
    pub fn server_error(code: &str) -> Self {
        Scripted::ServerError(code.to_string())
    }
}

#[derive(Default)]
struct LedgerState {
    /// Pending outcomes per transaction type; empty means success.
    scripts: HashMap<String, VecDeque<Scripted>>,
    /// Methods that always fail at the transport level.
    failing: HashSet<String>,
    requests: Vec<RpcRequest>,
    wallets_issued: u64,
    validated: u64,
    /// When frozen, polling the validated ledger does not close a ledger.
    frozen: bool,
    funded: Vec<String>,
    trust_lines: HashMap<String, Vec<Value>>,
}

/// In-memory ledger server implementing [`RpcTransport`].
///
/// Each `ledger` (validated) poll closes one ledger unless the ledger is
/// [`frozen`](Self::frozen); `ledger_accept` always closes one.
pub struct ScriptedLedger {
    state: Mutex<LedgerState>,
}

impl Default for ScriptedLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLedger {
    /// A ledger that accepts every submission.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                validated: INITIAL_VALIDATED_LEDGER,
                ..Default::default()
            }),
        }
    }

    /// Queue outcomes for submissions of `tx_type` (`Payment`, `TrustSet`).
    ///
    /// Outcomes are consumed in order; once exhausted, submissions succeed.
    pub fn script(self, tx_type: &str, outcomes: impl IntoIterator<Item = Scripted>) -> Self {
        self.state
            .lock()
            .scripts
            .entry(tx_type.to_string())
            .or_default()
            .extend(outcomes);
        self
    }

    /// Make every call to `method` fail at the transport level.
    pub fn failing(self, method: &str) -> Self {
        self.state.lock().failing.insert(method.to_string());
        self
    }

    /// Stop closing ledgers on validated-ledger polls.
    pub fn frozen(self) -> Self {
        self.state.lock().frozen = true;
        self
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<RpcRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of requests for `method`.
    pub fn count(&self, method: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    /// `tx_json` of every submission of `tx_type`, in order.
    pub fn submissions(&self, tx_type: &str) -> Vec<Value> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == "submit")
            .filter_map(|r| r.first_param().map(|p| p["tx_json"].clone()))
            .filter(|tx| tx["TransactionType"] == tx_type)
            .collect()
    }

    /// Identities handed out by `wallet_propose`.
    pub fn wallets_issued(&self) -> u64 {
        self.state.lock().wallets_issued
    }

    /// Destinations of accepted payments.
    pub fn funded_accounts(&self) -> Vec<String> {
        self.state.lock().funded.clone()
    }

    /// Trust lines held by `address`, as `account_lines` entries.
    pub fn trust_lines(&self, address: &str) -> Vec<Value> {
        self.state
            .lock()
            .trust_lines
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    /// Current validated ledger index.
    pub fn validated_index(&self) -> u64 {
        self.state.lock().validated
    }

    fn respond(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        if state.failing.contains(&request.method) {
            return Err(RpcError::Status(503));
        }

        let params = request.first_param().cloned().unwrap_or(Value::Null);
        let body = match request.method.as_str() {
            "wallet_propose" => {
                state.wallets_issued += 1;
                let n = state.wallets_issued;
                json!({ "result": {
                    "status": "success",
                    "account_id": generated_address(n),
                    "master_seed": format!("sScripted{}", n),
                }})
            }
            "submit" => return submit(&mut state, &params),
            "ledger" => {
                let index = state.validated;
                if !state.frozen {
                    state.validated += 1;
                }
                json!({ "result": { "status": "success", "ledger_index": index, "validated": true } })
            }
            "ledger_current" => {
                json!({ "result": { "status": "success", "ledger_current_index": state.validated + 1 } })
            }
            "ledger_accept" => {
                state.validated += 1;
                json!({ "result": { "status": "success", "ledger_current_index": state.validated + 1 } })
            }
            "account_lines" => {
                let account = params["account"].as_str().unwrap_or_default();
                let peer = params["peer"].as_str();
                let lines: Vec<Value> = state
                    .trust_lines
                    .get(account)
                    .into_iter()
                    .flatten()
                    .filter(|line| peer.map_or(true, |p| line["account"] == p))
                    .cloned()
                    .collect();
                json!({ "result": { "status": "success", "account": account, "lines": lines } })
            }
            "server_info" => {
                json!({ "result": { "status": "success", "info": { "server_state": "full" } } })
            }
            _ => json!({ "result": { "status": "error", "error": "unknownCmd" } }),
        };

        extract_result(&request.method, body)
    }
}

fn submit(state: &mut LedgerState, params: &Value) -> Result<Value, RpcError> {
    let tx = params["tx_json"].clone();
    let tx_type = tx["TransactionType"].as_str().unwrap_or_default().to_string();
    let outcome = state
        .scripts
        .get_mut(&tx_type)
        .and_then(VecDeque::pop_front)
        .unwrap_or_else(Scripted::success);

    let code = match outcome {
        Scripted::TransportFailure => return Err(RpcError::Status(503)),
        Scripted::MissingEngineResult => {
            return extract_result("submit", json!({ "result": { "status": "success" } }))
        }
        Scripted::ServerError(error) => {
            return extract_result(
                "submit",
                json!({ "result": {
                    "status": "error",
                    "error": error,
                    "error_message": "Scripted server error",
                }}),
            )
        }
        Scripted::Engine(code) => code,
    };

    if code == EngineResult::SUCCESS {
        apply(state, &tx_type, &tx);
    }

    let hash = format!("{:064X}", state.requests.len());
    extract_result(
        "submit",
        json!({ "result": {
            "status": "success",
            "engine_result": code,
            "engine_result_message": format!("Scripted {}", code),
            "tx_json": { "hash": hash },
        }}),
    )
}

fn apply(state: &mut LedgerState, tx_type: &str, tx: &Value) {
    match tx_type {
        "Payment" => {
            if let Some(destination) = tx["Destination"].as_str() {
                state.funded.push(destination.to_string());
            }
        }
        "TrustSet" => {
            let holder = tx["Account"].as_str().unwrap_or_default().to_string();
            let limit = &tx["LimitAmount"];
            state.trust_lines.entry(holder).or_default().push(json!({
                "account": limit["issuer"],
                "currency": limit["currency"],
                "balance": "0",
                "limit": limit["value"],
            }));
        }
        _ => {}
    }
}

/// Deterministic, distinct, well-formed address for the `n`th wallet.
fn generated_address(mut n: u64) -> String {
    const LEN: usize = 34;
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(LEDGER_ALPHABET[(n % 58) as usize] as char);
        n /= 58;
    }

    let mut address = String::from("rScripted");
    let padding = LEN - address.len() - digits.len();
    address.extend(std::iter::repeat('r').take(padding));
    address.extend(digits.into_iter().rev());
    address
}

#[async_trait]
impl RpcTransport for ScriptedLedger {
    async fn call(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        self.respond(request)
    }
}
