//! Engine result codes reported for submitted transactions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad class of an engine result, derived from its three-letter prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineResultClass {
    /// `tes`: applied.
    Success,
    /// `tec`: included in a ledger for the fee only.
    Claimed,
    /// `ter`: not applied yet, may succeed later.
    Retry,
    /// `tef`: failed against the current ledger state.
    Failure,
    /// `tem`: malformed transaction.
    Malformed,
    /// `tel`: rejected by the local server (load, fee).
    Local,
    /// Anything else.
    Unknown,
}

/// Status code string such as `tesSUCCESS` or `terQUEUED`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineResult(String);

impl EngineResult {
    /// The only code that counts as acceptance.
    pub const SUCCESS: &'static str = "tesSUCCESS";

    /// Wrap a raw code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Shorthand for `tesSUCCESS`.
    pub fn success() -> Self {
        Self::new(Self::SUCCESS)
    }

    /// The raw code.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify by prefix.
    pub fn class(&self) -> EngineResultClass {
        match self.0.get(..3) {
            Some("tes") => EngineResultClass::Success,
            Some("tec") => EngineResultClass::Claimed,
            Some("ter") => EngineResultClass::Retry,
            Some("tef") => EngineResultClass::Failure,
            Some("tem") => EngineResultClass::Malformed,
            Some("tel") => EngineResultClass::Local,
            _ => EngineResultClass::Unknown,
        }
    }

    /// Whether the submission was accepted.
    pub fn is_success(&self) -> bool {
        self.0 == Self::SUCCESS
    }
}

impl fmt::Display for EngineResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
