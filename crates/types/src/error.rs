//! Error types for ledger value parsing.

use thiserror::Error;

/// Errors raised when a string cannot be turned into a ledger value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Not a classic `r...` account address.
    #[error("Invalid address {0:?}")]
    InvalidAddress(String),

    /// Empty or otherwise unusable seed credential.
    #[error("Invalid secret: {0}")]
    InvalidSecret(&'static str),

    /// Neither a 3-character standard code nor a 40-hex code.
    #[error("Invalid currency code {0:?}")]
    InvalidCurrency(String),

    /// Trust line limit that is not a non-negative decimal number.
    #[error("Invalid trust line limit {0:?}")]
    InvalidLimit(String),
}
