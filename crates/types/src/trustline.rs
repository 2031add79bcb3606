//! Trust line definitions.

use crate::{Address, TypeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-native currency code.
///
/// Either a 3-character standard code (anything but `XRP`) or a
/// 40-character hex code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and validate a currency code.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let standard = s.len() == 3
            && !s.eq_ignore_ascii_case("XRP")
            && s.chars().all(|c| c.is_ascii_alphanumeric() || "?!@#$%^&*<>(){}[]|".contains(c));
        let hex = s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit());

        if standard || hex {
            Ok(Self(s.to_string()))
        } else {
            Err(TypeError::InvalidCurrency(s.to_string()))
        }
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The credit line every provisioned account establishes.
///
/// Shared read-only input to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustlineSpec {
    /// Currency held on the line.
    pub currency: CurrencyCode,
    /// Account issuing the currency.
    pub issuer: Address,
    /// Maximum the holder accepts, as a decimal string.
    pub limit: String,
}

impl TrustlineSpec {
    /// Create a spec, validating the limit.
    pub fn new(
        currency: CurrencyCode,
        issuer: Address,
        limit: impl Into<String>,
    ) -> Result<Self, TypeError> {
        let limit = validate_limit(limit.into())?;
        Ok(Self {
            currency,
            issuer,
            limit,
        })
    }

    /// Same spec with a different limit.
    pub fn with_limit(&self, limit: impl Into<String>) -> Result<Self, TypeError> {
        Self::new(self.currency.clone(), self.issuer.clone(), limit)
    }
}

fn validate_limit(limit: String) -> Result<String, TypeError> {
    match limit.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(limit),
        _ => Err(TypeError::InvalidLimit(limit)),
    }
}
