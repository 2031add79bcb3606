//! Domain-specific identifier types.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base58 alphabet used by the ledger for account addresses.
const LEDGER_ALPHABET: &str = "rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz";

/// Classic account address (`r...`).
///
/// Only the textual shape is validated: prefix, length and alphabet. The
/// checksum is left to the server, which rejects a bad one on submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Shortest encoding of a 20-byte account id.
    pub const MIN_LEN: usize = 25;
    /// Longest encoding of a 20-byte account id.
    pub const MAX_LEN: usize = 35;

    /// Parse and validate an address.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let valid = s.starts_with('r')
            && (Self::MIN_LEN..=Self::MAX_LEN).contains(&s.len())
            && s.chars().all(|c| LEDGER_ALPHABET.contains(c));

        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(TypeError::InvalidAddress(s.to_string()))
        }
    }

    /// Get the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ledger sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerIndex(pub u64);

impl LedgerIndex {
    /// Get the next ledger index.
    pub fn next(self) -> Self {
        LedgerIndex(self.0 + 1)
    }
}

impl fmt::Display for LedgerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ledger({})", self.0)
    }
}

/// Amount of native currency in drops.
///
/// The wire format is a decimal string, not a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Drops(pub u64);

impl Drops {
    /// Drops per whole unit of native currency.
    pub const PER_UNIT: u64 = 1_000_000;

    /// Amount from whole units.
    pub fn from_units(units: u64) -> Self {
        Drops(units.saturating_mul(Self::PER_UNIT))
    }

    /// Get the raw value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Drops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Drops {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Drops {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(Drops(n)),
            Repr::Text(s) => s.parse().map(Drops).map_err(serde::de::Error::custom),
        }
    }
}
