//! Account credentials.

use crate::{Address, TypeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seed credential that signs for an account.
///
/// Never printed: `Debug` and `Display` redact the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Secret(String);

impl Secret {
    /// Wrap a seed string, rejecting empty or whitespace-only input.
    pub fn new(seed: impl Into<String>) -> Result<Self, TypeError> {
        let seed = seed.into();
        if seed.trim().is_empty() {
            return Err(TypeError::InvalidSecret("empty seed"));
        }
        if seed.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidSecret("seed contains whitespace"));
        }
        Ok(Self(seed))
    }

    /// Expose the seed for inclusion in a signing request.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Secret {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Secret> for String {
    fn from(secret: Secret) -> Self {
        secret.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// A ledger identity created and funded by the provisioning pipeline.
///
/// Immutable once created. Ownership passes to the caller when the batch
/// completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedAccount {
    address: Address,
    secret: Secret,
}

impl ProvisionedAccount {
    /// Pair an address with the seed that signs for it.
    pub fn new(address: Address, secret: Secret) -> Self {
        Self { address, secret }
    }

    /// The account address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The seed credential.
    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}
