//! TOML configuration file for provisioning runs.
//!
//! ```toml
//! [funding]
//! address = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"
//! secret = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb"
//! amount = "1000000000"
//!
//! [backoff]
//! base_wait = "1s"
//! factor = 1.5
//! max_wait = "1m"
//! max_funding_attempts = 20
//! max_trustline_attempts = 20
//!
//! [run]
//! deadline = "10m"
//! concurrency = 4
//! verify_trustlines = true
//!
//! [gate]
//! poll_interval = "1s"
//! timeout = "30s"
//! force_close = false
//! ```
//!
//! Every section and field is optional; missing values keep the defaults.

use conformance_provisions::{FundingAccount, ProvisionConfig};
use conformance_types::Drops;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Errors while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid duration for {field}: {source}")]
    Duration {
        field: &'static str,
        #[source]
        source: humantime::DurationError,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    funding: Option<FundingSection>,
    #[serde(default)]
    backoff: BackoffSection,
    #[serde(default)]
    run: RunSection,
    #[serde(default)]
    gate: GateSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FundingSection {
    address: String,
    secret: String,
    #[serde(default)]
    amount: Option<Drops>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BackoffSection {
    base_wait: Option<String>,
    factor: Option<f64>,
    max_wait: Option<String>,
    max_funding_attempts: Option<u32>,
    max_trustline_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunSection {
    deadline: Option<String>,
    concurrency: Option<usize>,
    verify_trustlines: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GateSection {
    poll_interval: Option<String>,
    timeout: Option<String>,
    force_close: Option<bool>,
}

impl FileConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Overlay the file's values on `config`.
    pub fn apply(self, mut config: ProvisionConfig) -> Result<ProvisionConfig, ConfigError> {
        if let Some(funding) = self.funding {
            config.funding_account = Some(FundingAccount::new(funding.address, funding.secret));
            if let Some(amount) = funding.amount {
                config.funding_amount = amount;
            }
        }

        if let Some(wait) = parse_duration("backoff.base_wait", self.backoff.base_wait)? {
            config.base_wait = wait;
        }
        if let Some(factor) = self.backoff.factor {
            config.backoff_factor = factor;
        }
        if let Some(wait) = parse_duration("backoff.max_wait", self.backoff.max_wait)? {
            config.max_wait = wait;
        }
        if let Some(attempts) = self.backoff.max_funding_attempts {
            config.max_funding_attempts = attempts;
        }
        if let Some(attempts) = self.backoff.max_trustline_attempts {
            config.max_trustline_attempts = attempts;
        }

        if let Some(deadline) = parse_duration("run.deadline", self.run.deadline)? {
            config.deadline = Some(deadline);
        }
        if let Some(concurrency) = self.run.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(verify) = self.run.verify_trustlines {
            config.verify_trustlines = verify;
        }

        if let Some(interval) = parse_duration("gate.poll_interval", self.gate.poll_interval)? {
            config.gate.poll_interval = interval;
        }
        if let Some(timeout) = parse_duration("gate.timeout", self.gate.timeout)? {
            config.gate.timeout = timeout;
        }
        if let Some(force_close) = self.gate.force_close {
            config.gate.force_close = force_close;
        }

        Ok(config)
    }
}

fn parse_duration(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|s| humantime::parse_duration(&s))
        .transpose()
        .map_err(|source| ConfigError::Duration { field, source })
}
