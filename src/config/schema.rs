//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a database
//! session. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::blockchain::gas::GasInfo;

/// Default chain identifier.
pub const DEFAULT_CHAIN_ID: &str = "bluzelle";

/// Default REST gateway of the public testnet.
pub const DEFAULT_ENDPOINT: &str = "http://testnet.public.bluzelle.com:1317";

/// Root configuration for a client session.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Namespace (UUID) every key lives in.
    pub namespace: String,

    /// BIP-39 mnemonic of the signing account.
    pub mnemonic: String,

    /// Address the mnemonic must derive to.
    pub address: String,

    /// Chain identifier included in every signed document.
    pub chain_id: String,

    /// REST gateway base URL.
    pub endpoint: String,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Stale-sequence retry configuration.
    pub retries: RetryConfig,

    /// Gas directive used when an operation supplies none.
    pub gas: GasInfo,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            mnemonic: String::new(),
            address: String::new(),
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeouts: TimeoutConfig::default(),
            retries: RetryConfig::default(),
            gas: GasInfo::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("namespace", &self.namespace)
            .field("mnemonic", &"<redacted>")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("endpoint", &self.endpoint)
            .field("timeouts", &self.timeouts)
            .field("retries", &self.retries)
            .field("gas", &self.gas)
            .field("observability", &self.observability)
            .finish()
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Retry configuration for stale sequence numbers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum account resyncs per logical transaction.
    pub max_retries: u32,

    /// Fixed delay before each resync in milliseconds.
    pub interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            interval_ms: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
