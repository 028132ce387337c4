//! Chain-specific types and error definitions.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the database chain.
#[derive(Debug, Error)]
pub enum BluzelleError {
    /// The address derived from the mnemonic differs from the expected one.
    #[error("Mnemonic does not match address: expected {expected}, derived {derived}")]
    CredentialMismatch { expected: String, derived: String },

    /// Account data could not be read from the network.
    #[error("Failed to initialize session: {0}")]
    Initialization(String),

    /// Lease duration resolved to a negative value.
    #[error("Invalid lease: {0} seconds")]
    InvalidLease(i64),

    /// The chain reported that the requested key is absent.
    #[error("Key does not exist")]
    KeyNotFound,

    /// A create was rejected because the key is already present.
    #[error("Key already exists")]
    KeyAlreadyExists,

    /// Sequence resynchronization did not converge within the retry budget.
    #[error("Invalid chain id or session: sequence did not recover after {0} retries")]
    InvalidChainSession(u32),

    /// Any other chain-reported failure, with the extracted message.
    #[error("Transaction execution failed: {0}")]
    TransactionExecution(String),

    /// Transaction request type is not an HTTP verb the REST gateway accepts.
    #[error("HTTP method {0} is unsupported")]
    UnsupportedMethod(String),

    /// Mnemonic or key material could not be used.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// A query returned a non-success HTTP status.
    #[error("Query {path} failed with status {status}: {body}")]
    Query {
        path: String,
        status: u16,
        body: String,
    },

    /// Response was valid JSON but not of the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Caller supplied an argument the network cannot accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The transaction worker is no longer running.
    #[error("Transaction queue is closed")]
    QueueClosed,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for database operations.
pub type BluzelleResult<T> = Result<T, BluzelleError>;

/// Account number and sequence of the session address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountState {
    pub account_number: u64,
    pub sequence: u64,
}

/// A coin balance as reported by the auth module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

/// Account data returned by `auth/accounts/<address>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountData {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub public_key: Option<serde_json::Value>,
    #[serde(deserialize_with = "u64_from_string_or_number")]
    pub account_number: u64,
    #[serde(deserialize_with = "u64_from_string_or_number")]
    pub sequence: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub coins: Vec<Coin>,
}

impl AccountData {
    pub fn state(&self) -> AccountState {
        AccountState {
            account_number: self.account_number,
            sequence: self.sequence,
        }
    }
}

/// Cosmos REST renders 64-bit integers as JSON strings; accept both forms.
pub(crate) fn u64_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Coin>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Coin>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Outcome of a submitted transaction, as classified from the `txs` response.
#[derive(Debug, Clone, PartialEq)]
pub enum TxOutcome {
    /// Included in a block; carries the hex `data` payload, still undecoded.
    Committed(String),
    /// The chain reported the key as absent.
    KeyNotFound,
    /// Signature did not verify, usually a stale sequence.
    StaleSequence,
    /// Any other chain error, with the human-readable part of `raw_log`.
    Failed(String),
}
