//! Transaction building, signing, broadcasting and result interpretation.
//!
//! # Responsibilities
//! - Merge caller payloads with session fields and gas directives
//! - Request templates, sign them and broadcast in block mode
//! - Recover from stale sequence numbers within a bounded retry budget
//! - Decode the hex-encoded result of committed transactions
//!
//! # State Machine
//! ```text
//! Build → Sign → Submit → Interpret ─┬→ Done
//!   ▲                                ├→ Fatal
//!   └──────── Retry (sequence moved) ┘
//! ```

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Map, Value};

use crate::blockchain::account::AccountTracker;
use crate::blockchain::client::{RestClient, TxMethod, KEY_NOT_FOUND_MARKER};
use crate::blockchain::gas::GasInfo;
use crate::blockchain::signer::TxSigner;
use crate::blockchain::types::{AccountState, BluzelleError, BluzelleResult, TxOutcome};
use crate::blockchain::wallet::Wallet;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;

/// Marker the chain uses when the signature does not verify.
pub const SIGNATURE_FAILED_MARKER: &str = "signature verification failed";

/// Length of the random memo attached to every transaction.
pub const MEMO_LENGTH: usize = 32;

/// Broadcast mode; the gateway answers once the transaction is in a block.
const BROADCAST_MODE: &str = "block";

/// Session state for submitting transactions as one address.
///
/// Owned by the transaction worker; every method taking `&mut self` runs with
/// no other transaction in flight.
pub struct TxExecutor {
    client: RestClient,
    wallet: Wallet,
    chain_id: String,
    namespace: String,
    account: AccountTracker,
    retry: RetryPolicy,
    default_gas: GasInfo,
}

impl TxExecutor {
    pub fn new(
        client: RestClient,
        wallet: Wallet,
        chain_id: impl Into<String>,
        namespace: impl Into<String>,
        retry: RetryPolicy,
        default_gas: GasInfo,
    ) -> Self {
        let account = AccountTracker::new(wallet.address());
        Self {
            client,
            wallet,
            chain_id: chain_id.into(),
            namespace: namespace.into(),
            account,
            retry,
            default_gas,
        }
    }

    /// Resynchronize account number and sequence from the network.
    pub async fn refresh_account(&mut self) -> BluzelleResult<bool> {
        self.account.refresh(&self.client).await
    }

    /// Run one logical transaction to completion.
    ///
    /// `gas` falls back to the session default when absent. The retry budget
    /// covers every resubmission of this transaction.
    pub async fn execute(
        &mut self,
        payload: Map<String, Value>,
        method: TxMethod,
        command: &str,
        gas: Option<GasInfo>,
    ) -> BluzelleResult<Value> {
        let gas = gas.unwrap_or(self.default_gas);
        let mut budget = self.retry.budget();
        metrics::record_tx_submitted(command);

        'attempt: loop {
            let body = self.build_body(&payload, &gas);
            let mut template = self.client.fetch_template(method, command, &body).await?;
            gas.apply(&mut template)?;

            let memo = generate_memo();
            let envelope = self.sign_template(template, &memo)?;

            tracing::debug!(
                command = %command,
                sequence = self.account.state().sequence,
                "Broadcasting transaction"
            );
            let response = self.client.broadcast(&envelope).await?;

            match interpret(&response) {
                TxOutcome::Committed(data) => {
                    // the chain applied it, so the sequence moves even if data is unreadable
                    self.account.increment_sequence();
                    metrics::record_tx_committed(command);
                    tracing::info!(
                        command = %command,
                        sequence = self.account.state().sequence,
                        "Transaction committed"
                    );
                    return decode_tx_data(&data);
                }
                TxOutcome::KeyNotFound => {
                    metrics::record_tx_failed(command, "key_not_found");
                    return Err(BluzelleError::KeyNotFound);
                }
                TxOutcome::Failed(message) => {
                    metrics::record_tx_failed(command, "execution");
                    tracing::warn!(command = %command, error = %message, "Transaction rejected");
                    return Err(BluzelleError::TransactionExecution(message));
                }
                TxOutcome::StaleSequence => {
                    tracing::warn!(
                        command = %command,
                        sequence = self.account.state().sequence,
                        remaining = budget.remaining(),
                        "Signature verification failed, resynchronizing account"
                    );
                    while budget.wait().await {
                        metrics::record_stale_sequence_retry();
                        if self.account.refresh(&self.client).await? {
                            continue 'attempt;
                        }
                    }

                    metrics::record_tx_failed(command, "stale_sequence");
                    tracing::error!(
                        command = %command,
                        waited_ms = budget.waited().as_millis() as u64,
                        "Sequence did not recover"
                    );
                    return Err(BluzelleError::InvalidChainSession(self.retry.max_retries));
                }
            }
        }
    }

    /// Template request body: payload plus session and gas fields.
    pub fn build_body(&self, payload: &Map<String, Value>, gas: &GasInfo) -> Value {
        let mut body = payload.clone();
        body.insert(
            "BaseReq".to_string(),
            json!({ "from": self.wallet.address(), "chain_id": self.chain_id }),
        );
        body.insert("UUID".to_string(), Value::String(self.namespace.clone()));
        body.insert("Owner".to_string(), Value::String(self.wallet.address().to_string()));
        body.extend(gas.request_fields());
        Value::Object(body)
    }

    /// Attach memo and signature to a template and wrap it for broadcast.
    fn sign_template(&self, template: Value, memo: &str) -> BluzelleResult<Value> {
        let mut tx = match template {
            Value::Object(mut map) => match map.remove("value") {
                Some(Value::Object(tx)) => tx,
                _ => {
                    return Err(BluzelleError::InvalidResponse(
                        "Template has no value object".to_string(),
                    ))
                }
            },
            _ => {
                return Err(BluzelleError::InvalidResponse(
                    "Template is not an object".to_string(),
                ))
            }
        };

        tx.insert("memo".to_string(), Value::String(memo.to_string()));
        let fee = tx.get("fee").cloned().unwrap_or(Value::Null);
        let msgs = tx.get("msg").cloned().unwrap_or(Value::Null);

        let signature = TxSigner::new(&self.wallet, &self.chain_id).sign(
            self.account.state(),
            &fee,
            memo,
            &msgs,
        )?;
        tx.insert("signatures".to_string(), json!([signature]));

        Ok(json!({
            "tx": Value::Object(tx),
            "mode": BROADCAST_MODE,
            "headers": { "Content-type": "application/x-www-form-urlencoded" },
        }))
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    pub fn address(&self) -> &str {
        self.wallet.address()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn account_state(&self) -> AccountState {
        self.account.state()
    }
}

impl std::fmt::Debug for TxExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxExecutor")
            .field("address", &self.wallet.address())
            .field("chain_id", &self.chain_id)
            .field("namespace", &self.namespace)
            .field("account", &self.account.state())
            .finish()
    }
}

/// Classify a broadcast response.
///
/// A response without `code` is committed; its data is decoded by the caller.
pub fn interpret(response: &Value) -> TxOutcome {
    if response.get("code").is_some() {
        let raw_log = match response.get("raw_log") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };

        if raw_log.contains(KEY_NOT_FOUND_MARKER) {
            return TxOutcome::KeyNotFound;
        }
        if raw_log.contains(SIGNATURE_FAILED_MARKER) {
            return TxOutcome::StaleSequence;
        }
        return TxOutcome::Failed(extract_error(&raw_log));
    }

    let data = response.get("data").and_then(Value::as_str).unwrap_or_default();
    TxOutcome::Committed(data.to_string())
}

/// Decode the hex `data` of a committed transaction into JSON.
///
/// Empty data decodes to `null`.
pub fn decode_tx_data(hex_data: &str) -> BluzelleResult<Value> {
    let hex_data = hex_data.trim();
    if hex_data.is_empty() {
        return Ok(Value::Null);
    }

    let bytes = hex::decode(hex_data)
        .map_err(|e| BluzelleError::InvalidResponse(format!("Transaction data is not hex: {}", e)))?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Human-readable part of a chain error log.
///
/// `"unauthorized: Key already exists: failed to execute message"` yields
/// `"Key already exists"`. Insufficient-fee errors keep everything after the
/// prefix. Messages that cannot be segmented are returned whole.
pub fn extract_error(message: &str) -> String {
    let Some(first) = message.find(": ") else {
        return message.to_string();
    };

    let rest = &message[first + 2..];
    if &message[..first] == "insufficient fee" {
        return rest.to_string();
    }

    match rest.find(':') {
        Some(end) if end > 0 => rest[..end].to_string(),
        _ => message.to_string(),
    }
}

/// Fresh random alphanumeric memo.
pub fn generate_memo() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(MEMO_LENGTH)
        .map(char::from)
        .collect()
}
