//! Session-bound database client.
//!
//! # Responsibilities
//! - Derive the wallet and check it against the configured address
//! - Answer queries directly against the REST gateway
//! - Funnel every transaction through one serial worker
//!
//! # Design Decisions
//! - Queries run concurrently; transactions never overlap
//! - Cloning the client shares the session and its queue

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::FutureExt;
use serde_json::{Map, Value};

use crate::blockchain::client::{RestClient, TxMethod};
use crate::blockchain::gas::GasInfo;
use crate::blockchain::transaction::TxExecutor;
use crate::blockchain::types::{AccountData, BluzelleError, BluzelleResult};
use crate::blockchain::wallet::Wallet;
use crate::config::ClientConfig;
use crate::database::operation::{Mode, Operation};
use crate::database::types::{
    bool_field, int_field, key_leases_field, key_values_field, keys_field, string_field, KeyLease,
    Lease, BLOCK_TIME_SECS,
};
use crate::resilience::{RetryPolicy, SerialQueue};

/// Client for one namespace, signing as one account.
#[derive(Clone)]
pub struct BluzelleClient {
    rest: RestClient,
    queue: SerialQueue<TxExecutor>,
    namespace: String,
    address: String,
}

impl BluzelleClient {
    /// Open a session: derive keys, verify the address and load the account.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn connect(config: &ClientConfig) -> BluzelleResult<Self> {
        let wallet = Wallet::from_mnemonic_checked(&config.mnemonic, &config.address)?;
        let rest = RestClient::new(
            &config.endpoint,
            Duration::from_secs(config.timeouts.request_secs),
        )?;

        let mut executor = TxExecutor::new(
            rest.clone(),
            wallet,
            config.chain_id.clone(),
            config.namespace.clone(),
            RetryPolicy::from(&config.retries),
            config.gas,
        );
        executor.refresh_account().await?;

        let state = executor.account_state();
        tracing::info!(
            address = %executor.address(),
            namespace = %config.namespace,
            endpoint = %rest.endpoint(),
            account_number = state.account_number,
            sequence = state.sequence,
            "Session established"
        );

        let address = executor.address().to_string();
        Ok(Self {
            rest,
            queue: SerialQueue::spawn(executor),
            namespace: config.namespace.clone(),
            address,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn run(&self, op: Operation, mode: Mode, gas: Option<GasInfo>) -> BluzelleResult<Value> {
        match mode {
            Mode::Query => self.rest.query(op.query_path(&self.namespace)).await,
            Mode::Transaction => self.submit(op.payload, op.method, op.command, gas).await,
        }
    }

    /// Queue a transaction; its position is fixed before this returns a future.
    fn submit(
        &self,
        payload: Map<String, Value>,
        method: TxMethod,
        command: impl Into<String>,
        gas: Option<GasInfo>,
    ) -> impl std::future::Future<Output = BluzelleResult<Value>> + Send + 'static {
        let command = command.into();
        let pending = self.queue.enqueue(move |executor: &mut TxExecutor| {
            async move { executor.execute(payload, method, &command, gas).await }.boxed()
        });
        async move { pending.await? }
    }

    /// Submit an arbitrary transaction.
    ///
    /// `method` is an HTTP verb such as `"post"`; anything else fails before
    /// the transaction is queued.
    pub async fn send_transaction(
        &self,
        payload: Map<String, Value>,
        method: &str,
        command: &str,
        gas: Option<GasInfo>,
    ) -> BluzelleResult<Value> {
        let method: TxMethod = method.parse()?;
        self.submit(payload, method, command, gas).await
    }

    /// GET an arbitrary path relative to the endpoint, e.g. `"node_info"`.
    pub async fn query(&self, path: &str) -> BluzelleResult<Value> {
        self.rest
            .query(path.split('/').filter(|segment| !segment.is_empty()))
            .await
    }

    // Queries

    /// Value of `key`; `prove` requests a proof from the chain.
    pub async fn read(&self, key: &str, prove: bool) -> BluzelleResult<String> {
        let result = self.run(Operation::read(key, prove), Mode::Query, None).await?;
        if result.is_null() {
            return Err(BluzelleError::KeyNotFound);
        }
        string_field(&result, "value")
    }

    pub async fn has(&self, key: &str) -> BluzelleResult<bool> {
        let result = self.run(Operation::has(key), Mode::Query, None).await?;
        bool_field(&result, "has")
    }

    pub async fn keys(&self) -> BluzelleResult<Vec<String>> {
        let result = self.run(Operation::keys(), Mode::Query, None).await?;
        keys_field(&result)
    }

    pub async fn count(&self) -> BluzelleResult<u64> {
        let result = self.run(Operation::count(), Mode::Query, None).await?;
        non_negative(int_field(&result, "count")?, "count")
    }

    pub async fn key_values(&self) -> BluzelleResult<BTreeMap<String, String>> {
        let result = self.run(Operation::key_values(), Mode::Query, None).await?;
        key_values_field(&result)
    }

    /// Remaining lease of `key` in seconds.
    pub async fn get_lease(&self, key: &str) -> BluzelleResult<i64> {
        let result = self.run(Operation::get_lease(key), Mode::Query, None).await?;
        Ok(int_field(&result, "lease")?.saturating_mul(BLOCK_TIME_SECS))
    }

    /// The `n` keys closest to expiry, shortest first.
    pub async fn get_n_shortest_leases(&self, n: i64) -> BluzelleResult<Vec<KeyLease>> {
        let n = checked_count(n)?;
        let result = self
            .run(Operation::get_n_shortest_leases(n), Mode::Query, None)
            .await?;
        key_leases_field(&result)
    }

    /// Account data of the session address.
    pub async fn account(&self) -> BluzelleResult<AccountData> {
        self.rest.get_account(&self.address).await
    }

    /// Application version reported by the node.
    pub async fn version(&self) -> BluzelleResult<String> {
        let info = self.query("node_info").await?;
        info.get("application_version")
            .and_then(|v| v.get("version"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BluzelleError::InvalidResponse("node_info has no application version".to_string()))
    }

    /// Whether the gateway answers at all.
    pub async fn is_healthy(&self) -> bool {
        self.rest.is_healthy().await
    }

    // Transactional reads

    pub async fn tx_read(&self, key: &str, gas: Option<GasInfo>) -> BluzelleResult<String> {
        let result = self.run(Operation::read(key, false), Mode::Transaction, gas).await?;
        if result.is_null() {
            return Err(BluzelleError::KeyNotFound);
        }
        string_field(&result, "value")
    }

    pub async fn tx_has(&self, key: &str, gas: Option<GasInfo>) -> BluzelleResult<bool> {
        let result = self.run(Operation::has(key), Mode::Transaction, gas).await?;
        bool_field(&result, "has")
    }

    pub async fn tx_keys(&self, gas: Option<GasInfo>) -> BluzelleResult<Vec<String>> {
        let result = self.run(Operation::keys(), Mode::Transaction, gas).await?;
        keys_field(&result)
    }

    pub async fn tx_count(&self, gas: Option<GasInfo>) -> BluzelleResult<u64> {
        let result = self.run(Operation::count(), Mode::Transaction, gas).await?;
        non_negative(int_field(&result, "count")?, "count")
    }

    pub async fn tx_key_values(&self, gas: Option<GasInfo>) -> BluzelleResult<BTreeMap<String, String>> {
        let result = self.run(Operation::key_values(), Mode::Transaction, gas).await?;
        key_values_field(&result)
    }

    pub async fn tx_get_lease(&self, key: &str, gas: Option<GasInfo>) -> BluzelleResult<i64> {
        let result = self.run(Operation::get_lease(key), Mode::Transaction, gas).await?;
        Ok(int_field(&result, "lease")?.saturating_mul(BLOCK_TIME_SECS))
    }

    pub async fn tx_get_n_shortest_leases(
        &self,
        n: i64,
        gas: Option<GasInfo>,
    ) -> BluzelleResult<Vec<KeyLease>> {
        let n = checked_count(n)?;
        let result = self
            .run(Operation::get_n_shortest_leases(n), Mode::Transaction, gas)
            .await?;
        key_leases_field(&result)
    }

    // Writes

    /// Create `key`; fails with `KeyAlreadyExists` when it is present.
    pub async fn create(
        &self,
        key: &str,
        value: &str,
        lease: Option<Lease>,
        gas: Option<GasInfo>,
    ) -> BluzelleResult<()> {
        match self.run(Operation::create(key, value, lease), Mode::Transaction, gas).await {
            Ok(_) => Ok(()),
            Err(BluzelleError::TransactionExecution(message)) if message.contains("already exists") => {
                Err(BluzelleError::KeyAlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn update(
        &self,
        key: &str,
        value: &str,
        lease: Option<Lease>,
        gas: Option<GasInfo>,
    ) -> BluzelleResult<()> {
        self.run(Operation::update(key, value, lease), Mode::Transaction, gas)
            .await
            .map(drop)
    }

    /// Update several keys in one transaction.
    pub async fn update_many(
        &self,
        entries: &BTreeMap<String, String>,
        gas: Option<GasInfo>,
    ) -> BluzelleResult<()> {
        let op = Operation::update_many(entries.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        self.run(op, Mode::Transaction, gas).await.map(drop)
    }

    pub async fn delete(&self, key: &str, gas: Option<GasInfo>) -> BluzelleResult<()> {
        self.run(Operation::delete(key), Mode::Transaction, gas)
            .await
            .map(drop)
    }

    pub async fn delete_all(&self, gas: Option<GasInfo>) -> BluzelleResult<()> {
        self.run(Operation::delete_all(), Mode::Transaction, gas)
            .await
            .map(drop)
    }

    pub async fn rename(&self, key: &str, new_key: &str, gas: Option<GasInfo>) -> BluzelleResult<()> {
        self.run(Operation::rename(key, new_key), Mode::Transaction, gas)
            .await
            .map(drop)
    }

    pub async fn renew_lease(
        &self,
        key: &str,
        lease: Option<Lease>,
        gas: Option<GasInfo>,
    ) -> BluzelleResult<()> {
        self.run(Operation::renew_lease(key, lease), Mode::Transaction, gas)
            .await
            .map(drop)
    }

    pub async fn renew_lease_all(&self, lease: Option<Lease>, gas: Option<GasInfo>) -> BluzelleResult<()> {
        self.run(Operation::renew_lease_all(lease), Mode::Transaction, gas)
            .await
            .map(drop)
    }
}

impl std::fmt::Debug for BluzelleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BluzelleClient")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .field("rest", &self.rest)
            .finish()
    }
}

fn checked_count(n: i64) -> BluzelleResult<u64> {
    u64::try_from(n).map_err(|_| BluzelleError::InvalidArgument(format!("Invalid N: {}", n)))
}

fn non_negative(value: i64, name: &str) -> BluzelleResult<u64> {
    u64::try_from(value)
        .map_err(|_| BluzelleError::InvalidResponse(format!("'{}' is negative: {}", name, value)))
}
