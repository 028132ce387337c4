//! Operation descriptors shared by query and transaction dispatch.

use serde_json::{json, Map, Value};

use crate::blockchain::client::{TxMethod, CRUD_PREFIX};
use crate::database::types::Lease;

/// How an operation reaches the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Unsigned GET against `crud/<command>/<namespace>/<args..>`.
    Query,
    /// Signed transaction through the serial queue.
    Transaction,
}

/// One CRUD command with its query path arguments and transaction payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub command: &'static str,
    pub args: Vec<String>,
    pub payload: Map<String, Value>,
    pub method: TxMethod,
}

impl Operation {
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            args: Vec::new(),
            payload: Map::new(),
            method: TxMethod::Post,
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(name.to_string(), value.into());
        self
    }

    fn with_method(mut self, method: TxMethod) -> Self {
        self.method = method;
        self
    }

    /// Path segments for query mode.
    pub fn query_path(&self, namespace: &str) -> Vec<String> {
        let mut path = Vec::with_capacity(self.args.len() + 3);
        path.push(CRUD_PREFIX.to_string());
        path.push(self.command.to_string());
        path.push(namespace.to_string());
        path.extend(self.args.iter().cloned());
        path
    }

    // Reads

    /// `pread` returns the value with a proof.
    pub fn read(key: &str, prove: bool) -> Self {
        Self::new(if prove { "pread" } else { "read" })
            .arg(key)
            .field("Key", key)
    }

    pub fn has(key: &str) -> Self {
        Self::new("has").arg(key).field("Key", key)
    }

    pub fn keys() -> Self {
        Self::new("keys")
    }

    pub fn count() -> Self {
        Self::new("count")
    }

    pub fn key_values() -> Self {
        Self::new("keyvalues")
    }

    pub fn get_lease(key: &str) -> Self {
        Self::new("getlease").arg(key).field("Key", key)
    }

    pub fn get_n_shortest_leases(n: u64) -> Self {
        Self::new("getnshortestleases")
            .arg(n.to_string())
            .field("N", n.to_string())
    }

    // Writes

    pub fn create(key: &str, value: &str, lease: Option<Lease>) -> Self {
        Self::new("create")
            .field("Key", key)
            .field("Value", value)
            .field("Lease", Lease::wire_value(lease))
    }

    pub fn update(key: &str, value: &str, lease: Option<Lease>) -> Self {
        Self::new("update")
            .field("Key", key)
            .field("Value", value)
            .field("Lease", Lease::wire_value(lease))
    }

    pub fn update_many<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let key_values: Vec<Value> = entries
            .into_iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect();
        Self::new("multiupdate").field("KeyValues", key_values)
    }

    pub fn delete(key: &str) -> Self {
        Self::new("delete")
            .field("Key", key)
            .with_method(TxMethod::Delete)
    }

    pub fn delete_all() -> Self {
        Self::new("deleteall")
    }

    pub fn rename(key: &str, new_key: &str) -> Self {
        Self::new("rename").field("Key", key).field("NewKey", new_key)
    }

    pub fn renew_lease(key: &str, lease: Option<Lease>) -> Self {
        Self::new("renewlease")
            .field("Key", key)
            .field("Lease", Lease::wire_value(lease))
    }

    pub fn renew_lease_all(lease: Option<Lease>) -> Self {
        Self::new("renewleaseall").field("Lease", Lease::wire_value(lease))
    }
}
