//! Shared utilities for integration testing: an in-process mock REST node.
//!
//! The node keeps a key-value store, an account sequence, and checks every
//! broadcast signature against the sequence it expects, the way the chain does.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::net::TcpListener;

use bluzelle_client::blockchain::signer::signing_payload;
use bluzelle_client::blockchain::wallet::Wallet;
use bluzelle_client::config::{ClientConfig, RetryConfig};

pub const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
pub const NAMESPACE: &str = "testns";
pub const ACCOUNT_NUMBER: u64 = 7;
pub const TEMPLATE_GAS: &str = "200000";

const SIGNATURE_FAILED_LOG: &str =
    "unauthorized: signature verification failed; verify correct account sequence and chain-id";

/// A template request as received by the node.
#[derive(Debug, Clone)]
pub struct TemplateRequest {
    pub method: Method,
    pub command: String,
    pub body: Value,
}

#[derive(Debug)]
pub struct NodeState {
    pub sequence: u64,
    /// Keep answering with a signature failure and never move the sequence.
    pub reject_all_signatures: bool,
    /// Responses returned by `txs` before normal processing resumes.
    pub scripted: VecDeque<(StatusCode, Value)>,
    pub store: BTreeMap<String, (String, u64)>,
    pub account_queries: usize,
    pub templates: Vec<TemplateRequest>,
    pub broadcasts: Vec<Value>,
}

/// Handle to a running mock node.
#[derive(Clone)]
pub struct MockNode {
    pub addr: SocketAddr,
    state: Arc<Mutex<NodeState>>,
}

impl MockNode {
    pub async fn start(initial_sequence: u64) -> Self {
        let state = Arc::new(Mutex::new(NodeState {
            sequence: initial_sequence,
            reject_all_signatures: false,
            scripted: VecDeque::new(),
            store: BTreeMap::new(),
            account_queries: 0,
            templates: Vec::new(),
            broadcasts: Vec::new(),
        }));

        let app = Router::new()
            .route("/auth/accounts/{address}", get(account))
            .route("/node_info", get(node_info))
            .route("/crud/{command}", post(template).delete(template))
            .route("/crud/{command}/{namespace}", get(crud_query))
            .route("/crud/{command}/{namespace}/{arg}", get(crud_query_arg))
            .route("/txs", post(broadcast))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut NodeState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn sequence(&self) -> u64 {
        self.with_state(|s| s.sequence)
    }

    /// Advance the sequence as if another client had committed a transaction.
    pub fn bump_sequence(&self) {
        self.with_state(|s| s.sequence += 1);
    }

    /// Answer the next broadcast with a fixed status and body.
    pub fn script(&self, status: StatusCode, body: Value) {
        self.with_state(|s| s.scripted.push_back((status, body)));
    }

    pub fn seed(&self, key: &str, value: &str, lease_blocks: u64) {
        self.with_state(|s| s.store.insert(key.to_string(), (value.to_string(), lease_blocks)));
    }

    pub fn account_queries(&self) -> usize {
        self.with_state(|s| s.account_queries)
    }

    pub fn broadcasts(&self) -> Vec<Value> {
        self.with_state(|s| s.broadcasts.clone())
    }

    pub fn templates(&self) -> Vec<TemplateRequest> {
        self.with_state(|s| s.templates.clone())
    }

    /// Sequences carried by the signatures of every broadcast so far.
    pub fn signed_sequences(&self) -> Vec<String> {
        self.broadcasts()
            .iter()
            .map(|b| b["tx"]["signatures"][0]["sequence"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

/// Session config pointing at `endpoint`, with a short retry interval.
pub fn test_config(endpoint: &str) -> ClientConfig {
    ClientConfig {
        namespace: NAMESPACE.to_string(),
        mnemonic: TEST_MNEMONIC.to_string(),
        address: test_address(),
        endpoint: endpoint.to_string(),
        retries: RetryConfig {
            max_retries: 10,
            interval_ms: 5,
        },
        ..ClientConfig::default()
    }
}

pub fn test_address() -> String {
    Wallet::from_mnemonic(TEST_MNEMONIC).unwrap().address().to_string()
}

/// Poll `cond` until it holds or a second has passed.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

type Shared = State<Arc<Mutex<NodeState>>>;

fn wrap(result: Value) -> Json<Value> {
    Json(json!({ "height": "100", "result": result }))
}

fn key_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "unknown request: Key does not exist" })),
    )
        .into_response()
}

async fn account(State(state): Shared, Path(address): Path<String>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.account_queries += 1;
    wrap(json!({
        "type": "cosmos-sdk/Account",
        "value": {
            "address": address,
            "coins": [{ "denom": "ubnt", "amount": "10000000" }],
            "public_key": null,
            "account_number": ACCOUNT_NUMBER.to_string(),
            "sequence": state.sequence.to_string()
        }
    }))
}

async fn node_info() -> Json<Value> {
    Json(json!({
        "node_info": { "network": "bluzelle" },
        "application_version": { "name": "BluzelleService", "version": "0.0.0-74-ge6c9b5b" }
    }))
}

async fn crud_query(state: Shared, Path((command, namespace)): Path<(String, String)>) -> Response {
    run_query(state, &command, &namespace, None)
}

async fn crud_query_arg(
    state: Shared,
    Path((command, namespace, arg)): Path<(String, String, String)>,
) -> Response {
    run_query(state, &command, &namespace, Some(arg))
}

fn run_query(State(state): Shared, command: &str, namespace: &str, arg: Option<String>) -> Response {
    assert_eq!(namespace, NAMESPACE);
    let state = state.lock().unwrap();
    let arg = arg.unwrap_or_default();

    match command {
        "read" | "pread" => match state.store.get(&arg) {
            Some((value, _)) => wrap(json!({ "value": value })).into_response(),
            None => key_not_found(),
        },
        "has" => wrap(json!({ "has": state.store.contains_key(&arg) })).into_response(),
        "getlease" => match state.store.get(&arg) {
            Some((_, lease)) => wrap(json!({ "lease": lease.to_string() })).into_response(),
            None => key_not_found(),
        },
        "getnshortestleases" => {
            let n: usize = arg.parse().unwrap();
            wrap(json!({ "keyleases": shortest_leases(&state.store, n) })).into_response()
        }
        other => match read_result(&state.store, other) {
            Some(result) => wrap(result).into_response(),
            None => (StatusCode::NOT_IMPLEMENTED, "unknown query").into_response(),
        },
    }
}

async fn template(
    State(state): Shared,
    method: Method,
    Path(command): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.templates.push(TemplateRequest {
        method,
        command: command.clone(),
        body: body.clone(),
    });

    Json(json!({
        "type": "cosmos-sdk/StdTx",
        "value": {
            "msg": [{ "type": format!("crud/{}", command), "value": body }],
            "fee": { "amount": [], "gas": TEMPLATE_GAS },
            "memo": "",
            "signatures": null
        }
    }))
}

async fn broadcast(State(state): Shared, Json(envelope): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    state.broadcasts.push(envelope.clone());

    if let Some((status, body)) = state.scripted.pop_front() {
        return (status, Json(body)).into_response();
    }

    let tx = &envelope["tx"];
    if state.reject_all_signatures || !signature_valid(tx, state.sequence) {
        return Json(json!({ "height": "0", "code": 4, "raw_log": SIGNATURE_FAILED_LOG })).into_response();
    }

    let msg = &tx["msg"][0];
    let command = msg["type"].as_str().unwrap_or_default().trim_start_matches("crud/");
    match execute(&mut state.store, command, &msg["value"]) {
        Ok(result) => {
            state.sequence += 1;
            let data = result
                .map(|r| hex::encode_upper(r.to_string()))
                .unwrap_or_default();
            Json(json!({ "height": "101", "txhash": "ABC", "data": data })).into_response()
        }
        Err(raw_log) => Json(json!({ "height": "101", "code": 18, "raw_log": raw_log })).into_response(),
    }
}

/// Check the signature against the sequence the node expects.
fn signature_valid(tx: &Value, expected_sequence: u64) -> bool {
    let sig = &tx["signatures"][0];
    let sequence = sig["sequence"].as_str().unwrap_or_default();
    if sequence != expected_sequence.to_string() {
        return false;
    }

    let engine = base64::engine::general_purpose::STANDARD;
    let Ok(pubkey) = engine.decode(sig["pub_key"]["value"].as_str().unwrap_or_default()) else {
        return false;
    };
    let Ok(raw_sig) = engine.decode(sig["signature"].as_str().unwrap_or_default()) else {
        return false;
    };
    let (Ok(key), Ok(signature)) = (VerifyingKey::from_sec1_bytes(&pubkey), Signature::from_slice(&raw_sig)) else {
        return false;
    };

    let Ok(payload) = signing_payload(
        sig["account_number"].as_str().unwrap_or_default(),
        "bluzelle",
        &tx["fee"],
        tx["memo"].as_str().unwrap_or_default(),
        &tx["msg"],
        sequence,
    ) else {
        return false;
    };
    let digest = Sha256::digest(payload.as_bytes());
    key.verify_prehash(&digest, &signature).is_ok()
}

const KEY_EXISTS_LOG: &str =
    "unauthorized: Key already exists: failed to execute message; message index: 0";
const KEY_MISSING_LOG: &str =
    "unknown request: Key does not exist: failed to execute message; message index: 0";

fn lease_of(value: &Value) -> u64 {
    value["Lease"].as_str().and_then(|l| l.parse().ok()).unwrap_or(0)
}

fn text(value: &Value, field: &str) -> String {
    value[field].as_str().unwrap_or_default().to_string()
}

/// Apply a transaction to the store; `Ok(None)` means no result data.
fn execute(
    store: &mut BTreeMap<String, (String, u64)>,
    command: &str,
    value: &Value,
) -> Result<Option<Value>, String> {
    let key = text(value, "Key");
    match command {
        "create" => {
            if store.contains_key(&key) {
                return Err(KEY_EXISTS_LOG.to_string());
            }
            store.insert(key, (text(value, "Value"), lease_of(value)));
            Ok(None)
        }
        "update" => match store.get_mut(&key) {
            Some(entry) => {
                *entry = (text(value, "Value"), lease_of(value));
                Ok(None)
            }
            None => Err(KEY_MISSING_LOG.to_string()),
        },
        "multiupdate" => {
            let pairs = value["KeyValues"].as_array().cloned().unwrap_or_default();
            for pair in &pairs {
                let key = text(pair, "key");
                if !store.contains_key(&key) {
                    return Err(KEY_MISSING_LOG.to_string());
                }
            }
            for pair in pairs {
                if let Some(entry) = store.get_mut(&text(&pair, "key")) {
                    entry.0 = text(&pair, "value");
                }
            }
            Ok(None)
        }
        "delete" => store.remove(&key).map(|_| None).ok_or_else(|| KEY_MISSING_LOG.to_string()),
        "deleteall" => {
            store.clear();
            Ok(None)
        }
        "rename" => match store.remove(&key) {
            Some(entry) => {
                store.insert(text(value, "NewKey"), entry);
                Ok(None)
            }
            None => Err(KEY_MISSING_LOG.to_string()),
        },
        "renewlease" => match store.get_mut(&key) {
            Some(entry) => {
                entry.1 = lease_of(value);
                Ok(None)
            }
            None => Err(KEY_MISSING_LOG.to_string()),
        },
        "renewleaseall" => {
            let lease = lease_of(value);
            for entry in store.values_mut() {
                entry.1 = lease;
            }
            Ok(None)
        }
        "read" => store
            .get(&key)
            .map(|(v, _)| Some(json!({ "key": key, "value": v })))
            .ok_or_else(|| KEY_MISSING_LOG.to_string()),
        "has" => Ok(Some(json!({ "key": key, "has": store.contains_key(&key) }))),
        "getlease" => store
            .get(&key)
            .map(|(_, lease)| Some(json!({ "key": key, "lease": lease.to_string() })))
            .ok_or_else(|| KEY_MISSING_LOG.to_string()),
        "getnshortestleases" => {
            let n: usize = text(value, "N").parse().unwrap_or(0);
            Ok(Some(json!({ "keyleases": shortest_leases(store, n) })))
        }
        other => read_result(store, other)
            .map(Some)
            .ok_or_else(|| format!("unknown request: unrecognized command {}", other)),
    }
}

/// Results shared by query and transaction reads of the whole namespace.
fn read_result(store: &BTreeMap<String, (String, u64)>, command: &str) -> Option<Value> {
    match command {
        "keys" => Some(json!({ "keys": store.keys().collect::<Vec<_>>() })),
        "count" => Some(json!({ "count": store.len().to_string() })),
        "keyvalues" => Some(json!({
            "keyvalues": store
                .iter()
                .map(|(k, (v, _))| json!({ "key": k, "value": v }))
                .collect::<Vec<_>>()
        })),
        _ => None,
    }
}

fn shortest_leases(store: &BTreeMap<String, (String, u64)>, n: usize) -> Vec<Value> {
    let mut leases: Vec<_> = store.iter().map(|(k, (_, lease))| (k.clone(), *lease)).collect();
    leases.sort_by_key(|(_, lease)| *lease);
    leases
        .into_iter()
        .take(n)
        .map(|(key, lease)| json!({ "key": key, "lease": lease.to_string() }))
        .collect()
}
