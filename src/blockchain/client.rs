//! REST client for the database chain's gateway.
//!
//! # Responsibilities
//! - Build endpoint URLs with percent-encoded path segments
//! - Run read-only queries and unwrap the `{result: {type, value}}` envelope
//! - Request unsigned transaction templates from `crud/<command>`
//! - Broadcast signed transactions to `txs`
//!
//! Every call is bounded by the request timeout of the underlying HTTP client.

use std::str::FromStr;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::blockchain::types::{AccountData, BluzelleError, BluzelleResult};
use crate::observability::metrics;

/// Path prefix of the CRUD module.
pub const CRUD_PREFIX: &str = "crud";

/// Path of the transaction broadcast endpoint.
pub const TX_PREFIX: &str = "txs";

/// Marker the chain uses when a key is absent.
pub const KEY_NOT_FOUND_MARKER: &str = "Key does not exist";

/// HTTP verb used to request a transaction template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl TxMethod {
    fn as_http(self) -> Method {
        match self {
            TxMethod::Get => Method::GET,
            TxMethod::Post => Method::POST,
            TxMethod::Put => Method::PUT,
            TxMethod::Patch => Method::PATCH,
            TxMethod::Delete => Method::DELETE,
        }
    }
}

impl FromStr for TxMethod {
    type Err = BluzelleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(TxMethod::Get),
            "post" => Ok(TxMethod::Post),
            "put" => Ok(TxMethod::Put),
            "patch" => Ok(TxMethod::Patch),
            "delete" => Ok(TxMethod::Delete),
            _ => Err(BluzelleError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Stateless HTTP client for the REST gateway.
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base: Url,
    timeout: Duration,
}

impl RestClient {
    /// Create a client for `endpoint` with a per-request timeout.
    pub fn new(endpoint: &str, timeout: Duration) -> BluzelleResult<Self> {
        let base: Url = endpoint.parse().map_err(|e| {
            BluzelleError::InvalidArgument(format!("Invalid endpoint URL '{}': {}", endpoint, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(BluzelleError::InvalidArgument(format!(
                "Endpoint URL '{}' cannot carry a path",
                endpoint
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base,
            timeout,
        })
    }

    /// Endpoint URL with `segments` appended, each percent-encoded.
    pub fn url<I, S>(&self, segments: I) -> BluzelleResult<Url>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BluzelleError::InvalidArgument(format!("Endpoint URL '{}' cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a query path and decode the unwrapped result.
    pub async fn query<I, S>(&self, segments: I) -> BluzelleResult<Value>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let url = self.url(segments)?;
        let path = url.path().to_string();

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(path = %path, status = status.as_u16(), "Query failed");
            if contains_ignore_case(&body, KEY_NOT_FOUND_MARKER) {
                return Err(BluzelleError::KeyNotFound);
            }
            return Err(BluzelleError::Query {
                path,
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = serde_json::from_str(&body)?;
        Ok(unwrap_result(value))
    }

    /// Account number, sequence and balances of `address`.
    pub async fn get_account(&self, address: &str) -> BluzelleResult<AccountData> {
        let value = self.query(["auth", "accounts", address]).await?;
        serde_json::from_value(value)
            .map_err(|e| BluzelleError::Initialization(format!("Unreadable account data: {}", e)))
    }

    /// Request an unsigned transaction template for `command`.
    pub async fn fetch_template(
        &self,
        method: TxMethod,
        command: &str,
        body: &Value,
    ) -> BluzelleResult<Value> {
        let url = self.url([CRUD_PREFIX, command])?;
        let response = self
            .client
            .request(method.as_http(), url)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            tracing::warn!(command = %command, status = status.as_u16(), "Template request rejected");
            return Err(BluzelleError::TransactionExecution(text));
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// Submit a signed transaction envelope and return the raw response.
    pub async fn broadcast(&self, envelope: &Value) -> BluzelleResult<Value> {
        let url = self.url([TX_PREFIX])?;
        let response = self.client.post(url).json(envelope).send().await?;

        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str::<Value>(&text) {
            // chain results carry `code`; a gateway error body never does
            Ok(value @ Value::Object(_)) if status.is_success() || value.get("code").is_some() => {
                Ok(value)
            }
            Ok(Value::Object(body)) => {
                tracing::warn!(status = status.as_u16(), "Broadcast rejected by gateway");
                let message = match body.get("error") {
                    Some(Value::String(error)) => error.clone(),
                    _ => text,
                };
                Err(BluzelleError::TransactionExecution(message))
            }
            _ if !status.is_success() => Err(BluzelleError::TransactionExecution(text)),
            Ok(other) => Err(BluzelleError::InvalidResponse(format!(
                "Unexpected broadcast response: {}",
                other
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether the gateway answers `node_info`.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.query(["node_info"]).await.is_ok();
        metrics::record_gateway_health(healthy);
        healthy
    }

    pub fn endpoint(&self) -> &Url {
        &self.base
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("endpoint", &self.base.as_str())
            .field("timeout_secs", &self.timeout.as_secs())
            .finish()
    }
}

/// Strip the `{height, result}` wrapper and a `{type, value}` amino envelope.
pub fn unwrap_result(value: Value) -> Value {
    let result = match value {
        Value::Object(mut map) if map.contains_key("result") => {
            map.remove("result").unwrap_or(Value::Null)
        }
        other => return other,
    };

    match result {
        Value::Object(mut map) if map.len() == 2 && map.contains_key("type") && map.contains_key("value") => {
            map.remove("value").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
