//! Value types exchanged with the CRUD module.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::blockchain::types::{BluzelleError, BluzelleResult};

/// Seconds per block; leases travel as block counts.
pub const BLOCK_TIME_SECS: i64 = 5;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

/// Lifetime of a key, stored as a number of blocks.
///
/// The zero lease tells the chain to apply its default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Lease {
    blocks: u64,
}

impl Lease {
    /// Lease from a duration in seconds, truncated to whole blocks.
    pub fn from_seconds(seconds: i64) -> BluzelleResult<Self> {
        if seconds < 0 {
            return Err(BluzelleError::InvalidLease(seconds));
        }
        Ok(Self {
            blocks: (seconds / BLOCK_TIME_SECS) as u64,
        })
    }

    /// Lease from calendar components; components may be negative as long as
    /// the total is not.
    pub fn new(days: i64, hours: i64, minutes: i64, seconds: i64) -> BluzelleResult<Self> {
        let total = days
            .saturating_mul(SECS_PER_DAY)
            .saturating_add(hours.saturating_mul(SECS_PER_HOUR))
            .saturating_add(minutes.saturating_mul(SECS_PER_MINUTE))
            .saturating_add(seconds);
        Self::from_seconds(total)
    }

    pub fn from_blocks(blocks: u64) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    pub fn seconds(&self) -> u64 {
        self.blocks.saturating_mul(BLOCK_TIME_SECS as u64)
    }

    /// Decimal block count as sent in the `Lease` field.
    pub fn to_wire(&self) -> String {
        self.blocks.to_string()
    }

    /// `Lease` field value for an optional lease; absent means `"0"`.
    pub fn wire_value(lease: Option<Lease>) -> Value {
        Value::String(lease.unwrap_or_default().to_wire())
    }
}

/// One entry of a `KeyValues` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Remaining lease of one key, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyLease {
    pub key: String,
    pub lease_secs: i64,
}

#[derive(Deserialize)]
struct RawKeyLease {
    key: String,
    #[serde(deserialize_with = "i64_from_string_or_number")]
    lease: i64,
}

/// Field `name` of a result object.
pub(crate) fn field<'a>(result: &'a Value, name: &str) -> BluzelleResult<&'a Value> {
    if result.is_null() {
        return Err(BluzelleError::InvalidResponse(format!(
            "Result carried no data, expected '{}'",
            name
        )));
    }
    result
        .get(name)
        .ok_or_else(|| BluzelleError::InvalidResponse(format!("Result has no '{}' field", name)))
}

pub(crate) fn string_field(result: &Value, name: &str) -> BluzelleResult<String> {
    match field(result, name)? {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Err(BluzelleError::KeyNotFound),
        other => Ok(other.to_string()),
    }
}

pub(crate) fn bool_field(result: &Value, name: &str) -> BluzelleResult<bool> {
    match field(result, name)? {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(BluzelleError::InvalidResponse(format!("'{}' is not a boolean: {}", name, other))),
    }
}

pub(crate) fn int_field(result: &Value, name: &str) -> BluzelleResult<i64> {
    i64_from_value(field(result, name)?)
        .ok_or_else(|| BluzelleError::InvalidResponse(format!("'{}' is not an integer", name)))
}

/// Key list; a null list is empty.
pub(crate) fn keys_field(result: &Value) -> BluzelleResult<Vec<String>> {
    match result.get("keys") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(keys) => Ok(Vec::<String>::deserialize(keys)?),
    }
}

/// `keyvalues` list as a map; later duplicates win.
pub(crate) fn key_values_field(result: &Value) -> BluzelleResult<BTreeMap<String, String>> {
    match result.get("keyvalues") {
        None => Err(BluzelleError::InvalidResponse("Failed to get key-value list".to_string())),
        Some(Value::Null) => Ok(BTreeMap::new()),
        Some(list) => Ok(Vec::<KeyValue>::deserialize(list)?
            .into_iter()
            .map(|kv| (kv.key, kv.value))
            .collect()),
    }
}

/// `keyleases` list with block counts converted to seconds, order kept.
pub(crate) fn key_leases_field(result: &Value) -> BluzelleResult<Vec<KeyLease>> {
    match result.get("keyleases") {
        None => Err(BluzelleError::InvalidResponse("Failed to get leases list".to_string())),
        Some(Value::Null) => Ok(Vec::new()),
        Some(list) => Ok(Vec::<RawKeyLease>::deserialize(list)?
            .into_iter()
            .map(|raw| KeyLease {
                key: raw.key,
                lease_secs: raw.lease.saturating_mul(BLOCK_TIME_SECS),
            })
            .collect()),
    }
}

fn i64_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn i64_from_string_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    i64_from_value(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid integer {}", value)))
}
