//! Canonical JSON used for transaction signing.
//!
//! Nodes rebuild the signing payload independently and check the signature
//! against their own bytes, so the output must match theirs bit for bit:
//! - object keys sorted by byte order, at every depth
//! - array elements stable-sorted by [`SortKey`] (containers by length,
//!   scalars by value), then canonicalized recursively
//! - `&`, `<` and `>` escaped as `\u00XX` after serialization
//!
//! The array rule does not order elements meaningfully. Nodes apply the same
//! rule, so it must stay as is.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

/// JSON tree whose shape enforces the canonical ordering rules.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Object(BTreeMap<String, CanonicalValue>),
    Array(Vec<CanonicalValue>),
    Scalar(Scalar),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

/// Secondary key used to order array elements.
#[derive(Debug, Clone, Copy)]
enum SortKey<'a> {
    Null,
    Bool(bool),
    Number(f64),
    Text(&'a str),
}

impl SortKey<'_> {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Null => 0,
            SortKey::Bool(_) => 1,
            SortKey::Number(_) => 2,
            SortKey::Text(_) => 3,
        }
    }

    fn compare(&self, other: &SortKey<'_>) -> Ordering {
        match (self, other) {
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl CanonicalValue {
    /// Build the canonical form of a JSON value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => CanonicalValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), CanonicalValue::from_json(v)))
                    .collect(),
            ),
            Value::Array(items) => {
                let mut ordered: Vec<&Value> = items.iter().collect();
                // stable: equal keys keep their input order
                ordered.sort_by(|a, b| sort_key(a).compare(&sort_key(b)));
                CanonicalValue::Array(ordered.into_iter().map(CanonicalValue::from_json).collect())
            }
            Value::Null => CanonicalValue::Scalar(Scalar::Null),
            Value::Bool(b) => CanonicalValue::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => CanonicalValue::Scalar(Scalar::Number(n.clone())),
            Value::String(s) => CanonicalValue::Scalar(Scalar::String(s.clone())),
        }
    }

    /// Compact JSON text with `&`, `<`, `>` escaped.
    pub fn to_canonical_string(&self) -> serde_json::Result<String> {
        Ok(escape_json(&serde_json::to_string(self)?))
    }

    pub fn to_canonical_bytes(&self) -> serde_json::Result<Vec<u8>> {
        Ok(self.to_canonical_string()?.into_bytes())
    }
}

impl From<&Value> for CanonicalValue {
    fn from(value: &Value) -> Self {
        CanonicalValue::from_json(value)
    }
}

fn sort_key(value: &Value) -> SortKey<'_> {
    match value {
        Value::Object(map) => SortKey::Number(map.len() as f64),
        Value::Array(items) => SortKey::Number(items.len() as f64),
        Value::Null => SortKey::Null,
        Value::Bool(b) => SortKey::Bool(*b),
        Value::Number(n) => SortKey::Number(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => SortKey::Text(s),
    }
}

impl Serialize for CanonicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CanonicalValue::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            CanonicalValue::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(item)?;
                }
                out.end()
            }
            CanonicalValue::Scalar(scalar) => scalar.serialize(serializer),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Number(n) => n.serialize(serializer),
            Scalar::String(s) => serializer.serialize_str(s),
        }
    }
}

/// Replace `&`, `<`, `>` with `\u00XX` (uppercase hex).
pub fn escape_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' | '<' | '>' => out.push_str(&format!("\\u00{:X}", ch as u32)),
            _ => out.push(ch),
        }
    }
    out
}

/// Canonical bytes of an arbitrary JSON value.
pub fn canonicalize(value: &Value) -> serde_json::Result<Vec<u8>> {
    CanonicalValue::from_json(value).to_canonical_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canon(value: Value) -> String {
        String::from_utf8(canonicalize(&value).unwrap()).unwrap()
    }

    #[test]
    fn test_object_keys_sorted_at_every_level() {
        let value = json!({
            "zeta": 1,
            "alpha": {"y": true, "b": null, "a": "x"},
            "Mid": [{"k2": 1, "k1": 2}]
        });
        assert_eq!(
            canon(value),
            r#"{"Mid":[{"k1":2,"k2":1}],"alpha":{"a":"x","b":null,"y":true},"zeta":1}"#
        );
    }

    #[test]
    fn test_uppercase_keys_sort_before_lowercase() {
        let value = json!({"amount": [], "BaseReq": {}, "UUID": "ns"});
        assert_eq!(canon(value), r#"{"BaseReq":{},"UUID":"ns","amount":[]}"#);
    }

    #[test]
    fn test_scalar_arrays_sorted_by_value() {
        assert_eq!(canon(json!([3, 1, 2])), "[1,2,3]");
        assert_eq!(canon(json!(["b", "a", "C"])), r#"["C","a","b"]"#);
    }

    #[test]
    fn test_nested_containers_sorted_by_length() {
        let value = json!([[1, 2, 3], {"a": 1}, [9, 8]]);
        // lengths 3, 1, 2; inner arrays sorted by value afterwards
        assert_eq!(canon(value), r#"[{"a":1},[8,9],[1,2,3]]"#);
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        let value = json!([{"id": "second", "n": 1}, {"id": "first"}, {"id": "third", "n": 2}]);
        assert_eq!(
            canon(value),
            r#"[{"id":"first"},{"id":"second","n":1},{"id":"third","n":2}]"#
        );
    }

    #[test]
    fn test_mixed_scalar_kinds() {
        let value = json!(["x", 2, null, true, [1]]);
        assert_eq!(canon(value), r#"[null,true,[1],2,"x"]"#);
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_json("a&b<c>d"), r"a\u0026b\u003Cc\u003Ed");
        assert_eq!(escape_json("plain text"), "plain text");
        assert_eq!(canon(json!({"v": "<tag> & more"})), r#"{"v":"\u003Ctag\u003E \u0026 more"}"#);
    }

    #[test]
    fn test_non_ascii_passes_through() {
        assert_eq!(canon(json!({"v": "ключ"})), r#"{"v":"ключ"}"#);
    }

    #[test]
    fn test_deterministic() {
        let value = json!({"msg": [{"type": "crud/create", "value": {"Key": "k", "Value": "v&v"}}]});
        let first = canonicalize(&value).unwrap();
        for _ in 0..10 {
            assert_eq!(canonicalize(&value).unwrap(), first);
        }
    }
}
