//! Gas directives and their application to transaction templates.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::blockchain::types::{BluzelleError, BluzelleResult};

/// Native token denomination used for fees.
pub const TOKEN_DENOM: &str = "ubnt";

/// Optional fee and gas limits for a transaction.
///
/// `max_fee` takes precedence over `gas_price` when both are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasInfo {
    /// Price per unit of gas; fee = price × gas reported by the template.
    pub gas_price: Option<u64>,
    /// Upper bound for the template's gas.
    pub max_gas: Option<u64>,
    /// Fixed fee amount.
    pub max_fee: Option<u64>,
}

impl GasInfo {
    pub fn with_gas_price(gas_price: u64) -> Self {
        Self {
            gas_price: Some(gas_price),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gas_price.is_none() && self.max_gas.is_none() && self.max_fee.is_none()
    }

    /// Fields merged into the template request body, as decimal strings.
    pub fn request_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Some(max_gas) = self.max_gas {
            fields.insert("max_gas".to_string(), Value::String(max_gas.to_string()));
        }
        if let Some(max_fee) = self.max_fee {
            fields.insert("max_fee".to_string(), Value::String(max_fee.to_string()));
        }
        if let Some(gas_price) = self.gas_price {
            fields.insert("gas_price".to_string(), Value::String(gas_price.to_string()));
        }
        fields
    }

    /// Clamp gas and rewrite the fee of a template's `value.fee`.
    ///
    /// An empty directive leaves the template untouched.
    pub fn apply(&self, template: &mut Value) -> BluzelleResult<()> {
        if self.is_empty() {
            return Ok(());
        }

        let fee = template
            .get_mut("value")
            .and_then(|v| v.get_mut("fee"))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| BluzelleError::InvalidResponse("Template has no value.fee".to_string()))?;

        let reported_gas = fee.get("gas").map(parse_amount).transpose()?.unwrap_or(0);

        if let Some(max_gas) = self.max_gas {
            if reported_gas > max_gas {
                fee.insert("gas".to_string(), Value::String(max_gas.to_string()));
            }
        }

        let amount = match (self.max_fee, self.gas_price) {
            (Some(max_fee), _) => Some(max_fee),
            (None, Some(price)) => Some(price.saturating_mul(reported_gas)),
            (None, None) => None,
        };
        if let Some(amount) = amount {
            fee.insert(
                "amount".to_string(),
                json!([{ "denom": TOKEN_DENOM, "amount": amount.to_string() }]),
            );
        }

        Ok(())
    }
}

fn parse_amount(value: &Value) -> BluzelleResult<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| BluzelleError::InvalidResponse(format!("Invalid gas value {}", n))),
        Value::String(s) => s
            .parse()
            .map_err(|_| BluzelleError::InvalidResponse(format!("Invalid gas value '{}'", s))),
        other => Err(BluzelleError::InvalidResponse(format!("Invalid gas value {}", other))),
    }
}
