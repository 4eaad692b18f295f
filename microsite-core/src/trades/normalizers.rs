//! Normalization from store records to canonical trades

use super::errors::{MicrositeError, MicrositeResult};
use super::types::{CanonicalTrade, PartialTrade};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Coerce a loosely typed value to a finite number, 0 when that is impossible
pub fn coerce_number(value: Option<&Value>) -> f64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(0.0)
            }
        }
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    };

    if number.is_finite() {
        number
    } else {
        0.0
    }
}

/// RFC 3339 strings or epoch milliseconds
pub fn coerce_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Decode a JSON payload column into a partial trade.
///
/// Only a payload that is not a JSON object fails; mistyped fields inside an
/// object are absorbed by the lenient field decoders.
pub fn decode_payload(raw: &str) -> MicrositeResult<PartialTrade> {
    match serde_json::from_str::<Value>(raw)? {
        value @ Value::Object(_) => Ok(serde_json::from_value(value)?),
        other => Err(MicrositeError::Decode(format!(
            "expected a JSON object, found {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Total mapping from a partial record to the canonical trade
pub fn normalize_trade(partial: PartialTrade) -> CanonicalTrade {
    CanonicalTrade {
        from_amount: coerce_number(partial.from_amount.as_ref()),
        to_amount: coerce_number(partial.to_amount.as_ref()),
        notional_usd: coerce_number(partial.notional_usd.as_ref().or(partial.trade_amount_usd.as_ref())),
        timestamp: coerce_timestamp(partial.timestamp.as_ref()),
        id: partial.id.unwrap_or_default(),
        agent_id: partial.agent_id,
        from_token: partial.from_token.unwrap_or_default(),
        to_token: partial.to_token.unwrap_or_default(),
        from_token_symbol: partial.from_token_symbol.unwrap_or_default(),
        to_token_symbol: partial.to_token_symbol.unwrap_or_default(),
        from_chain: partial.from_chain.unwrap_or_default(),
        to_chain: partial.to_chain.unwrap_or_default(),
        from_specific_chain: partial.from_specific_chain,
        to_specific_chain: partial.to_specific_chain,
        reason: partial.reason.unwrap_or_default(),
        microsite_id: partial.microsite_id.unwrap_or_default(),
    }
}
