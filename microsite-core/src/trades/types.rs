//! Trade data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Normalized trade shared by every aggregation path
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanonicalTrade {
    pub id: String,
    pub agent_id: Option<String>,
    pub from_amount: f64,
    pub to_amount: f64,
    pub from_token: String,
    pub to_token: String,
    pub from_token_symbol: String,
    pub to_token_symbol: String,
    pub from_chain: String,
    pub to_chain: String,
    pub from_specific_chain: Option<String>,
    pub to_specific_chain: Option<String>,
    pub notional_usd: f64,
    pub reason: String,
    /// `None` when the store carried no usable event time
    pub timestamp: Option<DateTime<Utc>>,
    pub microsite_id: String,
}

impl CanonicalTrade {
    /// Chain the trade left from, specific chain first
    pub fn effective_from_chain(&self) -> Option<&str> {
        effective_chain(self.from_specific_chain.as_deref(), &self.from_chain)
    }

    /// Chain the trade arrived on, specific chain first
    pub fn effective_to_chain(&self) -> Option<&str> {
        effective_chain(self.to_specific_chain.as_deref(), &self.to_chain)
    }
}

fn effective_chain<'a>(specific: Option<&'a str>, coarse: &'a str) -> Option<&'a str> {
    specific
        .map(str::trim)
        .filter(|chain| !chain.is_empty())
        .or_else(|| Some(coarse.trim()).filter(|chain| !chain.is_empty()))
}

/// Trade as read from a store, every field optional and loosely typed.
///
/// Deserializing from any JSON object succeeds: a field whose type does not
/// match is treated as absent (text) or handed to numeric coercion (numbers).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialTrade {
    #[serde(deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub agent_id: Option<String>,
    pub from_amount: Option<Value>,
    pub to_amount: Option<Value>,
    #[serde(deserialize_with = "lenient_text")]
    pub from_token: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub to_token: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub from_token_symbol: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub to_token_symbol: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub from_chain: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub to_chain: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub from_specific_chain: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub to_specific_chain: Option<String>,
    pub notional_usd: Option<Value>,
    /// Older payloads name the USD notional `tradeAmountUsd`
    pub trade_amount_usd: Option<Value>,
    #[serde(deserialize_with = "lenient_text")]
    pub reason: Option<String>,
    pub timestamp: Option<Value>,
    #[serde(deserialize_with = "lenient_text")]
    pub microsite_id: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}
