//! Public trade listing

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use crate::trades::CanonicalTrade;

/// Trade as served by `/api/microsite/trades`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrositeTrade {
    pub id: String,
    pub agent_id: Option<String>,
    pub from_amount: f64,
    pub to_amount: f64,
    pub from_ticker: String,
    pub to_ticker: String,
    pub reason: String,
    pub notional_usd: f64,
    pub timestamp: String,
    pub from_chain: String,
    pub to_chain: String,
    pub from_token_symbol: String,
    pub to_token_symbol: String,
    pub from_specific_chain: Option<String>,
    pub to_specific_chain: Option<String>,
    pub microsite_id: String,
}

impl MicrositeTrade {
    /// Project a canonical trade, stamping `fallback_time` when its own
    /// event time is unknown
    pub fn from_canonical(trade: CanonicalTrade, fallback_time: DateTime<Utc>) -> Self {
        let timestamp = trade.timestamp.unwrap_or(fallback_time);

        Self {
            id: trade.id,
            agent_id: trade.agent_id,
            from_amount: trade.from_amount,
            to_amount: trade.to_amount,
            from_ticker: trade.from_token,
            to_ticker: trade.to_token,
            reason: trade.reason,
            notional_usd: trade.notional_usd,
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            from_chain: trade.from_chain,
            to_chain: trade.to_chain,
            from_token_symbol: trade.from_token_symbol,
            to_token_symbol: trade.to_token_symbol,
            from_specific_chain: trade.from_specific_chain,
            to_specific_chain: trade.to_specific_chain,
            microsite_id: trade.microsite_id,
        }
    }
}

/// Project trades into the listing, keeping source order
pub fn list_trades(trades: Vec<CanonicalTrade>, now: DateTime<Utc>) -> Vec<MicrositeTrade> {
    let unknown_times = trades.iter().filter(|t| t.timestamp.is_none()).count();
    if unknown_times > 0 {
        debug!("{} trades without a timestamp stamped with request time", unknown_times);
    }

    trades
        .into_iter()
        .map(|trade| MicrositeTrade::from_canonical(trade, now))
        .collect()
}
