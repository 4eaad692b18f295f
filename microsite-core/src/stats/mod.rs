//! Trade aggregation for the microsite
//!
//! Reduces canonical trades to the headline statistics, or projects them
//! into the public trade listing.

pub mod listing;

pub use listing::{MicrositeTrade, list_trades};

use serde::Serialize;
use std::collections::HashSet;

use crate::trades::CanonicalTrade;

/// Headline statistics served by `/api/microsite/stats`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrositeStats {
    pub total_notional_traded_usd: f64,
    pub total_trades: usize,
    pub total_tokens_traded: usize,
    pub total_chains_traded: usize,
}

/// Running reduction over a sequence of trades
#[derive(Debug, Default)]
pub struct StatsAccumulator<'a> {
    total_notional_usd: f64,
    trade_count: usize,
    tokens: HashSet<&'a str>,
    chains: HashSet<&'a str>,
}

impl<'a> StatsAccumulator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one trade into the totals
    pub fn record(&mut self, trade: &'a CanonicalTrade) {
        self.trade_count += 1;

        if trade.notional_usd.is_finite() {
            self.total_notional_usd += trade.notional_usd;
        }

        // Destination token only
        if !trade.to_token_symbol.is_empty() {
            self.tokens.insert(trade.to_token_symbol.as_str());
        }

        if let Some(chain) = trade.effective_from_chain() {
            self.chains.insert(chain);
        }
        if let Some(chain) = trade.effective_to_chain() {
            self.chains.insert(chain);
        }
    }

    pub fn finish(self) -> MicrositeStats {
        MicrositeStats {
            total_notional_traded_usd: self.total_notional_usd,
            total_trades: self.trade_count,
            total_tokens_traded: self.tokens.len(),
            total_chains_traded: self.chains.len(),
        }
    }
}

/// Summarize a batch of trades
pub fn summarize(trades: &[CanonicalTrade]) -> MicrositeStats {
    let mut acc = StatsAccumulator::new();
    for trade in trades {
        acc.record(trade);
    }
    acc.finish()
}
