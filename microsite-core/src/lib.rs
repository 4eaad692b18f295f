//! Competition Microsite Library
//!
//! Read-only statistics over recorded trades: headline totals, the public
//! trade listing and a raw diagnostic dump, served over HTTP.

pub mod trades;
pub mod stats;
pub mod config;
pub mod api;

// Re-export main types for easy access
pub use trades::{
    CanonicalTrade, PartialTrade, TradeSelection, TradeSource, TradesTableSource,
    ObjectIndexSource, MicrositeError, MicrositeResult,
};
pub use stats::{MicrositeStats, MicrositeTrade, StatsAccumulator, summarize, list_trades};
pub use config::{MicrositeConfig, StoreSchema, SelectionMode};
pub use api::MicrositeApiServer;

use chrono::Utc;
use std::sync::Arc;

/// Per-request operations behind the HTTP endpoints
pub struct MicrositeService {
    source: Arc<dyn TradeSource>,
    config: Arc<MicrositeConfig>,
}

impl MicrositeService {
    pub fn new(source: Arc<dyn TradeSource>, config: Arc<MicrositeConfig>) -> Self {
        Self { source, config }
    }

    /// Headline statistics over the stats selection
    pub async fn stats(&self) -> MicrositeResult<MicrositeStats> {
        let selection = self.config.selection(self.config.stats_selection)?;
        let trades = self.source.fetch_trades(&selection).await?;
        Ok(summarize(&trades))
    }

    /// Public listing over the trades selection
    pub async fn trades(&self) -> MicrositeResult<Vec<MicrositeTrade>> {
        let selection = self.config.selection(self.config.trades_selection)?;
        let trades = self.source.fetch_trades(&selection).await?;
        Ok(list_trades(trades, Utc::now()))
    }

    /// Stored rows, unprocessed
    pub async fn raw_trades(&self) -> MicrositeResult<Vec<serde_json::Value>> {
        self.source.fetch_raw().await
    }
}
