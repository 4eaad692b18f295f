//! Trade sources and normalization

pub mod types;
pub mod errors;
pub mod normalizers;
pub mod postgres;

pub use types::{CanonicalTrade, PartialTrade};
pub use errors::{MicrositeError, MicrositeResult};
pub use normalizers::{normalize_trade, decode_payload, coerce_number, coerce_timestamp};
pub use postgres::{TradesTableSource, ObjectIndexSource};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

/// Predicate selecting which stored trades a request covers
#[derive(Clone, Debug, PartialEq)]
pub enum TradeSelection {
    /// Trades executed at or before the instant
    AtOrBefore(DateTime<Utc>),
    /// Trades belonging to one competition
    Competition(String),
}

impl fmt::Display for TradeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtOrBefore(cutoff) => write!(f, "timestamp <= {}", cutoff.to_rfc3339()),
            Self::Competition(id) => write!(f, "competition_id = {}", id),
        }
    }
}

/// Read interface over a trade store, whatever its physical schema
#[async_trait]
pub trait TradeSource: Send + Sync {
    /// Every trade matching the selection, normalized, in store order
    async fn fetch_trades(&self, selection: &TradeSelection) -> MicrositeResult<Vec<CanonicalTrade>>;

    /// Every stored trade row, unprocessed
    async fn fetch_raw(&self) -> MicrositeResult<Vec<serde_json::Value>>;

    fn schema_name(&self) -> &str;
}
