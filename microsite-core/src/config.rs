//! Microsite configuration
//!
//! Values come from the process environment (optionally seeded from a `.env`
//! file by the binary). Parsing goes through a key lookup so it can be driven
//! from a map in tests.

use chrono::{DateTime, TimeZone, Utc};
use std::net::SocketAddr;
use std::str::FromStr;

use crate::trades::{MicrositeError, MicrositeResult, TradeSelection};

/// Physical layout of the trade store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreSchema {
    /// Typed `trades` table
    Trades,
    /// `object_index` table with a JSON payload per record
    ObjectIndex,
}

impl FromStr for StoreSchema {
    type Err = MicrositeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trades" => Ok(Self::Trades),
            "object_index" => Ok(Self::ObjectIndex),
            other => Err(MicrositeError::Configuration(format!("unknown trade store schema: {}", other))),
        }
    }
}

/// Which predicate an endpoint selects trades with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionMode {
    Cutoff,
    Competition,
}

impl FromStr for SelectionMode {
    type Err = MicrositeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cutoff" => Ok(Self::Cutoff),
            "competition" => Ok(Self::Competition),
            other => Err(MicrositeError::Configuration(format!("unknown selection mode: {}", other))),
        }
    }
}

/// Microsite configuration
#[derive(Clone, Debug)]
pub struct MicrositeConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    pub store_schema: StoreSchema,
    /// Last instant included by the cutoff predicate
    pub cutoff: DateTime<Utc>,
    /// Only required by endpoints using [`SelectionMode::Competition`]
    pub competition_id: Option<String>,
    pub stats_selection: SelectionMode,
    pub trades_selection: SelectionMode,
}

impl Default for MicrositeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_url: "postgres://localhost/microsite".to_string(),
            max_connections: 5,
            store_schema: StoreSchema::Trades,
            // 9 AM ET on June 4, 2025
            cutoff: Utc.with_ymd_and_hms(2025, 6, 4, 13, 0, 0).single().unwrap_or_default(),
            competition_id: None,
            stats_selection: SelectionMode::Cutoff,
            trades_selection: SelectionMode::Competition,
        }
    }
}

impl MicrositeConfig {
    /// Load from the process environment
    pub fn from_env() -> MicrositeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, falling back to defaults for
    /// absent keys
    pub fn from_lookup<F>(lookup: F) -> MicrositeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            bind_addr: parse_or(&lookup, "MICROSITE_BIND_ADDR", defaults.bind_addr)?,
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            store_schema: parse_or(&lookup, "TRADE_STORE_SCHEMA", defaults.store_schema)?,
            cutoff: match lookup("TRADES_CUTOFF") {
                Some(raw) => DateTime::parse_from_rfc3339(raw.trim())
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(|e| MicrositeError::Configuration(format!("TRADES_CUTOFF: {}", e)))?,
                None => defaults.cutoff,
            },
            competition_id: lookup("COMPETITION_ID").filter(|id| !id.trim().is_empty()),
            stats_selection: parse_or(&lookup, "STATS_SELECTION", defaults.stats_selection)?,
            trades_selection: parse_or(&lookup, "TRADES_SELECTION", defaults.trades_selection)?,
        })
    }

    /// Resolve the predicate for one request
    pub fn selection(&self, mode: SelectionMode) -> MicrositeResult<TradeSelection> {
        match mode {
            SelectionMode::Cutoff => Ok(TradeSelection::AtOrBefore(self.cutoff)),
            SelectionMode::Competition => self
                .competition_id
                .clone()
                .map(TradeSelection::Competition)
                .ok_or_else(|| {
                    MicrositeError::Configuration("COMPETITION_ID not found in environment variables".to_string())
                }),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> MicrositeResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| MicrositeError::Configuration(format!("{}: {}", key, e))),
        None => Ok(default),
    }
}
