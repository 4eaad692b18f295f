//! PostgreSQL trade sources
//!
//! Two physical layouts hold the same trades: the typed `trades` table and
//! the generic `object_index` table whose `data` column carries a JSON
//! payload per record. Both normalize into [`CanonicalTrade`].

use super::errors::MicrositeResult;
use super::normalizers::{coerce_timestamp, decode_payload, normalize_trade};
use super::types::{CanonicalTrade, PartialTrade};
use super::{TradeSelection, TradeSource};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::QueryAs;
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};

const TRADES_SELECT: &str = r#"
    SELECT
        t.id::text AS id,
        t.agent_id::text AS agent_id,
        t.from_amount::float8 AS from_amount,
        t.to_amount::float8 AS to_amount,
        t.from_token,
        t.to_token,
        t.from_token_symbol,
        t.to_token_symbol,
        t.from_chain,
        t.to_chain,
        t.from_specific_chain,
        t.to_specific_chain,
        t.trade_amount_usd::float8 AS trade_amount_usd,
        t.reason,
        t."timestamp"::timestamptz AS "timestamp",
        a.id::text AS microsite_id
    FROM trades t
    LEFT JOIN agents a ON a.id = t.agent_id
"#;

const OBJECT_INDEX_SELECT: &str = r#"
    SELECT
        o.id::text AS id,
        o.agent_id::text AS agent_id,
        o.data::text AS data,
        o.event_timestamp::timestamptz AS event_timestamp,
        a.id::text AS microsite_id
    FROM object_index o
    LEFT JOIN agents a ON a.id = o.agent_id
    WHERE o.type = 'trade'
"#;

/// Row of the typed `trades` table
#[derive(Debug, Clone, Default, FromRow)]
pub struct TradeRow {
    pub id: String,
    pub agent_id: Option<String>,
    pub from_amount: Option<f64>,
    pub to_amount: Option<f64>,
    pub from_token: Option<String>,
    pub to_token: Option<String>,
    pub from_token_symbol: Option<String>,
    pub to_token_symbol: Option<String>,
    pub from_chain: Option<String>,
    pub to_chain: Option<String>,
    pub from_specific_chain: Option<String>,
    pub to_specific_chain: Option<String>,
    pub trade_amount_usd: Option<f64>,
    pub reason: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub microsite_id: Option<String>,
}

impl From<TradeRow> for PartialTrade {
    fn from(row: TradeRow) -> Self {
        Self {
            id: Some(row.id),
            agent_id: row.agent_id,
            from_amount: row.from_amount.and_then(number_value),
            to_amount: row.to_amount.and_then(number_value),
            from_token: row.from_token,
            to_token: row.to_token,
            from_token_symbol: row.from_token_symbol,
            to_token_symbol: row.to_token_symbol,
            from_chain: row.from_chain,
            to_chain: row.to_chain,
            from_specific_chain: row.from_specific_chain,
            to_specific_chain: row.to_specific_chain,
            notional_usd: row.trade_amount_usd.and_then(number_value),
            trade_amount_usd: None,
            reason: row.reason,
            timestamp: row.timestamp.map(timestamp_value),
            microsite_id: row.microsite_id,
        }
    }
}

/// Envelope row of the `object_index` table
#[derive(Debug, Clone, Default, FromRow)]
pub struct ObjectIndexRow {
    pub id: String,
    pub agent_id: Option<String>,
    pub data: Option<String>,
    pub event_timestamp: Option<DateTime<Utc>>,
    pub microsite_id: Option<String>,
}

impl ObjectIndexRow {
    /// Merge envelope and payload. A payload that fails to decode yields an
    /// empty trade body; the envelope fields are kept either way.
    pub fn into_partial(self) -> PartialTrade {
        let mut partial = match self.data.as_deref().map(decode_payload) {
            Some(Ok(partial)) => partial,
            Some(Err(e)) => {
                warn!("Trade payload for object {} could not be decoded: {}", self.id, e);
                PartialTrade::default()
            }
            None => {
                warn!("Trade object {} has no payload", self.id);
                PartialTrade::default()
            }
        };

        partial.id = Some(self.id);
        partial.agent_id = self.agent_id;
        partial.microsite_id = self.microsite_id;
        // An unparsable payload time counts as absent
        if coerce_timestamp(partial.timestamp.as_ref()).is_none() {
            partial.timestamp = self.event_timestamp.map(timestamp_value);
        }
        partial
    }
}

fn number_value(n: f64) -> Option<Value> {
    serde_json::Number::from_f64(n).map(Value::Number)
}

fn timestamp_value(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// SQL predicate for a selection, bound as `$1`
fn predicate_sql(selection: &TradeSelection, timestamp_column: &str, competition_column: &str) -> String {
    match selection {
        TradeSelection::AtOrBefore(_) => format!("{} <= $1", timestamp_column),
        TradeSelection::Competition(_) => format!("{}::text = $1", competition_column),
    }
}

fn bind_selection<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    selection: &'q TradeSelection,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    match selection {
        TradeSelection::AtOrBefore(cutoff) => query.bind(*cutoff),
        TradeSelection::Competition(id) => query.bind(id.as_str()),
    }
}

/// Source backed by the typed `trades` table
#[derive(Debug, Clone)]
pub struct TradesTableSource {
    pool: PgPool,
}

impl TradesTableSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TradeSource for TradesTableSource {
    async fn fetch_trades(&self, selection: &TradeSelection) -> MicrositeResult<Vec<CanonicalTrade>> {
        let sql = format!(
            "{} WHERE {}",
            TRADES_SELECT,
            predicate_sql(selection, r#"t."timestamp""#, "t.competition_id")
        );

        // Returned to the pool when dropped, on every exit path
        let mut conn = self.pool.acquire().await?;
        debug!("Acquired connection for trades query ({})", selection);

        let rows = bind_selection(sqlx::query_as::<_, TradeRow>(&sql), selection)
            .fetch_all(&mut *conn)
            .await?;

        debug!("Fetched {} trade rows", rows.len());
        Ok(rows
            .into_iter()
            .map(|row| normalize_trade(row.into()))
            .collect())
    }

    async fn fetch_raw(&self) -> MicrositeResult<Vec<Value>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_scalar::<_, Value>("SELECT to_jsonb(t) FROM trades t")
            .fetch_all(&mut *conn)
            .await?;

        debug!("Fetched {} raw trade rows", rows.len());
        Ok(rows)
    }

    fn schema_name(&self) -> &str {
        "trades"
    }
}

/// Source backed by the generic `object_index` table
#[derive(Debug, Clone)]
pub struct ObjectIndexSource {
    pool: PgPool,
}

impl ObjectIndexSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TradeSource for ObjectIndexSource {
    async fn fetch_trades(&self, selection: &TradeSelection) -> MicrositeResult<Vec<CanonicalTrade>> {
        let sql = format!(
            "{} AND {}",
            OBJECT_INDEX_SELECT,
            predicate_sql(selection, "o.event_timestamp", "o.competition_id")
        );

        // Returned to the pool when dropped, on every exit path
        let mut conn = self.pool.acquire().await?;
        debug!("Acquired connection for object_index query ({})", selection);

        let rows = bind_selection(sqlx::query_as::<_, ObjectIndexRow>(&sql), selection)
            .fetch_all(&mut *conn)
            .await?;

        debug!("Fetched {} trade objects", rows.len());
        Ok(rows
            .into_iter()
            .map(|row| normalize_trade(row.into_partial()))
            .collect())
    }

    async fn fetch_raw(&self) -> MicrositeResult<Vec<Value>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_scalar::<_, Value>(
            "SELECT to_jsonb(o) FROM object_index o WHERE o.type = 'trade'",
        )
        .fetch_all(&mut *conn)
        .await?;

        debug!("Fetched {} raw trade objects", rows.len());
        Ok(rows)
    }

    fn schema_name(&self) -> &str {
        "object_index"
    }
}
