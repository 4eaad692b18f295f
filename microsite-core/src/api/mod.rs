//! REST API for the competition microsite
//!
//! Read-only JSON endpoints consumed by the public statistics site.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use serde_json::json;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::trades::MicrositeError;
use crate::MicrositeService;

/// Request failed in a way the client is not told about
#[derive(Debug)]
pub struct InternalError;

impl warp::reject::Reject for InternalError {}

/// API server for the microsite endpoints
pub struct MicrositeApiServer {
    service: Arc<MicrositeService>,
    addr: SocketAddr,
}

impl MicrositeApiServer {
    pub fn new(service: Arc<MicrositeService>, addr: SocketAddr) -> Self {
        Self { service, addr }
    }

    /// Serve until `shutdown` resolves
    pub async fn start<S>(&self, shutdown: S) -> Result<(), warp::Error>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let (addr, server) = warp::serve(routes(self.service.clone()))
            .try_bind_with_graceful_shutdown(self.addr, shutdown)?;

        info!("Starting microsite API server on {}", addr);
        server.await;
        info!("Microsite API server stopped");
        Ok(())
    }
}

/// All microsite routes, with CORS and error recovery applied
pub fn routes(
    service: Arc<MicrositeService>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    // Health check endpoint
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&json!({
                "status": "ok",
                "service": "microsite-api",
                "timestamp": chrono::Utc::now()
            }))
        });

    let stats = warp::path!("api" / "microsite" / "stats")
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(get_stats);

    let trades = warp::path!("api" / "microsite" / "trades")
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(get_trades);

    // Diagnostic dump of the stored rows
    let raw = warp::path!("api" / "test")
        .and(warp::get())
        .and(with_service(service))
        .and_then(get_raw_trades);

    // Public site, any origin may read
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "OPTIONS"]);

    health
        .or(stats)
        .or(trades)
        .or(raw)
        .with(cors)
        .recover(handle_rejection)
}

fn with_service(
    service: Arc<MicrositeService>,
) -> impl Filter<Extract = (Arc<MicrositeService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

fn internal(context: &str, err: MicrositeError) -> Rejection {
    error!("Error fetching {}: {}", context, err);
    warp::reject::custom(InternalError)
}

/// Get headline statistics
async fn get_stats(service: Arc<MicrositeService>) -> Result<impl Reply, Rejection> {
    let stats = service.stats().await.map_err(|e| internal("stats", e))?;
    Ok(warp::reply::json(&stats))
}

/// Get the public trade listing
async fn get_trades(service: Arc<MicrositeService>) -> Result<impl Reply, Rejection> {
    let trades = service.trades().await.map_err(|e| internal("trades", e))?;
    Ok(warp::reply::json(&trades))
}

/// Get raw trade rows
async fn get_raw_trades(service: Arc<MicrositeService>) -> Result<impl Reply, Rejection> {
    let rows = service.raw_trades().await.map_err(|e| internal("raw trades", e))?;
    Ok(warp::reply::json(&rows))
}

/// Handle API errors
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.find::<InternalError>().is_some() {
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error";
    } else if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Endpoint not found";
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed";
    } else {
        error!("Unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error";
    }

    let json = warp::reply::json(&json!({ "error": message }));
    Ok(warp::reply::with_status(json, code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MicrositeConfig, SelectionMode};
    use crate::trades::{CanonicalTrade, MicrositeResult, TradeSelection, TradeSource};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    /// In-memory source recording the selections it was asked for
    #[derive(Default)]
    struct StaticTradeSource {
        trades: Vec<CanonicalTrade>,
        failing: bool,
        selections: Mutex<Vec<TradeSelection>>,
    }

    #[async_trait]
    impl TradeSource for StaticTradeSource {
        async fn fetch_trades(&self, selection: &TradeSelection) -> MicrositeResult<Vec<CanonicalTrade>> {
            self.selections.lock().unwrap().push(selection.clone());
            if self.failing {
                return Err(MicrositeError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(self.trades.clone())
        }

        async fn fetch_raw(&self) -> MicrositeResult<Vec<Value>> {
            if self.failing {
                return Err(MicrositeError::Database(sqlx::Error::PoolClosed));
            }
            Ok(self
                .trades
                .iter()
                .map(|t| json!({ "id": t.id, "trade_amount_usd": t.notional_usd }))
                .collect())
        }

        fn schema_name(&self) -> &str {
            "static"
        }
    }

    fn sample_trades() -> Vec<CanonicalTrade> {
        vec![
            CanonicalTrade {
                id: "t-2".to_string(),
                agent_id: Some("agent-1".to_string()),
                notional_usd: 100.0,
                to_token_symbol: "ETH".to_string(),
                to_chain: "ethereum".to_string(),
                to_specific_chain: Some("op-mainnet".to_string()),
                ..Default::default()
            },
            CanonicalTrade {
                id: "t-1".to_string(),
                to_token_symbol: "ETH".to_string(),
                to_chain: "polygon".to_string(),
                ..Default::default()
            },
        ]
    }

    fn config_with_competition(competition_id: Option<&str>) -> MicrositeConfig {
        MicrositeConfig {
            competition_id: competition_id.map(str::to_string),
            ..Default::default()
        }
    }

    fn service(source: Arc<StaticTradeSource>, config: MicrositeConfig) -> Arc<MicrositeService> {
        Arc::new(MicrositeService::new(source, Arc::new(config)))
    }

    async fn get(service: Arc<MicrositeService>, path: &str) -> (StatusCode, Value) {
        let res = warp::test::request()
            .method("GET")
            .path(path)
            .reply(&routes(service))
            .await;
        let body = serde_json::from_slice(res.body()).unwrap_or(Value::Null);
        (res.status(), body)
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let source = Arc::new(StaticTradeSource { trades: sample_trades(), ..Default::default() });
        let config = config_with_competition(None);
        let cutoff = config.cutoff;

        let (status, body) = get(service(source.clone(), config), "/api/microsite/stats").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({
            "totalNotionalTradedUsd": 100.0,
            "totalTrades": 2,
            "totalTokensTraded": 1,
            "totalChainsTraded": 2,
        }));
        assert_eq!(*source.selections.lock().unwrap(), vec![TradeSelection::AtOrBefore(cutoff)]);
    }

    #[tokio::test]
    async fn test_trades_endpoint_uses_competition() {
        let source = Arc::new(StaticTradeSource { trades: sample_trades(), ..Default::default() });

        let (status, body) = get(
            service(source.clone(), config_with_competition(Some("comp-7"))),
            "/api/microsite/trades",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let listed = body.as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["id"], "t-2");
        assert_eq!(listed[0]["toSpecificChain"], "op-mainnet");
        assert_eq!(listed[1]["id"], "t-1");
        assert_eq!(listed[1]["agentId"], Value::Null);
        assert_eq!(listed[1]["reason"], "");
        assert_eq!(
            *source.selections.lock().unwrap(),
            vec![TradeSelection::Competition("comp-7".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_competition_id_is_internal_error() {
        let source = Arc::new(StaticTradeSource { trades: sample_trades(), ..Default::default() });

        let (status, body) = get(service(source.clone(), config_with_competition(None)), "/api/microsite/trades").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));
        // Fails before touching the store
        assert!(source.selections.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() {
        let source = Arc::new(StaticTradeSource { failing: true, ..Default::default() });
        let config = MicrositeConfig {
            stats_selection: SelectionMode::Competition,
            ..config_with_competition(Some("comp-7"))
        };
        let service = service(source, config);

        for path in ["/api/microsite/stats", "/api/microsite/trades", "/api/test"] {
            let (status, body) = get(service.clone(), path).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", path);
            assert_eq!(body, json!({ "error": "Internal server error" }), "{}", path);
        }
    }

    #[tokio::test]
    async fn test_raw_endpoint() {
        let source = Arc::new(StaticTradeSource { trades: sample_trades(), ..Default::default() });

        let (status, body) = get(service(source, config_with_competition(None)), "/api/test").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([
            { "id": "t-2", "trade_amount_usd": 100.0 },
            { "id": "t-1", "trade_amount_usd": 0.0 },
        ]));
    }

    #[tokio::test]
    async fn test_empty_store() {
        let source = Arc::new(StaticTradeSource::default());
        let service = service(source, config_with_competition(Some("comp-7")));

        let (status, body) = get(service.clone(), "/api/microsite/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalTrades"], 0);

        let (status, body) = get(service, "/api/microsite/trades").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_health_and_unknown_path() {
        let service = service(Arc::new(StaticTradeSource::default()), config_with_competition(None));

        let (status, body) = get(service.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get(service, "/api/microsite/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Endpoint not found");
    }

    #[tokio::test]
    async fn test_post_is_rejected() {
        let service = service(Arc::new(StaticTradeSource::default()), config_with_competition(None));

        let res = warp::test::request()
            .method("POST")
            .path("/api/microsite/stats")
            .reply(&routes(service))
            .await;

        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
