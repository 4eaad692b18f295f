//! Competition Microsite Server
//!
//! Serves the read-only microsite statistics API over a PostgreSQL trade
//! store until interrupted.

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use microsite_core::{
    MicrositeApiServer, MicrositeConfig, MicrositeService, ObjectIndexSource, SelectionMode,
    StoreSchema, TradeSource, TradesTableSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 Starting Competition Microsite API");

    let config = Arc::new(MicrositeConfig::from_env()?);
    if config.competition_id.is_none()
        && (config.stats_selection == SelectionMode::Competition
            || config.trades_selection == SelectionMode::Competition)
    {
        warn!("COMPETITION_ID is not set; competition-scoped endpoints will fail");
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    info!("✅ Connected to trade store ({} connections max)", config.max_connections);

    let source: Arc<dyn TradeSource> = match config.store_schema {
        StoreSchema::Trades => Arc::new(TradesTableSource::new(pool.clone())),
        StoreSchema::ObjectIndex => Arc::new(ObjectIndexSource::new(pool.clone())),
    };
    info!("📈 Reading trades from the {} schema", source.schema_name());

    let service = Arc::new(MicrositeService::new(source, config.clone()));
    let server = MicrositeApiServer::new(service, config.bind_addr);

    server
        .start(async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("🛑 Shutdown signal received...");
        })
        .await?;

    pool.close().await;
    info!("✅ Microsite API shutdown complete");
    Ok(())
}
