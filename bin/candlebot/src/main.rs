use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::Config;
use engine::{BinanceMarketData, ConnectorSettings, Engine, Ports};
use store::{MemoryStore, SqliteStore};
use strategy::BotFileConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(account = %cfg.account_name, bots_file = %cfg.bots_config_path, "candlebot starting");

    let bots = BotFileConfig::load(&cfg.bots_config_path)?;

    // ── Stores ────────────────────────────────────────────────────────────────
    let ports = match &cfg.database_url {
        Some(url) => Ports::shared(Arc::new(
            SqliteStore::connect(url)
                .await
                .with_context(|| format!("failed to open database {url}"))?,
        )),
        None => {
            warn!("DATABASE_URL not set, positions and logs are kept in memory only");
            Ports::shared(Arc::new(MemoryStore::new()))
        }
    };

    // ── Exchange ──────────────────────────────────────────────────────────────
    let market = BinanceMarketData::new(&cfg.binance_rest_url, &cfg.binance_ws_url)?;

    // ── Engine ────────────────────────────────────────────────────────────────
    let engine = Engine::new(cfg.account(), Arc::new(market), ports, ConnectorSettings::try_from(&cfg)?);
    let started = engine.start_all(&bots).await;
    info!(started, configured = bots.bots.len(), "bots started");

    // ── API ───────────────────────────────────────────────────────────────────
    let api_state = api::AppState::from(&engine);
    let port = cfg.api_port;
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_state, port).await {
            error!(error = %e, "API server stopped");
        }
    });

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping bots.");
    engine.shutdown().await;
    Ok(())
}
