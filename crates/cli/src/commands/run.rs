//! The `run` command: builds the application context and drives the three
//! long-running loops until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;

use surgewatch_binance::{partition_by_letter, BinanceClient, BinanceFeed, UniverseSync};
use surgewatch_core::traits::{AlertBroadcast, AlertNotifier, MarketApi, MarketFeed};
use surgewatch_core::{AppConfig, ConfigLoader};
use surgewatch_data::{AlertRepository, AlertStore, DatabaseClient};
use surgewatch_relay::{RelayServer, RelayState, TelegramNotifier};
use surgewatch_screener::{AlertSink, DetectionThresholds, FeedDriver, Screener};

/// Everything the loops share, built once at startup.
struct AppContext {
    config: AppConfig,
    store: Arc<dyn AlertStore>,
    api: Arc<dyn MarketApi>,
    feed: Arc<dyn MarketFeed>,
    notifier: Arc<dyn AlertNotifier>,
    relay_state: Arc<RelayState>,
}

impl AppContext {
    async fn build(config_path: &str) -> Result<Self> {
        let config = ConfigLoader::load(config_path).context("config load failed")?;

        let db = DatabaseClient::new(&config.database.url, config.database.max_connections)
            .await
            .context("database connection failed")?;
        db.ensure_schema().await.context("schema bootstrap failed")?;

        let store: Arc<dyn AlertStore> = Arc::new(AlertRepository::new(db.pool()));
        let api: Arc<dyn MarketApi> = Arc::new(BinanceClient::new(config.binance.api_url.clone()));
        let feed: Arc<dyn MarketFeed> = Arc::new(BinanceFeed::new(config.binance.ws_url.clone()));
        let notifier: Arc<dyn AlertNotifier> = Arc::new(TelegramNotifier::new(&config.telegram));
        let relay_state = Arc::new(RelayState::new(config.relay.max_pending_alerts));

        Ok(Self {
            config,
            store,
            api,
            feed,
            notifier,
            relay_state,
        })
    }
}

pub async fn run_daemon(config_path: &str) -> Result<()> {
    let ctx = AppContext::build(config_path).await?;

    ctx.notifier.notify("surgewatch started").await;

    // Initial universe split across the two kline shards
    let symbols = match ctx.api.tradable_symbols().await {
        Ok(symbols) => symbols,
        Err(e) => {
            // The resync loop fills the gap on its next cycle
            tracing::error!("Initial symbol listing failed: {}", e);
            Vec::new()
        }
    };
    let (first_half, second_half) = partition_by_letter(&symbols, ctx.config.universe.split_letter);
    tracing::info!(
        "Universe: {} symbols ({} / {} per shard)",
        symbols.len(),
        first_half.len(),
        second_half.len()
    );

    let first_shard = ctx.feed.create_stream("kline-1m-a", &first_half).await?;
    let second_shard = ctx.feed.create_stream("kline-1m-b", &second_half).await?;

    let screener = Arc::new(Screener::new(
        DetectionThresholds::from(&ctx.config.screener),
        Arc::clone(&ctx.store),
        Arc::clone(&ctx.api),
    ));
    let sink = Arc::new(AlertSink::new(
        Arc::clone(&ctx.store),
        Arc::clone(&ctx.relay_state) as Arc<dyn AlertBroadcast>,
        Arc::clone(&ctx.notifier),
    ));
    let mut driver = FeedDriver::new(Arc::clone(&ctx.feed), screener, sink);

    let universe_sync = UniverseSync::new(
        Arc::clone(&ctx.api),
        Arc::clone(&ctx.feed),
        first_shard,
        second_shard,
        ctx.config.universe.split_letter,
        Duration::from_secs(ctx.config.universe.resync_interval_secs),
    );

    let addr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let relay_server = RelayServer::new(
        &ctx.config.relay,
        Arc::clone(&ctx.relay_state),
        Arc::clone(&ctx.notifier),
        shutdown_rx.clone(),
    );

    let driver_task = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move { driver.run(shutdown).await }
    });
    let resync_task = tokio::spawn({
        let shutdown = shutdown_rx;
        async move { universe_sync.run(shutdown).await }
    });
    let mut server_task = tokio::spawn(async move { relay_server.serve(&addr).await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
        result = &mut server_task => {
            let _ = shutdown_tx.send(true);
            let _ = tokio::join!(driver_task, resync_task);
            // A relay that stops on its own (e.g. bind failure) is fatal
            result?.context("alert relay failed")?;
            anyhow::bail!("alert relay exited unexpectedly");
        }
    }

    let (driver_result, resync_result, server_result) =
        tokio::join!(driver_task, resync_task, &mut server_task);
    driver_result.context("feed driver task panicked")?;
    resync_result.context("resync task panicked")?;
    server_result.context("relay task panicked")??;

    tracing::info!("Stopped");
    Ok(())
}
