use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use poolsight::{
    cron::jobs::strategy_tick::TickContext,
    oracle::{DexscreenerProvider, MexcProvider, PriceProvider, StoredPriceProvider},
    CronScheduler, CronSettings, MarketAggregator, PositionValuationEngine, PostgresClient,
    PriceOracle, Settings, StrategyEngine,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    // Load configuration
    let settings = Arc::new(
        Settings::new()
            .context("Failed to load config.yaml. Please ensure it exists and is valid")?,
    );

    let postgres = Arc::new(
        PostgresClient::new(settings.postgres.clone())
            .await
            .context("Failed to initialize database connection")?,
    );
    postgres.migrate().await?;

    // The serving oracle reads the persisted price history; the refresh job
    // below keeps that history fresh from the market providers.
    let oracle = Arc::new(PriceOracle::new(
        vec![Box::new(StoredPriceProvider::new(postgres.clone())) as Box<dyn PriceProvider>],
        settings.oracle.ttl_secs,
        settings.oracle.fallback_price_usd,
    ));

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    let mut market_providers: Vec<Box<dyn PriceProvider>> = Vec::new();
    if !settings.oracle.mexc_symbol.is_empty() {
        market_providers.push(Box::new(MexcProvider::new(
            http.clone(),
            settings.oracle.mexc_symbol.clone(),
        )));
    }
    if !settings.oracle.dexscreener_token.is_empty() {
        market_providers.push(Box::new(DexscreenerProvider::new(
            http.clone(),
            settings.oracle.dexscreener_token.clone(),
        )));
    }

    let market = MarketAggregator::new(
        postgres.clone(),
        postgres.clone(),
        settings.analytics.fee_rate,
    );
    let valuation = PositionValuationEngine::new(
        postgres.clone(),
        oracle.clone(),
        settings.analytics.min_days_for_annualization,
    );
    let strategy = StrategyEngine::new(settings.strategy.clone(), settings.analytics.fee_rate);

    let tick = Arc::new(TickContext {
        wallet_address: settings.strategy.wallet_address.clone(),
        market,
        valuation,
        strategy,
        oracle: oracle.clone(),
        discover_top_n: settings.strategy.discover_top_n,
    });

    let cancellation_token = CancellationToken::new();

    // Spawn the cron scheduler for background jobs
    // (reference price refresh, strategy tick)
    let cron_scheduler = CronScheduler::new(
        postgres.clone(),
        Arc::new(market_providers),
        tick,
        CronSettings::default(),
    );

    let cron_token = cancellation_token.child_token();
    let cron_handle = tokio::spawn(async move {
        if let Err(e) = cron_scheduler.run(cron_token).await {
            log::error!("Cron scheduler failed: {:#}", e);
        }
    });

    info!("Cron scheduler started - background jobs will run periodically");

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    // Set up graceful shutdown signal handler
    info!("Engine running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    // Cancel all running tasks
    info!("Finishing all tasks...");

    cancellation_token.cancel();

    // Wait for cron scheduler to stop
    info!("Waiting for cron scheduler to stop...");
    let _ = cron_handle.await;

    info!("All tasks stopped");
    Ok(())
}
