//! Cron scheduler for periodic background tasks.
//!
//! Runs jobs like:
//! - Refreshing the persisted USD reference price from the market providers
//! - Evaluating the tracked wallet and logging suggested actions

use std::sync::Arc;

use anyhow::Result;
use log::{error, info};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use crate::db::PostgresClient;
use crate::oracle::PriceProvider;

use super::jobs;
use super::jobs::strategy_tick::TickContext;

/// Cron scheduler that manages periodic background jobs.
pub struct CronScheduler {
    postgres: Arc<PostgresClient>,
    price_providers: Arc<Vec<Box<dyn PriceProvider>>>,
    tick: Arc<TickContext>,
    settings: Arc<CronSettings>,
}

/// Configuration for cron job intervals
#[derive(Debug, Clone)]
pub struct CronSettings {
    /// Interval for refreshing the persisted reference price - default 5 minutes
    pub refresh_price_interval_secs: u64,
    /// Interval for the strategy evaluation tick - default 15 minutes
    pub strategy_tick_interval_secs: u64,
}

impl Default for CronSettings {
    fn default() -> Self {
        Self {
            refresh_price_interval_secs: 300, // 5 minutes
            strategy_tick_interval_secs: 900, // 15 minutes
        }
    }
}

impl CronScheduler {
    pub fn new(
        postgres: Arc<PostgresClient>,
        price_providers: Arc<Vec<Box<dyn PriceProvider>>>,
        tick: Arc<TickContext>,
        settings: CronSettings,
    ) -> Self {
        Self {
            postgres,
            price_providers,
            tick,
            settings: Arc::new(settings),
        }
    }

    /// Starts the cron scheduler and runs until cancellation.
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        let mut scheduler = JobScheduler::new().await?;

        // Register all jobs
        self.register_refresh_reference_price_job(&scheduler).await?;
        self.register_strategy_tick_job(&scheduler).await?;

        // Start the scheduler
        scheduler.start().await?;
        info!("Cron scheduler started with {} jobs", 2);

        // Wait for cancellation
        cancellation_token.cancelled().await;
        info!("Cron scheduler shutting down...");

        scheduler.shutdown().await?;
        Ok(())
    }

    async fn register_refresh_reference_price_job(
        &self,
        scheduler: &JobScheduler,
    ) -> Result<()> {
        let postgres = self.postgres.clone();
        let providers = self.price_providers.clone();
        let interval = self.settings.refresh_price_interval_secs;

        let job = Job::new_repeated_async(
            std::time::Duration::from_secs(interval),
            move |_uuid, _lock| {
                let postgres = postgres.clone();
                let providers = providers.clone();
                Box::pin(async move {
                    if let Err(e) =
                        jobs::refresh_reference_price::run(&postgres, &providers).await
                    {
                        error!("Failed to refresh reference price: {:#}", e);
                    }
                })
            },
        )?;

        scheduler.add(job).await?;
        info!("Registered refresh_reference_price job (every {}s)", interval);
        Ok(())
    }

    async fn register_strategy_tick_job(&self, scheduler: &JobScheduler) -> Result<()> {
        let tick = self.tick.clone();
        let interval = self.settings.strategy_tick_interval_secs;

        let job = Job::new_repeated_async(
            std::time::Duration::from_secs(interval),
            move |_uuid, _lock| {
                let tick = tick.clone();
                Box::pin(async move {
                    if let Err(e) = jobs::strategy_tick::run(&tick).await {
                        error!("Strategy tick failed: {:#}", e);
                    }
                })
            },
        )?;

        scheduler.add(job).await?;
        info!("Registered strategy_tick job (every {}s)", interval);
        Ok(())
    }
}
