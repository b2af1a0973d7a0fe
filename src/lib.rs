pub mod analytics;
pub mod config;
pub mod cron;
pub mod db;
pub mod oracle;
pub mod strategy;

pub use analytics::{MarketAggregator, PositionValuationEngine};
pub use config::Settings;
pub use cron::{CronScheduler, CronSettings};
pub use db::PostgresClient;
pub use oracle::PriceOracle;
pub use strategy::StrategyEngine;
