//! Typed storage boundary.
//!
//! The analytics core never builds SQL; it consumes already-typed records
//! through the two store traits below. `PostgresClient` is the production
//! implementation; tests substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod models;
pub mod postgres;

pub use postgres::PostgresClient;

use models::{PositionSnapshot, Snapshot, TradeEvent};

/// Read-side source of pool snapshots and trade events.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// The most recent snapshot of every tracked pool.
    async fn latest_snapshots(&self) -> anyhow::Result<Vec<Snapshot>>;

    /// The most recent snapshot at or before `cutoff`, if any exists.
    async fn snapshot_before(
        &self,
        pool_address: &str,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<Option<Snapshot>>;

    /// All trade events for a pool with `ts >= since`, ascending by `ts`.
    async fn trade_events_since(
        &self,
        pool_address: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TradeEvent>>;
}

/// Read-side source of a wallet's LP position history.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Full position history for a wallet, ascending by `ts` within each pool.
    async fn position_history(
        &self,
        wallet_address: &str,
    ) -> anyhow::Result<Vec<PositionSnapshot>>;

    /// The latest position snapshot per pool for a wallet.
    async fn latest_positions(
        &self,
        wallet_address: &str,
    ) -> anyhow::Result<Vec<PositionSnapshot>>;
}
