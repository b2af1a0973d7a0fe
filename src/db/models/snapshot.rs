use chrono::{DateTime, Utc};
use serde::Serialize;

/// One observation of a pool's reserves and derived price (PostgreSQL
/// `pool_snapshots`).
///
/// Population: external on-chain reader at a fixed cadence.
/// Immutable once written; ordered by `ts` per pool.
///
/// Query Patterns:
///   - "Latest snapshot per pool" (market view)
///   - "Snapshot at or before a window boundary" (price change stats)
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub pool_address: String,
    pub name: String,
    pub ts: DateTime<Utc>,

    /// Quote-token price denominated in the base token.
    pub price_base: f64,
    pub reserve_base: f64,
    pub reserve_quote: f64,

    pub base_token: String,
    pub quote_token: String,
}
