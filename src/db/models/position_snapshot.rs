use chrono::{DateTime, Utc};
use serde::Serialize;

/// One observation of a wallet's LP stake in a pool (PostgreSQL
/// `position_snapshots`).
///
/// Population: external LP reader, append-only per wallet+pool.
///
/// Invariants: `lp_share` in [0, 1]; `lp_balance >= 0`. `pool_apr` is a
/// trailing realized-fee APR recorded upstream and treated as opaque here;
/// it is absent until the position has enough fee history.
#[derive(Debug, Clone, Serialize)]
pub struct PositionSnapshot {
    pub wallet_address: String,
    pub pool_address: String,
    pub name: String,
    pub ts: DateTime<Utc>,

    /// Quote-token price in base at snapshot time.
    pub price_base: f64,
    pub lp_balance: f64,
    pub lp_share: f64,
    /// The wallet's proportional claim on each reserve side.
    pub user_base: f64,
    pub user_quote: f64,

    pub volume_24h: f64,
    pub volume_7d: f64,
    pub fee_earn_24h: f64,
    pub fee_earn_7d: f64,
    pub pool_apr: Option<f64>,
}
