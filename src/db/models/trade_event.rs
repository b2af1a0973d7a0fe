use chrono::{DateTime, Utc};
use serde::Serialize;

/// One decoded swap (PostgreSQL `trade_events`).
///
/// Uniquely identified by `(pool_address, tx_hash, log_index)`; append-only.
/// The engine only ever consumes these in aggregate, summing `base_amount`
/// over trailing time windows.
#[derive(Debug, Clone, Serialize)]
pub struct TradeEvent {
    pub pool_address: String,
    pub base_token: String,
    pub block_number: i64,
    pub tx_hash: String,
    pub log_index: i32,
    pub ts: DateTime<Utc>,

    /// Base-token side of the swap, decimal-adjusted.
    pub base_amount: f64,
}
