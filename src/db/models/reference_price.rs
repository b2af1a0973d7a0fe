use chrono::{DateTime, Utc};
use serde::Serialize;

/// One recorded USD quote for the base token (PostgreSQL
/// `reference_price_snapshots`).
///
/// Appended by the refresh job; the newest row is what the serving oracle
/// caches. `source` labels the provider the quote came from.
#[derive(Debug, Clone, Serialize)]
pub struct ReferencePrice {
    pub price_usd: f64,
    pub source: String,
    pub ts: DateTime<Utc>,
}
