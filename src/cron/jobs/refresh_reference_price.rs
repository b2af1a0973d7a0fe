//! Job to refresh the persisted USD reference price.
//!
//! Tries the market providers in order and appends the first successful
//! quote to `reference_price_snapshots`. The serving oracle reads that
//! table, so a single writer keeps every reader consistent.

use anyhow::{bail, Result};
use log::{info, warn};

use crate::db::PostgresClient;
use crate::oracle::PriceProvider;

/// Fetch one quote and persist it with its provider label.
///
/// Returns an error only when every provider fails; the previous persisted
/// quote keeps serving in that case.
pub async fn run(
    postgres: &PostgresClient,
    providers: &[Box<dyn PriceProvider>],
) -> Result<()> {
    let start = std::time::Instant::now();

    for provider in providers {
        match provider.fetch_usd_price().await {
            Ok(price) if price > 0.0 => {
                postgres.insert_reference_price(price, provider.name()).await?;
                info!(
                    "Recorded reference price {:.8} USD from {} in {:?}",
                    price,
                    provider.name(),
                    start.elapsed()
                );
                return Ok(());
            },
            Ok(price) => {
                warn!(
                    "Provider {} returned non-positive price {}, trying next",
                    provider.name(),
                    price
                );
            },
            Err(e) => {
                warn!("Provider {} failed ({:#}), trying next", provider.name(), e);
            },
        }
    }

    bail!("all {} reference price providers failed", providers.len())
}
