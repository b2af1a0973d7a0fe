//! USD reference price oracle.
//!
//! Everything in the engine is denominated in the base token; a single USD
//! reference price converts those figures into USD mirrors. The oracle keeps
//! one cached value with a TTL and refreshes it from an ordered provider
//! chain — first success wins. On total provider failure it keeps serving
//! the last known value, so a flaky upstream degrades to staleness, never to
//! an error. A price of 0 means "unknown" and suppresses USD mirrors
//! downstream.

mod providers;

pub use providers::{DexscreenerProvider, MexcProvider, StoredPriceProvider};

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::warn;

/// External source of the USD reference price.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Short label used in logs and the persisted price history.
    fn name(&self) -> &str;

    /// Fetch the current USD price. Any error counts as provider failure.
    async fn fetch_usd_price(&self) -> anyhow::Result<f64>;
}

#[derive(Debug, Clone, Copy)]
struct CacheSlot {
    price_usd: f64,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Cached USD reference price with TTL and stale fallback.
///
/// The cache is a single slot behind a lock; a lost refresh race just means
/// two writers store equally fresh values (single-writer-wins is fine).
/// The timestamp only advances on a successful refresh.
pub struct PriceOracle {
    providers: Vec<Box<dyn PriceProvider>>,
    ttl: Duration,
    slot: RwLock<CacheSlot>,
}

impl PriceOracle {
    pub fn new(
        providers: Vec<Box<dyn PriceProvider>>,
        ttl_secs: u64,
        fallback_price_usd: f64,
    ) -> Self {
        Self {
            providers,
            ttl: Duration::seconds(ttl_secs as i64),
            slot: RwLock::new(CacheSlot {
                price_usd: fallback_price_usd,
                refreshed_at: None,
            }),
        }
    }

    /// Current USD reference price. 0.0 means "unknown"; never an error.
    pub async fn reference_price_usd(&self) -> f64 {
        self.price_at(Utc::now()).await
    }

    /// TTL check against an explicit `now` so tests control the clock.
    async fn price_at(&self, now: DateTime<Utc>) -> f64 {
        {
            let slot = self.slot.read().unwrap();
            if let Some(at) = slot.refreshed_at {
                if now - at < self.ttl && slot.price_usd > 0.0 {
                    return slot.price_usd;
                }
            }
        }

        for provider in &self.providers {
            match provider.fetch_usd_price().await {
                Ok(price) if price > 0.0 => {
                    let mut slot = self.slot.write().unwrap();
                    slot.price_usd = price;
                    slot.refreshed_at = Some(now);
                    return price;
                },
                Ok(price) => {
                    warn!(
                        "Price provider {} returned non-positive price {}",
                        provider.name(),
                        price
                    );
                },
                Err(e) => {
                    warn!("Price provider {} failed: {:#}", provider.name(), e);
                },
            }
        }

        // Every provider exhausted: serve whatever the slot still holds.
        self.slot.read().unwrap().price_usd
    }
}
