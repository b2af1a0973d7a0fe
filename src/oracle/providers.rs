//! Price provider implementations.
//!
//! Resolution order in production: the serving oracle reads the persisted
//! price history (`StoredPriceProvider`), which the refresh job keeps fresh
//! from the market providers (`MexcProvider`, then `DexscreenerProvider`).

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::PriceProvider;
use crate::db::PostgresClient;

const MEXC_TICKER_URL: &str = "https://api.mexc.com/api/v3/ticker/price";
const DEXSCREENER_TOKEN_URL: &str = "https://api.dexscreener.com/latest/dex/tokens";

/// Latest persisted reference price, written by the refresh job.
pub struct StoredPriceProvider {
    postgres: Arc<PostgresClient>,
}

impl StoredPriceProvider {
    pub fn new(postgres: Arc<PostgresClient>) -> Self {
        Self { postgres }
    }
}

#[async_trait]
impl PriceProvider for StoredPriceProvider {
    fn name(&self) -> &str {
        "stored"
    }

    async fn fetch_usd_price(&self) -> anyhow::Result<f64> {
        let latest = self
            .postgres
            .latest_reference_price()
            .await?
            .context("no reference price recorded yet")?;
        Ok(latest.price_usd)
    }
}

/// MEXC spot ticker for the configured symbol.
pub struct MexcProvider {
    http: reqwest::Client,
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct MexcTicker {
    price: String,
}

impl MexcProvider {
    pub fn new(http: reqwest::Client, symbol: impl Into<String>) -> Self {
        Self {
            http,
            symbol: symbol.into(),
        }
    }
}

#[async_trait]
impl PriceProvider for MexcProvider {
    fn name(&self) -> &str {
        "mexc"
    }

    async fn fetch_usd_price(&self) -> anyhow::Result<f64> {
        let url = format!("{}?symbol={}", MEXC_TICKER_URL, self.symbol);
        let ticker: MexcTicker = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("unexpected MEXC ticker response")?;

        ticker
            .price
            .parse::<f64>()
            .context("MEXC ticker price is not a number")
    }
}

/// Dexscreener token endpoint; quotes come from the first listed pair.
pub struct DexscreenerProvider {
    http: reqwest::Client,
    token_address: String,
}

#[derive(Debug, Deserialize)]
struct DexscreenerResponse {
    #[serde(default)]
    pairs: Option<Vec<DexscreenerPair>>,
}

#[derive(Debug, Deserialize)]
struct DexscreenerPair {
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
}

impl DexscreenerProvider {
    pub fn new(http: reqwest::Client, token_address: impl Into<String>) -> Self {
        Self {
            http,
            token_address: token_address.into(),
        }
    }
}

#[async_trait]
impl PriceProvider for DexscreenerProvider {
    fn name(&self) -> &str {
        "dexscreener"
    }

    async fn fetch_usd_price(&self) -> anyhow::Result<f64> {
        let url = format!("{}/{}", DEXSCREENER_TOKEN_URL, self.token_address);
        let response: DexscreenerResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("unexpected Dexscreener response")?;

        let first = response
            .pairs
            .unwrap_or_default()
            .into_iter()
            .next()
            .context("no pairs in Dexscreener response")?;

        first
            .price_usd
            .context("missing priceUsd in Dexscreener response")?
            .parse::<f64>()
            .context("Dexscreener priceUsd is not a number")
    }
}
