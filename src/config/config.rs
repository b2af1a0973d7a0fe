use config::{Config, ConfigError, File};
use serde::Deserialize;

/// PostgreSQL database connection configuration.
///
/// Used for reading the snapshot, trade and position history tables and
/// for appending reference price snapshots.
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    16
}

/// USD reference price oracle configuration.
///
/// The oracle serves one cached value with a TTL; on total provider failure
/// it keeps returning the last known value. A fallback of 0 means "unknown"
/// and suppresses every USD-denominated mirror downstream.
#[derive(Debug, Deserialize, Clone)]
pub struct OracleSettings {
    #[serde(default = "default_price_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default)]
    pub fallback_price_usd: f64,
    /// Spot symbol on MEXC (e.g. "VEEUSDT"). Empty disables the provider.
    #[serde(default)]
    pub mexc_symbol: String,
    /// Token address on Dexscreener. Empty disables the provider.
    #[serde(default)]
    pub dexscreener_token: String,
}

fn default_price_ttl_secs() -> u64 {
    240
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_price_ttl_secs(),
            fallback_price_usd: 0.0,
            mexc_symbol: String::new(),
            dexscreener_token: String::new(),
        }
    }
}

/// Analytics thresholds shared by the market and position engines.
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsSettings {
    /// Fee share of volume that accrues to LPs (0.05 = 5%).
    #[serde(default = "default_fee_rate")]
    pub fee_rate: f64,
    /// Positions younger than this many days never get an annualized IL;
    /// extrapolating a very short window produces unstable figures.
    #[serde(default = "default_min_days_for_annualization")]
    pub min_days_for_annualization: f64,
}

fn default_fee_rate() -> f64 {
    0.05
}

fn default_min_days_for_annualization() -> f64 {
    3.0
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            fee_rate: default_fee_rate(),
            min_days_for_annualization: default_min_days_for_annualization(),
        }
    }
}

/// Strategy engine thresholds and portfolio caps.
///
/// All values are denominated in the base token unless suffixed `_pct`.
#[derive(Debug, Deserialize, Clone)]
pub struct StrategySettings {
    /// The wallet whose LP positions are evaluated each tick.
    pub wallet_address: String,
    /// Held positions scoring below this are flagged for exit.
    #[serde(default = "default_exit_threshold_pct")]
    pub exit_threshold_pct: f64,
    /// Minimum net effective score to receive additional capital.
    #[serde(default = "default_entry_min_net_pct")]
    pub entry_min_net_pct: f64,
    /// Portfolio-wide cap on deployed LP value.
    #[serde(default = "default_max_total_value")]
    pub max_total_value: f64,
    /// Cap on LP value in any single pool.
    #[serde(default = "default_max_value_per_pool")]
    pub max_value_per_pool: f64,
    /// Largest single-tick capital addition per pool.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: f64,
    /// Discovery: minimum trailing-24h volume.
    #[serde(default = "default_min_volume_24h")]
    pub min_volume_24h: f64,
    /// Discovery: minimum base-side reserve.
    #[serde(default = "default_min_reserve")]
    pub min_reserve: f64,
    /// Discovery: minimum estimated pool APR.
    #[serde(default)]
    pub min_pool_apr_pct: f64,
    /// How many discovery candidates the tick log shows.
    #[serde(default = "default_discover_top_n")]
    pub discover_top_n: usize,
    /// When set, only these pools are considered for discovery.
    #[serde(default)]
    pub pool_allowlist: Option<Vec<String>>,
}

fn default_exit_threshold_pct() -> f64 {
    2.0
}

fn default_entry_min_net_pct() -> f64 {
    2.0
}

fn default_max_total_value() -> f64 {
    250_000.0
}

fn default_max_value_per_pool() -> f64 {
    50_000.0
}

fn default_chunk_size() -> f64 {
    10_000.0
}

fn default_min_volume_24h() -> f64 {
    1_000.0
}

fn default_min_reserve() -> f64 {
    10_000.0
}

fn default_discover_top_n() -> usize {
    5
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub postgres: PostgresSettings,
    #[serde(default)]
    pub oracle: OracleSettings,
    #[serde(default)]
    pub analytics: AnalyticsSettings,
    pub strategy: StrategySettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}
