use std::cmp::Ordering;

use log::warn;
use serde::Serialize;

use crate::analytics::market::WalletMarketRow;

use super::StrategyEngine;

/// An un-held pool that clears the volume, liquidity and yield thresholds.
/// Derived per evaluation tick, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub pool_address: String,
    pub name: String,
    pub volume_24h: f64,
    pub reserve_base: f64,
    pub pool_apr_pct: f64,
}

impl StrategyEngine {
    /// Rank pools the wallet holds no LP in by estimated fee APR,
    /// descending. Ties keep the market enumeration order.
    pub fn discover(&self, market: &[WalletMarketRow]) -> Vec<Candidate> {
        let cfg = &self.settings;
        let mut candidates: Vec<Candidate> = Vec::new();

        for row in market {
            // Only pools the wallet is not already provisioned in.
            if row.lp_share > 0.0 {
                continue;
            }

            if let Some(allowlist) = &cfg.pool_allowlist {
                let listed = allowlist
                    .iter()
                    .any(|pool| pool.eq_ignore_ascii_case(&row.market.pool_address));
                if !listed {
                    continue;
                }
            }

            let volume_24h = row.market.volume_24h;
            let reserve_base = row.market.reserve_base;
            if !volume_24h.is_finite() || !reserve_base.is_finite() {
                warn!(
                    "Skipping malformed market row for pool {} in discovery",
                    row.market.pool_address
                );
                continue;
            }
            if volume_24h <= 0.0 || reserve_base <= 0.0 {
                continue;
            }
            if volume_24h < cfg.min_volume_24h || reserve_base < cfg.min_reserve {
                continue;
            }

            let pool_apr_pct = estimate_pool_apr_pct(volume_24h, self.fee_rate, reserve_base);
            if pool_apr_pct < cfg.min_pool_apr_pct {
                continue;
            }

            candidates.push(Candidate {
                pool_address: row.market.pool_address.clone(),
                name: row.market.name.clone(),
                volume_24h,
                reserve_base,
                pool_apr_pct,
            });
        }

        candidates.sort_by(|a, b| {
            b.pool_apr_pct
                .partial_cmp(&a.pool_apr_pct)
                .unwrap_or(Ordering::Equal)
        });
        candidates
    }
}

/// Pool-level fee APR estimate: one day of fee revenue annualized against
/// twice the base-side reserve, the constant-product proxy for total pool
/// value.
pub fn estimate_pool_apr_pct(volume_24h: f64, fee_rate: f64, reserve_base: f64) -> f64 {
    if reserve_base <= 0.0 {
        return 0.0;
    }
    volume_24h * fee_rate * 365.0 / (2.0 * reserve_base) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::market::MarketRow;
    use crate::config::StrategySettings;
    use chrono::{DateTime, Utc};

    fn settings() -> StrategySettings {
        StrategySettings {
            wallet_address: "0xwallet".to_string(),
            exit_threshold_pct: 2.0,
            entry_min_net_pct: 2.0,
            max_total_value: 100_000.0,
            max_value_per_pool: 40_000.0,
            chunk_size: 10_000.0,
            min_volume_24h: 1_000.0,
            min_reserve: 10_000.0,
            min_pool_apr_pct: 0.0,
            discover_top_n: 5,
            pool_allowlist: None,
        }
    }

    fn row(pool: &str, volume_24h: f64, reserve_base: f64, lp_share: f64) -> WalletMarketRow {
        WalletMarketRow {
            market: MarketRow {
                pool_address: pool.to_string(),
                name: format!("{}-name", pool),
                price_base: 50.0,
                reserve_base,
                reserve_quote: reserve_base / 50.0,
                base_token: "0xbase".to_string(),
                quote_token: "0xquote".to_string(),
                ts: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
                volume_24h,
                trades_24h: 1,
                volume_7d: volume_24h * 7.0,
                trades_7d: 7,
                price_change_24h_pct: None,
                price_change_7d_pct: None,
                volume_change_24h_pct: None,
                volume_change_7d_pct: None,
            },
            lp_balance: 0.0,
            lp_share,
            user_base: 0.0,
            user_quote: 0.0,
            fee_earn_24h: 0.0,
            fee_earn_7d: 0.0,
        }
    }

    #[test]
    fn apr_estimate_matches_the_fee_model() {
        // 5000 daily volume, 5% fee, 20000 base reserve:
        // 5000 * 0.05 * 365 / (2 * 20000) * 100 = 228.125
        assert_eq!(estimate_pool_apr_pct(5_000.0, 0.05, 20_000.0), 228.125);
        assert!((estimate_pool_apr_pct(500.0, 0.05, 20_000.0) - 22.8125).abs() < 1e-9);
        assert_eq!(estimate_pool_apr_pct(5_000.0, 0.05, 0.0), 0.0);
    }

    #[test]
    fn held_pools_are_never_candidates() {
        let engine = StrategyEngine::new(settings(), 0.05);
        let market = vec![
            row("held", 50_000.0, 100_000.0, 0.2),
            row("free", 50_000.0, 100_000.0, 0.0),
        ];

        let candidates = engine.discover(&market);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].pool_address, "free");
    }

    #[test]
    fn thin_pools_are_filtered_out() {
        let engine = StrategyEngine::new(settings(), 0.05);
        let market = vec![
            row("low-volume", 500.0, 100_000.0, 0.0),
            row("low-reserve", 50_000.0, 5_000.0, 0.0),
            row("no-volume", 0.0, 100_000.0, 0.0),
            row("broken", f64::NAN, 100_000.0, 0.0),
            row("ok", 5_000.0, 20_000.0, 0.0),
        ];

        let candidates = engine.discover(&market);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].pool_address, "ok");
        assert_eq!(candidates[0].pool_apr_pct, 228.125);
    }

    #[test]
    fn candidates_rank_by_apr_descending() {
        let engine = StrategyEngine::new(settings(), 0.05);
        let market = vec![
            row("mid", 5_000.0, 20_000.0, 0.0),    // 228.125%
            row("hot", 50_000.0, 20_000.0, 0.0),   // 2281.25%
            row("cold", 2_000.0, 500_000.0, 0.0),  // 3.65%
        ];

        let candidates = engine.discover(&market);
        let order: Vec<&str> = candidates
            .iter()
            .map(|c| c.pool_address.as_str())
            .collect();
        assert_eq!(order, vec!["hot", "mid", "cold"]);
    }

    #[test]
    fn min_apr_threshold_filters_candidates() {
        let mut cfg = settings();
        cfg.min_pool_apr_pct = 10.0;
        let engine = StrategyEngine::new(cfg, 0.05);
        let market = vec![
            row("ok", 5_000.0, 20_000.0, 0.0),     // 228.125%
            row("weak", 2_000.0, 500_000.0, 0.0),  // 3.65%
        ];

        let candidates = engine.discover(&market);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].pool_address, "ok");
    }

    #[test]
    fn allowlist_restricts_candidates_when_set() {
        let mut cfg = settings();
        cfg.pool_allowlist = Some(vec!["0xAAA".to_string()]);
        let engine = StrategyEngine::new(cfg, 0.05);
        let market = vec![
            row("0xaaa", 5_000.0, 20_000.0, 0.0),
            row("0xbbb", 5_000.0, 20_000.0, 0.0),
        ];

        let candidates = engine.discover(&market);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].pool_address, "0xaaa");
    }
}
