//! Position valuation: impermanent loss, yield and allocation weights.
//!
//! Each (wallet, pool) history is reduced to its earliest and latest
//! snapshots. Impermanent loss compares the LP stake against holding the
//! entry amounts outright, both valued at the *current* price. The net
//! effective score adds the recorded fee APR to the annualized IL and drives
//! both the output ordering and the normalized target weights.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::warn;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::db::models::PositionSnapshot;
use crate::db::PositionStore;
use crate::oracle::PriceOracle;

/// One wallet's LP position in a pool, reduced from its snapshot history.
/// Derived on demand, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub pool_address: String,
    pub name: String,
    pub entry_ts: DateTime<Utc>,
    pub current_ts: DateTime<Utc>,
    pub days_in_position: f64,

    pub entry_user_base: f64,
    pub entry_user_quote: f64,
    pub current_user_base: f64,
    pub current_user_quote: f64,
    pub current_lp_share: f64,
    pub price_base_now: f64,

    /// Value of the entry amounts held outright, at the current price.
    pub value_hodl: f64,
    /// Value of the LP stake at the current price.
    pub value_lp: f64,
    pub il: f64,
    pub il_pct: f64,
    /// `None` until the position is old enough to annualize.
    pub il_annualized_pct: Option<f64>,
    pub pool_apr: Option<f64>,
    /// Fee APR plus annualized IL when both exist; the APR alone otherwise.
    pub net_effective_pct: Option<f64>,

    pub il_usd: Option<f64>,
    pub value_hodl_usd: Option<f64>,
    pub value_lp_usd: Option<f64>,

    /// Share of the wallet's capital this position should attract; zero
    /// unless the net effective score is positive.
    pub target_weight: f64,
}

impl Position {
    /// Current LP value in base units; what the strategy sizes against.
    pub fn current_value_base(&self) -> f64 {
        self.value_lp
    }
}

/// Values a wallet's LP positions from their snapshot histories.
pub struct PositionValuationEngine {
    positions: Arc<dyn PositionStore>,
    oracle: Arc<PriceOracle>,
    min_days_for_annualization: f64,
}

impl PositionValuationEngine {
    pub fn new(
        positions: Arc<dyn PositionStore>,
        oracle: Arc<PriceOracle>,
        min_days_for_annualization: f64,
    ) -> Self {
        Self {
            positions,
            oracle,
            min_days_for_annualization,
        }
    }

    /// Positions ordered by net effective score, undefined scores last.
    pub async fn evaluate_positions(
        &self,
        wallet_address: &str,
    ) -> anyhow::Result<Vec<Position>> {
        let history = self.positions.position_history(wallet_address).await?;
        let usd_price = self.oracle.reference_price_usd().await;
        Ok(evaluate_history(
            &history,
            usd_price,
            self.min_days_for_annualization,
        ))
    }
}

/// Reduce a wallet's full snapshot history to per-pool positions.
///
/// Pure: pass `usd_price <= 0` to leave the USD mirrors unset.
pub fn evaluate_history(
    history: &[PositionSnapshot],
    usd_price: f64,
    min_days_for_annualization: f64,
) -> Vec<Position> {
    let mut per_pool: FxHashMap<String, Vec<&PositionSnapshot>> = FxHashMap::default();
    let mut pool_order: Vec<String> = Vec::new();
    for snap in history {
        let key = snap.pool_address.to_lowercase();
        if !per_pool.contains_key(&key) {
            pool_order.push(key.clone());
        }
        per_pool.entry(key).or_default().push(snap);
    }

    let mut positions: Vec<Position> = Vec::with_capacity(pool_order.len());
    for key in &pool_order {
        let mut rows = per_pool[key].clone();
        // History arrives ascending, but the reduction must not depend on it.
        rows.sort_by_key(|row| row.ts);

        let (Some(entry), Some(current)) = (rows.first(), rows.last()) else {
            continue;
        };
        positions.push(reduce_group(
            entry,
            current,
            usd_price,
            min_days_for_annualization,
        ));
    }

    assign_target_weights(&mut positions);

    positions.sort_by(|a, b| match (a.net_effective_pct, b.net_effective_pct) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    positions
}

fn reduce_group(
    entry: &PositionSnapshot,
    current: &PositionSnapshot,
    usd_price: f64,
    min_days_for_annualization: f64,
) -> Position {
    let pool = &current.pool_address;
    let entry_base = sanitized(entry.user_base, "entry user_base", pool);
    let entry_quote = sanitized(entry.user_quote, "entry user_quote", pool);
    let current_base = sanitized(current.user_base, "current user_base", pool);
    let current_quote = sanitized(current.user_quote, "current user_quote", pool);
    let price_now = sanitized(current.price_base, "price_base", pool);

    let (il, il_pct, value_hodl, value_lp) =
        impermanent_loss(entry_base, entry_quote, current_base, current_quote, price_now);

    let days_in_position =
        ((current.ts - entry.ts).num_seconds() as f64 / 86_400.0).max(0.0);

    let il_annualized_pct =
        if days_in_position > 0.0 && days_in_position >= min_days_for_annualization {
            Some(il_pct * (365.0 / days_in_position.max(1e-6)))
        } else {
            None
        };

    let pool_apr = current.pool_apr.filter(|apr| apr.is_finite());
    let net_effective_pct = match (pool_apr, il_annualized_pct) {
        (Some(apr), Some(annualized)) => Some(apr + annualized),
        (Some(apr), None) => Some(apr),
        (None, _) => None,
    };

    let (il_usd, value_hodl_usd, value_lp_usd) = if usd_price > 0.0 {
        (
            Some(il * usd_price),
            Some(value_hodl * usd_price),
            Some(value_lp * usd_price),
        )
    } else {
        (None, None, None)
    };

    Position {
        pool_address: current.pool_address.clone(),
        name: current.name.clone(),
        entry_ts: entry.ts,
        current_ts: current.ts,
        days_in_position,
        entry_user_base: entry_base,
        entry_user_quote: entry_quote,
        current_user_base: current_base,
        current_user_quote: current_quote,
        current_lp_share: current.lp_share,
        price_base_now: price_now,
        value_hodl,
        value_lp,
        il,
        il_pct,
        il_annualized_pct,
        pool_apr,
        net_effective_pct,
        il_usd,
        value_hodl_usd,
        value_lp_usd,
        target_weight: 0.0,
    }
}

/// Normalize weights over the subset with a positive score; everything else
/// stays at zero.
fn assign_target_weights(positions: &mut [Position]) {
    let total_positive: f64 = positions
        .iter()
        .filter_map(|pos| pos.net_effective_pct)
        .filter(|net| *net > 0.0)
        .sum();

    if total_positive <= 0.0 {
        return;
    }

    for pos in positions.iter_mut() {
        if let Some(net) = pos.net_effective_pct {
            if net > 0.0 {
                pos.target_weight = net / total_positive;
            }
        }
    }
}

/// Impermanent loss of an LP stake versus holding the entry amounts, both
/// valued at the current price.
///
/// Returns `(il, il_pct, value_hodl, value_lp)`. A non-positive hodl value
/// yields zero loss — there is nothing to compare against.
pub fn impermanent_loss(
    entry_base: f64,
    entry_quote: f64,
    current_base: f64,
    current_quote: f64,
    price_base: f64,
) -> (f64, f64, f64, f64) {
    let value_hodl = entry_base + entry_quote * price_base;
    let value_lp = current_base + current_quote * price_base;

    if value_hodl <= 0.0 {
        return (0.0, 0.0, value_hodl, value_lp);
    }

    let il = value_lp - value_hodl;
    let il_pct = il / value_hodl * 100.0;
    (il, il_pct, value_hodl, value_lp)
}

fn sanitized(value: f64, field: &str, pool_address: &str) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!(
            "Non-finite {} for pool {}, treating as 0",
            field, pool_address
        );
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ts(days: f64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
            + Duration::seconds((days * 86_400.0) as i64)
    }

    fn snap(
        pool: &str,
        days: f64,
        price: f64,
        user_base: f64,
        user_quote: f64,
        pool_apr: Option<f64>,
    ) -> PositionSnapshot {
        PositionSnapshot {
            wallet_address: "0xwallet".to_string(),
            pool_address: pool.to_string(),
            name: format!("{}-name", pool),
            ts: ts(days),
            price_base: price,
            lp_balance: 1.0,
            lp_share: 0.01,
            user_base,
            user_quote,
            volume_24h: 0.0,
            volume_7d: 0.0,
            fee_earn_24h: 0.0,
            fee_earn_7d: 0.0,
            pool_apr,
        }
    }

    #[test]
    fn balanced_rebalance_has_zero_il() {
        // entry 1000 base + 0 quote, current 500 base + 10 quote at price 50
        let (il, il_pct, value_hodl, value_lp) =
            impermanent_loss(1000.0, 0.0, 500.0, 10.0, 50.0);
        assert_eq!(value_hodl, 1000.0);
        assert_eq!(value_lp, 1000.0);
        assert_eq!(il, 0.0);
        assert_eq!(il_pct, 0.0);
    }

    #[test]
    fn gains_show_as_positive_il() {
        let (il, il_pct, value_hodl, value_lp) =
            impermanent_loss(1000.0, 0.0, 400.0, 15.0, 50.0);
        assert_eq!(value_hodl, 1000.0);
        assert_eq!(value_lp, 1150.0);
        assert_eq!(il, 150.0);
        assert_eq!(il_pct, 15.0);
    }

    #[test]
    fn zero_hodl_value_never_divides() {
        let (il, il_pct, value_hodl, _) = impermanent_loss(0.0, 0.0, 100.0, 5.0, 50.0);
        assert_eq!(value_hodl, 0.0);
        assert_eq!(il, 0.0);
        assert_eq!(il_pct, 0.0);
    }

    #[test]
    fn single_snapshot_has_zero_deltas() {
        let history = vec![snap("a", 0.0, 50.0, 1000.0, 0.0, Some(12.0))];
        let positions = evaluate_history(&history, 0.0, 3.0);

        assert_eq!(positions.len(), 1);
        let pos = &positions[0];
        assert_eq!(pos.days_in_position, 0.0);
        assert_eq!(pos.il, 0.0);
        assert_eq!(pos.il_pct, 0.0);
        assert_eq!(pos.il_annualized_pct, None);
        // APR alone still yields a score.
        assert_eq!(pos.net_effective_pct, Some(12.0));
    }

    #[test]
    fn annualization_waits_for_minimum_age() {
        let young = vec![
            snap("a", 0.0, 50.0, 1000.0, 0.0, Some(10.0)),
            snap("a", 2.0, 50.0, 400.0, 15.0, Some(10.0)),
        ];
        let positions = evaluate_history(&young, 0.0, 3.0);
        assert_eq!(positions[0].il_annualized_pct, None);
        assert_eq!(positions[0].net_effective_pct, Some(10.0));

        let old = vec![
            snap("a", 0.0, 50.0, 1000.0, 0.0, Some(10.0)),
            snap("a", 5.0, 50.0, 400.0, 15.0, Some(10.0)),
        ];
        let positions = evaluate_history(&old, 0.0, 3.0);
        // 15% over 5 days annualized: 15 * 365 / 5 = 1095
        assert_eq!(positions[0].il_annualized_pct, Some(1095.0));
        assert_eq!(positions[0].net_effective_pct, Some(1105.0));
    }

    #[test]
    fn score_is_none_without_pool_apr() {
        let history = vec![
            snap("a", 0.0, 50.0, 1000.0, 0.0, None),
            snap("a", 5.0, 50.0, 400.0, 15.0, None),
        ];
        let positions = evaluate_history(&history, 0.0, 3.0);
        assert!(positions[0].il_annualized_pct.is_some());
        assert_eq!(positions[0].net_effective_pct, None);
    }

    #[test]
    fn usd_mirrors_require_a_known_price() {
        let history = vec![
            snap("a", 0.0, 50.0, 1000.0, 0.0, Some(5.0)),
            snap("a", 5.0, 50.0, 400.0, 15.0, Some(5.0)),
        ];

        let without = evaluate_history(&history, 0.0, 3.0);
        assert_eq!(without[0].il_usd, None);
        assert_eq!(without[0].value_hodl_usd, None);

        let with = evaluate_history(&history, 0.02, 3.0);
        assert_eq!(with[0].il_usd, Some(3.0));
        assert_eq!(with[0].value_hodl_usd, Some(20.0));
        assert_eq!(with[0].value_lp_usd, Some(23.0));
    }

    #[test]
    fn weights_normalize_over_positive_scores() {
        let history = vec![
            snap("a", 0.0, 50.0, 1000.0, 0.0, Some(30.0)),
            snap("b", 0.0, 10.0, 500.0, 0.0, Some(10.0)),
            snap("c", 0.0, 10.0, 500.0, 0.0, Some(-5.0)),
            snap("d", 0.0, 10.0, 500.0, 0.0, None),
        ];
        let positions = evaluate_history(&history, 0.0, 3.0);

        let total: f64 = positions.iter().map(|p| p.target_weight).sum();
        assert!((total - 1.0).abs() < 1e-12);

        // Sorted by score: a (30), b (10), c (-5), d (None last).
        assert_eq!(positions[0].pool_address, "a");
        assert!((positions[0].target_weight - 0.75).abs() < 1e-12);
        assert_eq!(positions[1].pool_address, "b");
        assert!((positions[1].target_weight - 0.25).abs() < 1e-12);
        assert_eq!(positions[2].target_weight, 0.0);
        assert_eq!(positions[3].pool_address, "d");
        assert_eq!(positions[3].net_effective_pct, None);
    }

    #[test]
    fn weights_are_zero_without_any_positive_score() {
        let history = vec![
            snap("a", 0.0, 50.0, 1000.0, 0.0, Some(-3.0)),
            snap("b", 0.0, 10.0, 500.0, 0.0, None),
        ];
        let positions = evaluate_history(&history, 0.0, 3.0);
        assert!(positions.iter().all(|p| p.target_weight == 0.0));
    }

    #[test]
    fn one_bad_pool_does_not_block_the_others() {
        let history = vec![
            snap("bad", 0.0, f64::NAN, f64::NAN, 0.0, Some(5.0)),
            snap("good", 0.0, 50.0, 1000.0, 0.0, Some(8.0)),
        ];
        let positions = evaluate_history(&history, 0.0, 3.0);

        assert_eq!(positions.len(), 2);
        let bad = positions.iter().find(|p| p.pool_address == "bad").unwrap();
        assert_eq!(bad.il, 0.0);
        assert_eq!(bad.il_pct, 0.0);
        let good = positions.iter().find(|p| p.pool_address == "good").unwrap();
        assert_eq!(good.net_effective_pct, Some(8.0));
    }
}
