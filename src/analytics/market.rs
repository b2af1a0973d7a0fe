//! Market aggregation: latest pool state plus rolling-window statistics.
//!
//! A pure read-side projection. For every pool the latest snapshot is joined
//! with windowed trade sums (trailing 24h/7d plus the preceding windows of
//! equal length) and with the snapshot at each window boundary. Nothing here
//! mutates snapshot or trade storage, and a failure on one pool never blocks
//! the others.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use log::warn;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::db::models::{PositionSnapshot, Snapshot, TradeEvent};
use crate::db::{PositionStore, SnapshotStore};

/// Current market state for one pool. Derived on demand, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MarketRow {
    pub pool_address: String,
    pub name: String,
    pub price_base: f64,
    pub reserve_base: f64,
    pub reserve_quote: f64,
    pub base_token: String,
    pub quote_token: String,
    pub ts: DateTime<Utc>,

    pub volume_24h: f64,
    pub trades_24h: u64,
    pub volume_7d: f64,
    pub trades_7d: u64,

    /// `None` when no snapshot exists at the window boundary or the
    /// boundary price is zero.
    pub price_change_24h_pct: Option<f64>,
    pub price_change_7d_pct: Option<f64>,
    /// `None` when the preceding window had no volume.
    pub volume_change_24h_pct: Option<f64>,
    pub volume_change_7d_pct: Option<f64>,
}

/// A market row overlaid with one wallet's LP stake in the pool.
///
/// `fee_earn_*` are estimates: window volume times the LP fee rate, scaled
/// by the wallet's pool share.
#[derive(Debug, Clone, Serialize)]
pub struct WalletMarketRow {
    #[serde(flatten)]
    pub market: MarketRow,

    pub lp_balance: f64,
    pub lp_share: f64,
    pub user_base: f64,
    pub user_quote: f64,
    pub fee_earn_24h: f64,
    pub fee_earn_7d: f64,
}

/// Trailing-window trade activity for one pool.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct WindowActivity {
    volume_24h: f64,
    trades_24h: u64,
    volume_7d: f64,
    trades_7d: u64,
    /// 24-48h ago.
    volume_prev_24h: f64,
    /// 7-14d ago.
    volume_prev_7d: f64,
}

/// Builds the market view from the snapshot and position stores.
pub struct MarketAggregator {
    snapshots: Arc<dyn SnapshotStore>,
    positions: Arc<dyn PositionStore>,
    fee_rate: f64,
}

impl MarketAggregator {
    pub fn new(
        snapshots: Arc<dyn SnapshotStore>,
        positions: Arc<dyn PositionStore>,
        fee_rate: f64,
    ) -> Self {
        Self {
            snapshots,
            positions,
            fee_rate,
        }
    }

    /// One row per pool with a snapshot, in stable pool enumeration order.
    pub async fn latest_market(&self) -> anyhow::Result<Vec<MarketRow>> {
        self.market_at(Utc::now()).await
    }

    /// The market view plus the wallet's LP overlay per pool.
    pub async fn latest_market_for_wallet(
        &self,
        wallet_address: &str,
    ) -> anyhow::Result<Vec<WalletMarketRow>> {
        let market = self.latest_market().await?;
        let held = self.positions.latest_positions(wallet_address).await?;
        Ok(overlay_wallet(market, &held, self.fee_rate))
    }

    async fn market_at(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<MarketRow>> {
        let latest = self.snapshots.latest_snapshots().await?;
        let rows = join_all(latest.into_iter().map(|snap| self.pool_row(snap, now))).await;
        Ok(rows.into_iter().flatten().collect())
    }

    /// Build one market row; a failed window fetch skips the pool.
    async fn pool_row(&self, snap: Snapshot, now: DateTime<Utc>) -> Option<MarketRow> {
        match self.fetch_windows(&snap.pool_address, now).await {
            Ok((trades, boundary_24h, boundary_7d)) => Some(build_market_row(
                snap,
                &trades,
                boundary_24h.as_ref(),
                boundary_7d.as_ref(),
                now,
            )),
            Err(e) => {
                warn!("Skipping pool {} in market view: {:#}", snap.pool_address, e);
                None
            },
        }
    }

    async fn fetch_windows(
        &self,
        pool_address: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<(Vec<TradeEvent>, Option<Snapshot>, Option<Snapshot>)> {
        // 14 days back covers the 7d window and its preceding window; the
        // 24h windows are carved out of the same fetch.
        let trades = self
            .snapshots
            .trade_events_since(pool_address, now - Duration::days(14))
            .await?;
        let boundary_24h = self
            .snapshots
            .snapshot_before(pool_address, now - Duration::hours(24))
            .await?;
        let boundary_7d = self
            .snapshots
            .snapshot_before(pool_address, now - Duration::days(7))
            .await?;
        Ok((trades, boundary_24h, boundary_7d))
    }
}

fn build_market_row(
    snap: Snapshot,
    trades: &[TradeEvent],
    boundary_24h: Option<&Snapshot>,
    boundary_7d: Option<&Snapshot>,
    now: DateTime<Utc>,
) -> MarketRow {
    let activity = window_activity(trades, now);

    MarketRow {
        price_change_24h_pct: price_change_pct(snap.price_base, boundary_24h),
        price_change_7d_pct: price_change_pct(snap.price_base, boundary_7d),
        volume_change_24h_pct: volume_change_pct(activity.volume_24h, activity.volume_prev_24h),
        volume_change_7d_pct: volume_change_pct(activity.volume_7d, activity.volume_prev_7d),
        volume_24h: activity.volume_24h,
        trades_24h: activity.trades_24h,
        volume_7d: activity.volume_7d,
        trades_7d: activity.trades_7d,
        pool_address: snap.pool_address,
        name: snap.name,
        price_base: snap.price_base,
        reserve_base: snap.reserve_base,
        reserve_quote: snap.reserve_quote,
        base_token: snap.base_token,
        quote_token: snap.quote_token,
        ts: snap.ts,
    }
}

/// Partition trade events into the current and preceding 24h/7d windows.
fn window_activity(trades: &[TradeEvent], now: DateTime<Utc>) -> WindowActivity {
    let h24 = now - Duration::hours(24);
    let h48 = now - Duration::hours(48);
    let d7 = now - Duration::days(7);
    let d14 = now - Duration::days(14);

    let mut activity = WindowActivity::default();
    for trade in trades {
        if trade.ts >= h24 {
            activity.volume_24h += trade.base_amount;
            activity.trades_24h += 1;
        } else if trade.ts >= h48 {
            activity.volume_prev_24h += trade.base_amount;
        }

        if trade.ts >= d7 {
            activity.volume_7d += trade.base_amount;
            activity.trades_7d += 1;
        } else if trade.ts >= d14 {
            activity.volume_prev_7d += trade.base_amount;
        }
    }
    activity
}

/// Percentage change against the window-boundary snapshot.
///
/// `None` when there is no boundary snapshot or its price is zero — there
/// is nothing meaningful to compare against.
fn price_change_pct(price_now: f64, boundary: Option<&Snapshot>) -> Option<f64> {
    let past = boundary?.price_base;
    if past == 0.0 {
        return None;
    }
    Some((price_now - past) / past * 100.0)
}

/// Current window vs. the preceding window of equal length.
///
/// `None` when the preceding window had no volume.
fn volume_change_pct(current: f64, previous: f64) -> Option<f64> {
    if previous <= 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

/// Overlay a wallet's latest per-pool stake onto the market rows. Pools the
/// wallet holds nothing in get a zeroed overlay.
fn overlay_wallet(
    market: Vec<MarketRow>,
    held: &[PositionSnapshot],
    fee_rate: f64,
) -> Vec<WalletMarketRow> {
    let by_pool: FxHashMap<String, &PositionSnapshot> = held
        .iter()
        .map(|pos| (pos.pool_address.to_lowercase(), pos))
        .collect();

    market
        .into_iter()
        .map(|row| {
            let stake = by_pool.get(&row.pool_address.to_lowercase());
            let (lp_balance, lp_share, user_base, user_quote) = match stake {
                Some(pos) => (pos.lp_balance, pos.lp_share, pos.user_base, pos.user_quote),
                None => (0.0, 0.0, 0.0, 0.0),
            };

            let (fee_earn_24h, fee_earn_7d) = if lp_share > 0.0 && fee_rate > 0.0 {
                (
                    row.volume_24h * fee_rate * lp_share,
                    row.volume_7d * fee_rate * lp_share,
                )
            } else {
                (0.0, 0.0)
            };

            WalletMarketRow {
                market: row,
                lp_balance,
                lp_share,
                user_base,
                user_quote,
                fee_earn_24h,
                fee_earn_7d,
            }
        })
        .collect()
}
