//! One evaluation tick for the tracked wallet.
//!
//! Values the wallet's positions, rebuilds the market view, then logs
//! suggested exit/enter actions and the top discovery candidates. Advisory
//! only: the tick writes nothing and signs nothing.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::analytics::{MarketAggregator, PositionValuationEngine};
use crate::oracle::PriceOracle;
use crate::strategy::{ActionKind, StrategyEngine};

/// Everything one strategy tick needs, bundled so the scheduler can hold a
/// single shared handle.
pub struct TickContext {
    pub wallet_address: String,
    pub market: MarketAggregator,
    pub valuation: PositionValuationEngine,
    pub strategy: StrategyEngine,
    pub oracle: Arc<PriceOracle>,
    pub discover_top_n: usize,
}

pub async fn run(ctx: &TickContext) -> Result<()> {
    info!("Strategy tick for wallet {}", ctx.wallet_address);
    let start = std::time::Instant::now();

    let positions = ctx
        .valuation
        .evaluate_positions(&ctx.wallet_address)
        .await
        .context("failed to evaluate positions")?;
    let market = ctx
        .market
        .latest_market_for_wallet(&ctx.wallet_address)
        .await
        .context("failed to build wallet market view")?;

    let usd_price = ctx.oracle.reference_price_usd().await;
    if usd_price > 0.0 {
        info!("Reference price: {:.7} USD", usd_price);
    } else {
        info!("Reference price: unknown");
    }

    let total_value: f64 = positions.iter().map(|pos| pos.current_value_base()).sum();
    info!(
        "Tracked positions: {} | total LP value: {:.2} base",
        positions.len(),
        total_value
    );

    let actions = ctx.strategy.plan_actions(&positions, &market);
    info!("Suggested actions ({}):", actions.len());
    for action in &actions {
        match action.kind {
            ActionKind::Exit => info!(
                "[EXIT] {} ({}) | current LP: {:.2} | net: {:.2}% | reason: {}",
                action.name,
                action.pool_address,
                action.current_value_base,
                action.net_effective_pct,
                action.reason
            ),
            ActionKind::EnterOrIncrease => info!(
                "[ENTER/UP] {} ({}) | current LP: {:.2} -> +{:.2} | net: {:.2}%",
                action.name,
                action.pool_address,
                action.current_value_base,
                action.add_value_base.unwrap_or(0.0),
                action.net_effective_pct
            ),
        }
    }

    let candidates = ctx.strategy.discover(&market);
    info!(
        "Discovery candidates (not in wallet LP): {}",
        candidates.len()
    );
    for candidate in candidates.iter().take(ctx.discover_top_n) {
        info!(
            "[DISCOVER] {} ({}) | pool apr: {:.2}% | vol24: {:.0} | reserve: {:.0}",
            candidate.name,
            candidate.pool_address,
            candidate.pool_apr_pct,
            candidate.volume_24h,
            candidate.reserve_base
        );
    }

    info!("Strategy tick completed in {:?}", start.elapsed());
    Ok(())
}
