//! The analytics core: market aggregation and position valuation.
//!
//! Both engines are pure computations over already-fetched, typed records:
//!
//! - [`market`] - latest pool state with rolling-window volume and
//!   price-change statistics
//! - [`positions`] - impermanent loss, annualized yield and capital
//!   allocation weights per LP position

pub mod market;
pub mod positions;

pub use market::{MarketAggregator, MarketRow, WalletMarketRow};
pub use positions::{Position, PositionValuationEngine};
