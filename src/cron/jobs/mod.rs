pub mod refresh_reference_price;
pub mod strategy_tick;
