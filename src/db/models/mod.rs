mod position_snapshot;
mod reference_price;
mod snapshot;
mod trade_event;

pub use position_snapshot::PositionSnapshot;
pub use reference_price::ReferencePrice;
pub use snapshot::Snapshot;
pub use trade_event::TradeEvent;
