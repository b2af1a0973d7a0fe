//! Rule-based capital allocation over valued positions and market rows.
//!
//! The engine is advisory: it flags exits, sizes entries under portfolio
//! caps and ranks un-held pools worth entering. It performs no on-chain or
//! storage side effects and never signs or sends a transaction.

mod discover;
mod engine;

pub use discover::Candidate;
pub use engine::{Action, ActionKind, StrategyEngine};
