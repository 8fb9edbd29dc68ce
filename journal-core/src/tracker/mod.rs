//! Replay trackers: per-trade and per-portfolio aggregation over the
//! ledgers.

pub mod portfolio_tracker;
pub mod trade_tracker;

pub use portfolio_tracker::PortfolioTracker;
pub use trade_tracker::{TradeTracker, TrackerError};
