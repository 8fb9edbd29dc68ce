//! Journal Core — per-trade and per-portfolio accounting engine.
//!
//! Replays a trade's orders, cash movements and FX transactions day by day
//! to reconstruct realized/unrealized P&L, allocated capital, and the
//! capital-weighted return curves (ROAC, ROTC):
//! - Domain snapshot types (instruments, currencies, trades, transaction records)
//! - Per-instrument `Position` ledger with FIFO lots and the 15:40 capital cutoff
//! - Per-currency `CurrencyPosition` ledger
//! - `AllocatedCapital` per-day capital accumulator
//! - Forward-only `TimeSeries` cursor over daily bars
//! - Generic `EquityCurve` with drawdown and monthly grouping
//! - `TradeTracker` and `PortfolioTracker` replay aggregators

pub mod curve;
pub mod domain;
pub mod ledger;
pub mod series;
pub mod tracker;
