//! Accounting ledgers: per-instrument positions, per-currency positions,
//! and the per-day allocated-capital accumulator.

pub mod allocated_capital;
pub mod currency_position;
pub mod position;

pub use allocated_capital::AllocatedCapital;
pub use currency_position::CurrencyPosition;
pub use position::{capital_cutoff, LedgerError, Lot, OrderLedgerResult, Position};
