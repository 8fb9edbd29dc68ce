//! Journal Sim — replay orchestration over the journal-core engine.
//!
//! - `MarketDataProvider` trait and structured `DataError`
//! - `SeriesCache`, shared across concurrent replays
//! - `CsvBarSource`, a directory-of-CSV-files provider
//! - `TradeSimulator`, the per-trade day-stepping loop
//! - `simulate_all`, the batch runner (sequential or rayon-parallel)

pub mod batch;
pub mod csv_source;
pub mod provider;
pub mod trade_sim;

pub use batch::{simulate_all, BatchOutcome};
pub use csv_source::CsvBarSource;
pub use provider::{DataError, MarketDataProvider, SeriesCache};
pub use trade_sim::{SimError, TradeSimulator};
