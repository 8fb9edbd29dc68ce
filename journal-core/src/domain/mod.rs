//! Domain snapshot types: instruments, currencies, transactions, trades.

pub mod ids;
pub mod instrument;
pub mod snapshot;
pub mod trade;
pub mod transactions;

pub use ids::{CurrencyId, InstrumentId, OrderId, TradeId};
pub use instrument::{AssetClass, Currency, Instrument};
pub use snapshot::JournalSnapshot;
pub use trade::{Trade, TradeStats};
pub use transactions::{CashTransactionRecord, FxTransactionRecord, OrderRecord};
