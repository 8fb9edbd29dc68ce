//! Transaction snapshot records fed into a replay.
//!
//! These are plain read-only copies of the persistence layer's rows. All
//! cross-record links are by id; the `JournalSnapshot` arena resolves them
//! before a replay starts.

use super::ids::{CurrencyId, InstrumentId, OrderId, TradeId};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An executed order. Quantity is signed: positive = buy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub instrument_id: InstrumentId,
    pub trade_id: TradeId,
    /// Signed fill quantity (buy > 0, sell < 0).
    pub quantity: Decimal,
    /// Fill price in the order's currency.
    pub price: Decimal,
    /// Contract multiplier at execution time.
    pub multiplier: Decimal,
    pub currency_id: CurrencyId,
    /// FX rate from the order currency to the account base currency.
    pub fx_rate_to_base: Decimal,
    /// Commission in the order currency.
    pub commission: Decimal,
    pub timestamp: NaiveDateTime,
}

impl OrderRecord {
    pub fn trade_date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn is_buy(&self) -> bool {
        self.quantity > Decimal::ZERO
    }
}

/// A cash movement (dividend, fee, interest, ...). May or may not be linked
/// to an instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashTransactionRecord {
    /// Signed amount in `currency_id`.
    pub amount: Decimal,
    pub currency_id: CurrencyId,
    pub fx_rate_to_base: Decimal,
    pub instrument_id: Option<InstrumentId>,
    pub trade_id: Option<TradeId>,
    pub date: NaiveDate,
}

/// A foreign-exchange transaction in base-currency terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxTransactionRecord {
    /// The currency being bought (quantity > 0) or sold (quantity < 0).
    pub currency_id: CurrencyId,
    /// Signed quantity of the foreign currency.
    pub quantity: Decimal,
    /// Proceeds in base currency.
    pub proceeds: Decimal,
    /// Cost in base currency.
    pub cost: Decimal,
    pub trade_id: Option<TradeId>,
    pub timestamp: NaiveDateTime,
}

impl FxTransactionRecord {
    /// Effective base-currency rate of this transaction.
    ///
    /// Derived from cost over quantity; zero-quantity transactions carry no
    /// meaningful rate and return zero.
    pub fn rate(&self) -> Decimal {
        if self.quantity == Decimal::ZERO {
            Decimal::ZERO
        } else {
            (self.cost / self.quantity).abs()
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}
