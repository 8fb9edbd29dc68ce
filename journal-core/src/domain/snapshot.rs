//! Immutable id-keyed snapshot of everything a replay needs.
//!
//! The persistence layer's navigation graph (Trade ↔ Order ↔ Instrument
//! cycles) is flattened into plain lookup tables before a replay starts.
//! Nothing in here is mutated during simulation.

use super::ids::{CurrencyId, InstrumentId, TradeId};
use super::instrument::{Currency, Instrument};
use super::trade::Trade;
use super::transactions::{CashTransactionRecord, FxTransactionRecord, OrderRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalSnapshot {
    pub base_currency_id: CurrencyId,
    pub instruments: HashMap<InstrumentId, Instrument>,
    pub currencies: HashMap<CurrencyId, Currency>,
    pub trades: HashMap<TradeId, Trade>,
    pub orders: Vec<OrderRecord>,
    pub cash_transactions: Vec<CashTransactionRecord>,
    pub fx_transactions: Vec<FxTransactionRecord>,
}

impl JournalSnapshot {
    pub fn new(base_currency_id: CurrencyId) -> Self {
        Self {
            base_currency_id,
            instruments: HashMap::new(),
            currencies: HashMap::new(),
            trades: HashMap::new(),
            orders: Vec::new(),
            cash_transactions: Vec::new(),
            fx_transactions: Vec::new(),
        }
    }

    /// Orders belonging to a trade, in arrival (timestamp) order.
    pub fn orders_for_trade(&self, trade_id: TradeId) -> Vec<&OrderRecord> {
        let mut orders: Vec<&OrderRecord> = self
            .orders
            .iter()
            .filter(|o| o.trade_id == trade_id)
            .collect();
        orders.sort_by_key(|o| o.timestamp);
        orders
    }

    /// Cash transactions belonging to a trade, in date order.
    pub fn cash_for_trade(&self, trade_id: TradeId) -> Vec<&CashTransactionRecord> {
        let mut txns: Vec<&CashTransactionRecord> = self
            .cash_transactions
            .iter()
            .filter(|c| c.trade_id == Some(trade_id))
            .collect();
        txns.sort_by_key(|c| c.date);
        txns
    }

    /// FX transactions belonging to a trade, in timestamp order.
    pub fn fx_for_trade(&self, trade_id: TradeId) -> Vec<&FxTransactionRecord> {
        let mut txns: Vec<&FxTransactionRecord> = self
            .fx_transactions
            .iter()
            .filter(|f| f.trade_id == Some(trade_id))
            .collect();
        txns.sort_by_key(|f| f.timestamp);
        txns
    }

    pub fn instrument(&self, id: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(&id)
    }

    pub fn is_base_currency(&self, id: CurrencyId) -> bool {
        id == self.base_currency_id
    }
}
