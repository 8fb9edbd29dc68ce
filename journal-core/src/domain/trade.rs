//! Trade container and its simulator-derived result block.

use super::ids::{OrderId, TradeId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named grouping of orders, cash transactions and FX transactions.
///
/// The `stats` block is derived: the simulator computes it and writes it back
/// at the end of a replay. Nothing here is ever computed by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub name: String,
    pub open: bool,
    pub open_date: Option<NaiveDate>,
    pub close_date: Option<NaiveDate>,
    pub stats: TradeStats,
}

impl Trade {
    pub fn new(id: TradeId, name: impl Into<String>, open_date: NaiveDate) -> Self {
        Self {
            id,
            name: name.into(),
            open: true,
            open_date: Some(open_date),
            close_date: None,
            stats: TradeStats::default(),
        }
    }
}

/// Derived per-trade results, written back by the simulator.
///
/// Capital figures are averages of the nonzero daily allocated-capital
/// values. Dollar results split realized/unrealized by long/short side;
/// percentage results are the dollar results over average total capital
/// (index-like, hence f64).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeStats {
    pub capital_long: Decimal,
    pub capital_short: Decimal,
    pub capital_net: Decimal,
    pub capital_total: Decimal,

    pub realized_pnl_long: Decimal,
    pub realized_pnl_short: Decimal,
    pub unrealized_pnl_long: Decimal,
    pub unrealized_pnl_short: Decimal,

    pub realized_pct_long: f64,
    pub realized_pct_short: f64,
    pub unrealized_pct_long: f64,
    pub unrealized_pct_short: f64,

    pub commissions: Decimal,

    /// FIFO-matched P&L per order, informational. Independent of the
    /// average-cost realized figures above.
    pub order_fifo_pnl: HashMap<OrderId, Decimal>,
}

impl TradeStats {
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl_long + self.realized_pnl_short
    }

    pub fn unrealized_pnl(&self) -> Decimal {
        self.unrealized_pnl_long + self.unrealized_pnl_short
    }

    pub fn total_pnl(&self) -> Decimal {
        self.realized_pnl() + self.unrealized_pnl()
    }
}
