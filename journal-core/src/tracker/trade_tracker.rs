//! Per-trade replay state: one instrument ledger per instrument, one
//! currency ledger per non-base currency, plus a cash bucket for
//! instrument-less cash transactions.

use crate::domain::{
    CashTransactionRecord, CurrencyId, FxTransactionRecord, InstrumentId, JournalSnapshot,
    OrderId, OrderRecord, Trade, TradeId,
};
use crate::ledger::{AllocatedCapital, CurrencyPosition, LedgerError, Position};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("unknown instrument {0} in snapshot")]
    UnknownInstrument(InstrumentId),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Tracks one trade through a replay and produces its final statistics.
#[derive(Debug)]
pub struct TradeTracker {
    trade_id: TradeId,
    base_currency_id: CurrencyId,
    positions: HashMap<InstrumentId, Position>,
    currency_positions: HashMap<CurrencyId, CurrencyPosition>,

    /// Realized P&L from cash transactions with no instrument link.
    unattached_cash_total: Decimal,
    unattached_cash_today: Decimal,

    /// FIFO P&L per order, collected from the ledgers.
    order_fifo_pnl: HashMap<OrderId, Decimal>,

    // Daily capital sums across all positions, committed once per mark_day.
    capital_long_daily: Vec<Decimal>,
    capital_short_daily: Vec<Decimal>,
    capital_gross_daily: Vec<Decimal>,
    capital_net_daily: Vec<Decimal>,

    total_pnl: Decimal,
    open: bool,
}

impl TradeTracker {
    pub fn new(trade_id: TradeId, base_currency_id: CurrencyId) -> Self {
        Self {
            trade_id,
            base_currency_id,
            positions: HashMap::new(),
            currency_positions: HashMap::new(),
            unattached_cash_total: Decimal::ZERO,
            unattached_cash_today: Decimal::ZERO,
            order_fifo_pnl: HashMap::new(),
            capital_long_daily: Vec::new(),
            capital_short_daily: Vec::new(),
            capital_gross_daily: Vec::new(),
            capital_net_daily: Vec::new(),
            total_pnl: Decimal::ZERO,
            open: false,
        }
    }

    pub fn trade_id(&self) -> TradeId {
        self.trade_id
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn positions(&self) -> &HashMap<InstrumentId, Position> {
        &self.positions
    }

    pub fn currency_positions(&self) -> &HashMap<CurrencyId, CurrencyPosition> {
        &self.currency_positions
    }

    pub fn total_pnl(&self) -> Decimal {
        self.total_pnl
    }

    /// Route an order into its instrument ledger, synthesizing the implicit
    /// FX transaction when the order is denominated in a non-base currency.
    pub fn add_order(
        &mut self,
        order: &OrderRecord,
        snapshot: &JournalSnapshot,
    ) -> Result<(), TrackerError> {
        let instrument = snapshot
            .instrument(order.instrument_id)
            .ok_or(TrackerError::UnknownInstrument(order.instrument_id))?;

        let position = self
            .positions
            .entry(order.instrument_id)
            .or_insert_with(|| Position::new(instrument.clone()));
        let result = position.add_order(order)?;
        self.order_fifo_pnl.insert(order.id, result.fifo_pnl);
        self.open = true;

        if order.currency_id != self.base_currency_id {
            // Buying in a foreign currency consumes that currency; selling
            // and commissions move it the other way.
            let cash_flow =
                -(order.quantity * order.price * order.multiplier) - order.commission;
            self.apply_fx(&FxTransactionRecord {
                currency_id: order.currency_id,
                quantity: cash_flow,
                proceeds: Decimal::ZERO,
                cost: cash_flow * order.fx_rate_to_base,
                trade_id: Some(self.trade_id),
                timestamp: order.timestamp,
            });
        }
        Ok(())
    }

    /// Route a cash transaction: into its instrument's ledger when linked,
    /// otherwise into the unattached cash bucket.
    pub fn add_cash_transaction(
        &mut self,
        tx: &CashTransactionRecord,
        snapshot: &JournalSnapshot,
    ) -> Result<(), TrackerError> {
        let amount_base = tx.amount * tx.fx_rate_to_base;
        match tx.instrument_id {
            Some(instrument_id) => {
                let instrument = snapshot
                    .instrument(instrument_id)
                    .ok_or(TrackerError::UnknownInstrument(instrument_id))?;
                self.positions
                    .entry(instrument_id)
                    .or_insert_with(|| Position::new(instrument.clone()))
                    .add_cash(amount_base);
            }
            None => {
                self.unattached_cash_today += amount_base;
                self.unattached_cash_total += amount_base;
            }
        }

        if tx.currency_id != self.base_currency_id {
            self.apply_fx(&FxTransactionRecord {
                currency_id: tx.currency_id,
                quantity: tx.amount,
                proceeds: Decimal::ZERO,
                cost: tx.amount * tx.fx_rate_to_base,
                trade_id: Some(self.trade_id),
                timestamp: tx.date.and_hms_opt(0, 0, 0).expect("midnight exists"),
            });
        }
        Ok(())
    }

    pub fn add_fx_transaction(&mut self, tx: &FxTransactionRecord) {
        if tx.currency_id == self.base_currency_id {
            return;
        }
        self.apply_fx(tx);
    }

    fn apply_fx(&mut self, tx: &FxTransactionRecord) {
        self.currency_positions
            .entry(tx.currency_id)
            .or_insert_with(|| CurrencyPosition::new(tx.currency_id))
            .add_transaction(tx);
    }

    /// Mark every owned ledger to market for `date`, commit the day's
    /// capital sums, and recompute the open flag. Returns the day's P&L in
    /// base currency.
    ///
    /// Ledgers with no price/rate for the date mark against their prior
    /// basis — a data gap is treated as no price movement.
    pub fn mark_day(
        &mut self,
        date: NaiveDate,
        prices: &HashMap<InstrumentId, Decimal>,
        fx_rates: &HashMap<CurrencyId, Decimal>,
    ) -> Decimal {
        let mut day_pnl = Decimal::ZERO;

        for (instrument_id, position) in &mut self.positions {
            let currency_id = position.instrument().currency_id;
            let fx = if currency_id == self.base_currency_id {
                Some(Decimal::ONE)
            } else {
                fx_rates.get(&currency_id).copied()
            };
            day_pnl += match (prices.get(instrument_id).copied(), fx) {
                (Some(price), Some(fx)) => position.mark(price, fx),
                (Some(price), None) => {
                    let (_, prior_fx) = position.prior_basis();
                    position.mark(price, prior_fx)
                }
                _ => position.mark_no_data(),
            };
        }

        for (currency_id, currency_position) in &mut self.currency_positions {
            day_pnl += match fx_rates.get(currency_id).copied() {
                Some(rate) => currency_position.mark(rate),
                None => currency_position.mark_no_data(),
            };
        }

        day_pnl += self.unattached_cash_today;
        self.unattached_cash_today = Decimal::ZERO;
        self.total_pnl += day_pnl;

        // Sum the day's committed capital across positions.
        let mut long = Decimal::ZERO;
        let mut short = Decimal::ZERO;
        for position in self.positions.values() {
            long += position.capital().long().last().copied().unwrap_or_default();
            short += position.capital().short().last().copied().unwrap_or_default();
        }
        self.capital_long_daily.push(long);
        self.capital_short_daily.push(short);
        self.capital_gross_daily.push(long + short);
        self.capital_net_daily.push(long - short);

        self.open = self.positions.values().any(|p| !p.is_flat())
            || self.currency_positions.values().any(|c| !c.is_flat());

        debug!(
            trade_id = %self.trade_id,
            %date,
            day_pnl = %day_pnl,
            capital = %(long + short),
            open = self.open,
            "marked trade"
        );
        day_pnl
    }

    pub fn capital_gross_daily(&self) -> &[Decimal] {
        &self.capital_gross_daily
    }

    /// Today's (not yet committed) gross capital across positions.
    pub fn today_gross_capital(&self) -> Decimal {
        self.positions
            .values()
            .map(|p| p.capital().today_gross())
            .sum()
    }

    /// Copy final aggregates onto the trade record. Capital figures are
    /// averages of the nonzero daily values.
    pub fn write_stats(&self, trade: &mut Trade) {
        let stats = &mut trade.stats;

        stats.capital_long = AllocatedCapital::average_nonzero(&self.capital_long_daily);
        stats.capital_short = AllocatedCapital::average_nonzero(&self.capital_short_daily);
        stats.capital_net = AllocatedCapital::average_nonzero(&self.capital_net_daily);
        stats.capital_total = AllocatedCapital::average_nonzero(&self.capital_gross_daily);

        let mut realized_long = self.unattached_cash_total;
        let mut realized_short = Decimal::ZERO;
        let mut unrealized_long = Decimal::ZERO;
        let mut unrealized_short = Decimal::ZERO;
        let mut commissions = Decimal::ZERO;
        for position in self.positions.values() {
            realized_long += position.realized_pnl_long();
            realized_short += position.realized_pnl_short();
            unrealized_long += position.unrealized_pnl_long();
            unrealized_short += position.unrealized_pnl_short();
            commissions += position.commissions();
        }
        stats.realized_pnl_long = realized_long;
        stats.realized_pnl_short = realized_short;
        stats.unrealized_pnl_long = unrealized_long;
        stats.unrealized_pnl_short = unrealized_short;
        stats.commissions = commissions;

        stats.realized_pct_long = pct(realized_long, stats.capital_long);
        stats.realized_pct_short = pct(realized_short, stats.capital_short);
        stats.unrealized_pct_long = pct(unrealized_long, stats.capital_long);
        stats.unrealized_pct_short = pct(unrealized_short, stats.capital_short);

        stats.order_fifo_pnl = self.order_fifo_pnl.clone();

        trade.open = self.open;
    }
}

fn pct(amount: Decimal, capital: Decimal) -> f64 {
    if capital.is_zero() {
        0.0
    } else {
        (amount / capital).to_f64().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetClass, Currency, Instrument, Trade};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn snapshot() -> JournalSnapshot {
        let mut snap = JournalSnapshot::new(CurrencyId(1));
        snap.currencies.insert(
            CurrencyId(1),
            Currency {
                id: CurrencyId(1),
                code: "USD".into(),
            },
        );
        snap.currencies.insert(
            CurrencyId(2),
            Currency {
                id: CurrencyId(2),
                code: "EUR".into(),
            },
        );
        snap.instruments.insert(
            InstrumentId(1),
            Instrument::equity(InstrumentId(1), "AAPL", CurrencyId(1)),
        );
        snap.instruments.insert(
            InstrumentId(2),
            Instrument {
                id: InstrumentId(2),
                symbol: "SAP".into(),
                asset_class: AssetClass::Equity,
                multiplier: Decimal::ONE,
                strike: None,
                currency_id: CurrencyId(2),
            },
        );
        snap
    }

    fn order(
        id: i64,
        instrument: i64,
        qty: Decimal,
        price: Decimal,
        day: u32,
    ) -> OrderRecord {
        OrderRecord {
            id: OrderId(id),
            instrument_id: InstrumentId(instrument),
            trade_id: TradeId(1),
            quantity: qty,
            price,
            multiplier: Decimal::ONE,
            currency_id: CurrencyId(1),
            fx_rate_to_base: Decimal::ONE,
            commission: Decimal::ZERO,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn open_flag_follows_net_quantity() {
        let snap = snapshot();
        let mut tracker = TradeTracker::new(TradeId(1), CurrencyId(1));
        tracker.add_order(&order(1, 1, dec!(100), dec!(10), 2), &snap).unwrap();

        let mut prices = HashMap::new();
        prices.insert(InstrumentId(1), dec!(10));
        tracker.mark_day(d(2), &prices, &HashMap::new());
        assert!(tracker.is_open());

        tracker.add_order(&order(2, 1, dec!(-100), dec!(11), 3), &snap).unwrap();
        tracker.mark_day(d(3), &prices, &HashMap::new());
        assert!(!tracker.is_open());
    }

    #[test]
    fn stats_written_back_to_trade() {
        let snap = snapshot();
        let mut tracker = TradeTracker::new(TradeId(1), CurrencyId(1));
        tracker.add_order(&order(1, 1, dec!(100), dec!(10), 2), &snap).unwrap();
        let mut prices = HashMap::new();
        prices.insert(InstrumentId(1), dec!(11));
        tracker.mark_day(d(2), &prices, &HashMap::new());
        tracker.add_order(&order(2, 1, dec!(-100), dec!(11), 3), &snap).unwrap();
        tracker.mark_day(d(3), &prices, &HashMap::new());

        let mut trade = Trade::new(TradeId(1), "test", d(2));
        tracker.write_stats(&mut trade);

        assert_eq!(trade.stats.realized_pnl_long, dec!(100));
        assert_eq!(trade.stats.unrealized_pnl_long, Decimal::ZERO);
        // Day 1 capital 1000 (the order), day 2 capital 1100 (the carry).
        assert_eq!(trade.stats.capital_long, dec!(1050));
        assert_eq!(trade.stats.order_fifo_pnl[&OrderId(2)], dec!(100));
        assert!(!trade.open);
    }

    #[test]
    fn foreign_currency_order_synthesizes_fx_position() {
        let snap = snapshot();
        let mut tracker = TradeTracker::new(TradeId(1), CurrencyId(1));
        let mut o = order(1, 2, dec!(100), dec!(10), 2);
        o.currency_id = CurrencyId(2);
        o.fx_rate_to_base = dec!(1.2);
        tracker.add_order(&o, &snap).unwrap();

        // Buying for EUR 1000 leaves a short EUR 1000 cash exposure.
        let ccy = tracker.currency_positions().get(&CurrencyId(2)).unwrap();
        assert_eq!(ccy.quantity(), dec!(-1000));
        assert_eq!(ccy.cost_basis(), dec!(1.2));
    }

    #[test]
    fn unattached_cash_lands_in_day_pnl_and_stats() {
        let snap = snapshot();
        let mut tracker = TradeTracker::new(TradeId(1), CurrencyId(1));
        tracker
            .add_cash_transaction(
                &CashTransactionRecord {
                    amount: dec!(25),
                    currency_id: CurrencyId(1),
                    fx_rate_to_base: Decimal::ONE,
                    instrument_id: None,
                    trade_id: Some(TradeId(1)),
                    date: d(2),
                },
                &snap,
            )
            .unwrap();
        let day_pnl = tracker.mark_day(d(2), &HashMap::new(), &HashMap::new());
        assert_eq!(day_pnl, dec!(25));

        let mut trade = Trade::new(TradeId(1), "test", d(2));
        tracker.write_stats(&mut trade);
        assert_eq!(trade.stats.realized_pnl_long, dec!(25));
    }

    #[test]
    fn missing_price_marks_without_movement() {
        let snap = snapshot();
        let mut tracker = TradeTracker::new(TradeId(1), CurrencyId(1));
        tracker.add_order(&order(1, 1, dec!(100), dec!(10), 2), &snap).unwrap();
        // No price for the instrument: the day shows no market movement.
        let day_pnl = tracker.mark_day(d(2), &HashMap::new(), &HashMap::new());
        assert_eq!(day_pnl, Decimal::ZERO);
        assert!(tracker.is_open());
    }
}
