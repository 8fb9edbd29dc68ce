//! Portfolio-level replay state: one `TradeTracker` per trade in a logical
//! grouping, portfolio-level instrument ledgers, and the aggregate P&L,
//! ROAC and ROTC curves.

use crate::curve::EquityCurve;
use crate::domain::{
    CashTransactionRecord, CurrencyId, FxTransactionRecord, InstrumentId, JournalSnapshot,
    OrderRecord, Trade, TradeId,
};
use crate::ledger::Position;
use crate::tracker::{TradeTracker, TrackerError};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Replays a group of trades in lockstep and accumulates portfolio curves.
///
/// ROAC compounds the day's P&L over the portfolio's own allocated capital,
/// deferring P&L on zero-capital days. ROTC compounds over an externally
/// supplied total-account capital figure, with a zero return when that
/// figure is zero.
#[derive(Debug)]
pub struct PortfolioTracker {
    name: String,
    base_currency_id: CurrencyId,
    trackers: HashMap<TradeId, TradeTracker>,
    positions: HashMap<InstrumentId, Position>,

    orders_by_date: BTreeMap<NaiveDate, Vec<OrderRecord>>,
    cash_by_date: BTreeMap<NaiveDate, Vec<CashTransactionRecord>>,
    fx_by_date: BTreeMap<NaiveDate, Vec<FxTransactionRecord>>,

    pnl_curve: EquityCurve,
    pnl_long_curve: EquityCurve,
    pnl_short_curve: EquityCurve,
    roac_curve: EquityCurve,
    rotc_curve: EquityCurve,

    /// P&L accrued on zero-capital days, folded into ROAC once capital exists.
    deferred_pnl: Decimal,

    // Cumulative side totals across portfolio positions as of the last close,
    // used to split the day's P&L by side.
    prev_long_total: Decimal,
    prev_short_total: Decimal,

    capital_long_daily: Vec<Decimal>,
    capital_short_daily: Vec<Decimal>,
    capital_gross_daily: Vec<Decimal>,
}

impl PortfolioTracker {
    /// Build a tracker for the given trades, grouping their transactions by
    /// calendar date for O(1) daily lookup.
    pub fn new(
        name: impl Into<String>,
        snapshot: &JournalSnapshot,
        trade_ids: &[TradeId],
    ) -> Self {
        let mut orders_by_date: BTreeMap<NaiveDate, Vec<OrderRecord>> = BTreeMap::new();
        let mut cash_by_date: BTreeMap<NaiveDate, Vec<CashTransactionRecord>> = BTreeMap::new();
        let mut fx_by_date: BTreeMap<NaiveDate, Vec<FxTransactionRecord>> = BTreeMap::new();
        let mut trackers = HashMap::new();

        for &trade_id in trade_ids {
            trackers.insert(
                trade_id,
                TradeTracker::new(trade_id, snapshot.base_currency_id),
            );
            for order in snapshot.orders_for_trade(trade_id) {
                orders_by_date
                    .entry(order.trade_date())
                    .or_default()
                    .push(order.clone());
            }
            for tx in snapshot.cash_for_trade(trade_id) {
                cash_by_date.entry(tx.date).or_default().push(tx.clone());
            }
            for tx in snapshot.fx_for_trade(trade_id) {
                fx_by_date
                    .entry(tx.timestamp.date())
                    .or_default()
                    .push(tx.clone());
            }
        }

        Self {
            name: name.into(),
            base_currency_id: snapshot.base_currency_id,
            trackers,
            positions: HashMap::new(),
            orders_by_date,
            cash_by_date,
            fx_by_date,
            pnl_curve: EquityCurve::new(0.0, None),
            pnl_long_curve: EquityCurve::new(0.0, None),
            pnl_short_curve: EquityCurve::new(0.0, None),
            roac_curve: EquityCurve::unit(None),
            rotc_curve: EquityCurve::unit(None),
            deferred_pnl: Decimal::ZERO,
            prev_long_total: Decimal::ZERO,
            prev_short_total: Decimal::ZERO,
            capital_long_daily: Vec::new(),
            capital_short_daily: Vec::new(),
            capital_gross_daily: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Date of the earliest transaction in the grouping, if any.
    pub fn first_transaction_date(&self) -> Option<NaiveDate> {
        let mut first: Option<NaiveDate> = None;
        for d in self
            .orders_by_date
            .keys()
            .next()
            .into_iter()
            .chain(self.cash_by_date.keys().next())
            .chain(self.fx_by_date.keys().next())
        {
            first = Some(first.map_or(*d, |f| f.min(*d)));
        }
        first
    }

    /// Dispatch the day's transactions into the per-trade trackers and the
    /// portfolio-level instrument ledgers, in arrival order.
    pub fn process_items_at(
        &mut self,
        date: NaiveDate,
        snapshot: &JournalSnapshot,
    ) -> Result<(), TrackerError> {
        if let Some(orders) = self.orders_by_date.get(&date).cloned() {
            for order in &orders {
                if let Some(tracker) = self.trackers.get_mut(&order.trade_id) {
                    tracker.add_order(order, snapshot)?;
                }
                let instrument = snapshot
                    .instrument(order.instrument_id)
                    .ok_or(TrackerError::UnknownInstrument(order.instrument_id))?;
                self.positions
                    .entry(order.instrument_id)
                    .or_insert_with(|| Position::new(instrument.clone()))
                    .add_order(order)?;
            }
        }

        if let Some(cash) = self.cash_by_date.get(&date).cloned() {
            for tx in &cash {
                if let Some(trade_id) = tx.trade_id {
                    if let Some(tracker) = self.trackers.get_mut(&trade_id) {
                        tracker.add_cash_transaction(tx, snapshot)?;
                    }
                }
                if let Some(instrument_id) = tx.instrument_id {
                    if let Some(position) = self.positions.get_mut(&instrument_id) {
                        position.add_cash(tx.amount * tx.fx_rate_to_base);
                    }
                }
            }
        }

        if let Some(fx) = self.fx_by_date.get(&date).cloned() {
            for tx in &fx {
                if let Some(trade_id) = tx.trade_id {
                    if let Some(tracker) = self.trackers.get_mut(&trade_id) {
                        tracker.add_fx_transaction(tx);
                    }
                }
            }
        }
        Ok(())
    }

    /// Mark every tracker and portfolio ledger for the day and extend the
    /// portfolio curves. `total_account_capital` is the externally supplied
    /// ROTC denominator. Returns the day's total P&L in base currency.
    pub fn on_day_close(
        &mut self,
        date: NaiveDate,
        total_account_capital: Decimal,
        prices: &HashMap<InstrumentId, Decimal>,
        fx_rates: &HashMap<CurrencyId, Decimal>,
    ) -> Decimal {
        let mut day_pnl = Decimal::ZERO;
        for tracker in self.trackers.values_mut() {
            day_pnl += tracker.mark_day(date, prices, fx_rates);
        }

        // Portfolio-level ledgers carry the capital series and side split.
        let mut long_total = Decimal::ZERO;
        let mut short_total = Decimal::ZERO;
        let mut capital_long = Decimal::ZERO;
        let mut capital_short = Decimal::ZERO;
        for (instrument_id, position) in &mut self.positions {
            let currency_id = position.instrument().currency_id;
            let fx = if currency_id == self.base_currency_id {
                Some(Decimal::ONE)
            } else {
                fx_rates.get(&currency_id).copied()
            };
            match (prices.get(instrument_id).copied(), fx) {
                (Some(price), Some(fx)) => {
                    position.mark(price, fx);
                }
                (Some(price), None) => {
                    let (_, prior_fx) = position.prior_basis();
                    position.mark(price, prior_fx);
                }
                _ => {
                    position.mark_no_data();
                }
            }
            long_total += position.realized_pnl_long() + position.unrealized_pnl_long();
            short_total += position.realized_pnl_short() + position.unrealized_pnl_short();
            capital_long += position.capital().long().last().copied().unwrap_or_default();
            capital_short += position.capital().short().last().copied().unwrap_or_default();
        }

        let day_long = long_total - self.prev_long_total;
        let day_short = short_total - self.prev_short_total;
        self.prev_long_total = long_total;
        self.prev_short_total = short_total;

        let capital_gross = capital_long + capital_short;
        self.capital_long_daily.push(capital_long);
        self.capital_short_daily.push(capital_short);
        self.capital_gross_daily.push(capital_gross);

        let when = Some(date);
        self.pnl_curve
            .add_change(day_pnl.to_f64().unwrap_or(0.0), when);
        self.pnl_long_curve
            .add_change(day_long.to_f64().unwrap_or(0.0), when);
        self.pnl_short_curve
            .add_change(day_short.to_f64().unwrap_or(0.0), when);

        if capital_gross.is_zero() {
            self.deferred_pnl += day_pnl;
            self.roac_curve.add_return(0.0, when);
        } else {
            let ret = ((day_pnl + self.deferred_pnl) / capital_gross)
                .to_f64()
                .unwrap_or(0.0);
            self.roac_curve.add_return(ret, when);
            self.deferred_pnl = Decimal::ZERO;
        }

        if total_account_capital.is_zero() {
            self.rotc_curve.add_return(0.0, when);
        } else {
            let ret = (day_pnl / total_account_capital).to_f64().unwrap_or(0.0);
            self.rotc_curve.add_return(ret, when);
        }

        debug!(
            portfolio = %self.name,
            %date,
            day_pnl = %day_pnl,
            capital = %capital_gross,
            "portfolio day close"
        );
        day_pnl
    }

    /// True while any per-trade tracker is open or any transactions remain
    /// undispatched after `date`.
    pub fn is_open_after(&self, date: NaiveDate) -> bool {
        self.trackers.values().any(|t| t.is_open())
            || self.orders_by_date.keys().any(|d| *d > date)
            || self.cash_by_date.keys().any(|d| *d > date)
            || self.fx_by_date.keys().any(|d| *d > date)
    }

    pub fn tracker(&self, trade_id: TradeId) -> Option<&TradeTracker> {
        self.trackers.get(&trade_id)
    }

    pub fn positions(&self) -> &HashMap<InstrumentId, Position> {
        &self.positions
    }

    pub fn pnl_curve(&self) -> &EquityCurve {
        &self.pnl_curve
    }

    pub fn pnl_long_curve(&self) -> &EquityCurve {
        &self.pnl_long_curve
    }

    pub fn pnl_short_curve(&self) -> &EquityCurve {
        &self.pnl_short_curve
    }

    pub fn roac_curve(&self) -> &EquityCurve {
        &self.roac_curve
    }

    pub fn rotc_curve(&self) -> &EquityCurve {
        &self.rotc_curve
    }

    pub fn capital_gross_daily(&self) -> &[Decimal] {
        &self.capital_gross_daily
    }

    /// Write final statistics back onto every trade in the grouping.
    pub fn write_stats(&self, trades: &mut HashMap<TradeId, Trade>) {
        for (trade_id, tracker) in &self.trackers {
            if let Some(trade) = trades.get_mut(trade_id) {
                tracker.write_stats(trade);
            }
        }
    }
}
