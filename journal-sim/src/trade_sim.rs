//! Per-trade day-stepping replay.

use crate::provider::{DataError, MarketDataProvider, SeriesCache};
use chrono::{Days, NaiveDate};
use journal_core::domain::{
    CashTransactionRecord, CurrencyId, FxTransactionRecord, InstrumentId,
    JournalSnapshot, OrderRecord, Trade, TradeId,
};
use journal_core::series::TimeSeries;
use journal_core::tracker::{TradeTracker, TrackerError};
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown trade {0}")]
    UnknownTrade(TradeId),
    #[error("unknown currency {0} referenced by trade transactions")]
    UnknownCurrency(CurrencyId),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Replays a single trade's transactions over daily bars and writes the
/// derived statistics back onto a copy of the trade record.
pub struct TradeSimulator<'a, P: MarketDataProvider + ?Sized> {
    snapshot: &'a JournalSnapshot,
    provider: &'a P,
    cache: &'a SeriesCache,
}

impl<'a, P: MarketDataProvider + ?Sized> TradeSimulator<'a, P> {
    pub fn new(snapshot: &'a JournalSnapshot, provider: &'a P, cache: &'a SeriesCache) -> Self {
        Self {
            snapshot,
            provider,
            cache,
        }
    }

    /// Run the replay. Returns the trade with its `stats` block populated
    /// and its open flag recomputed.
    pub fn simulate(&self, trade_id: TradeId) -> Result<Trade, SimError> {
        let mut trade = self
            .snapshot
            .trades
            .get(&trade_id)
            .ok_or(SimError::UnknownTrade(trade_id))?
            .clone();

        let orders: Vec<OrderRecord> = self
            .snapshot
            .orders_for_trade(trade_id)
            .into_iter()
            .cloned()
            .collect();
        let cash: Vec<CashTransactionRecord> = self
            .snapshot
            .cash_for_trade(trade_id)
            .into_iter()
            .cloned()
            .collect();
        let fx: Vec<FxTransactionRecord> = self
            .snapshot
            .fx_for_trade(trade_id)
            .into_iter()
            .cloned()
            .collect();

        let Some(start) = self.start_date(&trade, &orders, &cash, &fx) else {
            warn!(%trade_id, "trade has no transactions, nothing to simulate");
            return Ok(trade);
        };
        let end = match trade.close_date {
            Some(d) => d,
            None => self.provider.latest_date()?,
        };
        let end = end.max(start);

        // One fetch per distinct instrument and non-base currency.
        let mut price_series = self.fetch_price_series(&orders, &cash, start, end)?;
        let mut fx_series = self.fetch_fx_series(&orders, &cash, &fx, start, end)?;

        let mut tracker = TradeTracker::new(trade_id, self.snapshot.base_currency_id);
        let mut next_order = 0usize;
        let mut next_cash = 0usize;
        let mut next_fx = 0usize;

        let mut date = start;
        while date <= end {
            for series in price_series.values_mut() {
                series.advance_to(date);
            }
            for series in fx_series.values_mut() {
                series.advance_to(date);
            }

            while next_order < orders.len() && orders[next_order].trade_date() <= date {
                tracker.add_order(&orders[next_order], self.snapshot)?;
                next_order += 1;
            }
            while next_cash < cash.len() && cash[next_cash].date <= date {
                tracker.add_cash_transaction(&cash[next_cash], self.snapshot)?;
                next_cash += 1;
            }
            while next_fx < fx.len() && fx[next_fx].timestamp.date() <= date {
                tracker.add_fx_transaction(&fx[next_fx]);
                next_fx += 1;
            }

            let prices: HashMap<InstrumentId, Decimal> = price_series
                .iter()
                .filter(|(_, s)| s.has_bar_on(date))
                .filter_map(|(id, s)| s.current().map(|b| (*id, b.close)))
                .collect();
            let rates: HashMap<CurrencyId, Decimal> = fx_series
                .iter()
                .filter(|(_, s)| s.has_bar_on(date))
                .filter_map(|(id, s)| s.current().map(|b| (*id, b.close)))
                .collect();

            tracker.mark_day(date, &prices, &rates);

            let all_dispatched =
                next_order == orders.len() && next_cash == cash.len() && next_fx == fx.len();
            if all_dispatched && !tracker.is_open() {
                debug!(%trade_id, %date, "replay terminated early, trade closed");
                break;
            }

            date = date + Days::new(1);
        }

        tracker.write_stats(&mut trade);
        Ok(trade)
    }

    fn start_date(
        &self,
        trade: &Trade,
        orders: &[OrderRecord],
        cash: &[CashTransactionRecord],
        fx: &[FxTransactionRecord],
    ) -> Option<NaiveDate> {
        let mut start = trade.open_date;
        for d in orders
            .first()
            .map(|o| o.trade_date())
            .into_iter()
            .chain(cash.first().map(|c| c.date))
            .chain(fx.first().map(|f| f.timestamp.date()))
        {
            start = Some(start.map_or(d, |s| s.min(d)));
        }
        start
    }

    fn fetch_price_series(
        &self,
        orders: &[OrderRecord],
        cash: &[CashTransactionRecord],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<InstrumentId, TimeSeries>, SimError> {
        let mut series = HashMap::new();
        let instrument_ids = orders
            .iter()
            .map(|o| o.instrument_id)
            .chain(cash.iter().filter_map(|c| c.instrument_id));
        for id in instrument_ids {
            if series.contains_key(&id) {
                continue;
            }
            let instrument = self
                .snapshot
                .instrument(id)
                .ok_or(TrackerError::UnknownInstrument(id))?;
            series.insert(
                id,
                self.cache
                    .price_series(self.provider, instrument, start, end)?,
            );
        }
        Ok(series)
    }

    fn fetch_fx_series(
        &self,
        orders: &[OrderRecord],
        cash: &[CashTransactionRecord],
        fx: &[FxTransactionRecord],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<CurrencyId, TimeSeries>, SimError> {
        let mut series = HashMap::new();
        let currency_ids = orders
            .iter()
            .map(|o| o.currency_id)
            .chain(cash.iter().map(|c| c.currency_id))
            .chain(fx.iter().map(|f| f.currency_id));
        for id in currency_ids {
            if id == self.snapshot.base_currency_id || series.contains_key(&id) {
                continue;
            }
            let currency = self
                .snapshot
                .currencies
                .get(&id)
                .ok_or(SimError::UnknownCurrency(id))?;
            series.insert(id, self.cache.fx_series(self.provider, currency, start, end)?);
        }
        Ok(series)
    }
}
