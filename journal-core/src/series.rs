//! Daily bar series and the forward-only replay cursor.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A daily OHLC bar. Doubles as an FX-rate bar (the rate lives in `close`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Dividend/split-adjusted close, when the source supplies one.
    pub adj_close: Option<Decimal>,
}

impl Bar {
    /// Flat bar at a single price, used for FX rates and test fixtures.
    pub fn flat(date: NaiveDate, price: Decimal) -> Self {
        Self {
            date,
            open: price,
            high: price,
            low: price,
            close: price,
            adj_close: None,
        }
    }
}

/// Forward-only cursor over an ordered daily series.
///
/// `advance_to` only ever moves forward; across a full replay the total work
/// is one pass over the series, so each call is amortized O(1). The bars are
/// shared (`Arc`) so the sim-level cache can hand the same series to many
/// concurrent replays without copying.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    bars: Arc<Vec<Bar>>,
    /// Index of the bar at or before the last target date. None until the
    /// cursor reaches the first bar.
    cursor: Option<usize>,
}

impl TimeSeries {
    pub fn new(bars: Arc<Vec<Bar>>) -> Self {
        Self { bars, cursor: None }
    }

    pub fn from_bars(bars: Vec<Bar>) -> Self {
        Self::new(Arc::new(bars))
    }

    /// Advance the cursor to the latest bar dated at or before `date`.
    pub fn advance_to(&mut self, date: NaiveDate) {
        let mut next = match self.cursor {
            Some(i) => i + 1,
            None => 0,
        };
        while next < self.bars.len() && self.bars[next].date <= date {
            self.cursor = Some(next);
            next += 1;
        }
    }

    /// The bar at or before the cursor date. None before the first bar.
    pub fn current(&self) -> Option<&Bar> {
        self.cursor.map(|i| &self.bars[i])
    }

    /// True when the current bar is dated exactly `date`.
    pub fn has_bar_on(&self, date: NaiveDate) -> bool {
        self.current().map(|b| b.date == date).unwrap_or(false)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
