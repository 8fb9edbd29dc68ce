//! Per-day capital usage accumulator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Accumulates "today's" long/short capital usage and commits it into the
/// historical long/short/gross/net series at end of day.
///
/// A day's committed value is only final after `end_of_day` has run, and
/// `end_of_day` must run exactly once per simulated day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocatedCapital {
    today_long: Decimal,
    today_short: Decimal,
    long: Vec<Decimal>,
    short: Vec<Decimal>,
    gross: Vec<Decimal>,
    net: Vec<Decimal>,
}

impl AllocatedCapital {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_long(&mut self, amount: Decimal) {
        self.today_long += amount;
    }

    pub fn add_short(&mut self, amount: Decimal) {
        self.today_short += amount;
    }

    pub fn today_long(&self) -> Decimal {
        self.today_long
    }

    pub fn today_short(&self) -> Decimal {
        self.today_short
    }

    pub fn today_gross(&self) -> Decimal {
        self.today_long + self.today_short
    }

    /// Commit today's accumulators into the historical series and reset them.
    pub fn end_of_day(&mut self) {
        self.long.push(self.today_long);
        self.short.push(self.today_short);
        self.gross.push(self.today_long + self.today_short);
        self.net.push(self.today_long - self.today_short);
        self.today_long = Decimal::ZERO;
        self.today_short = Decimal::ZERO;
    }

    pub fn long(&self) -> &[Decimal] {
        &self.long
    }

    pub fn short(&self) -> &[Decimal] {
        &self.short
    }

    pub fn gross(&self) -> &[Decimal] {
        &self.gross
    }

    pub fn net(&self) -> &[Decimal] {
        &self.net
    }

    pub fn days(&self) -> usize {
        self.gross.len()
    }

    /// Average of the nonzero values in a committed series. Capital averages
    /// deliberately ignore flat days.
    pub fn average_nonzero(series: &[Decimal]) -> Decimal {
        let nonzero: Vec<Decimal> = series.iter().copied().filter(|v| !v.is_zero()).collect();
        if nonzero.is_empty() {
            Decimal::ZERO
        } else {
            nonzero.iter().sum::<Decimal>() / Decimal::from(nonzero.len())
        }
    }
}
