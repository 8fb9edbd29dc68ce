//! Generic running-total/return/drawdown accumulator.
//!
//! Every tracker above the ledgers owns one or more of these. Values are
//! index-like ratios, not balances, so this is the one corner of the engine
//! computed in f64.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recovery tolerance: a drawdown episode ends once the drawdown fraction is
/// back within this distance of zero.
const RECOVERY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityCurve {
    equity: Vec<f64>,
    /// Drawdown as a fraction of the running peak, always <= 0.
    drawdown_pct: Vec<f64>,
    /// Drawdown in equity units, always <= 0.
    drawdown_amount: Vec<f64>,
    /// Per-period fractional return.
    returns: Vec<f64>,
    /// Per-period absolute change.
    changes: Vec<f64>,
    dates: Vec<Option<NaiveDate>>,

    peak: f64,
    /// Start of the currently open drawdown episode, if any.
    drawdown_start: Option<NaiveDate>,
    /// Completed episode lengths, in calendar days. Never negative.
    drawdown_durations: Vec<i64>,
}

impl EquityCurve {
    pub fn new(initial: f64, date: Option<NaiveDate>) -> Self {
        Self {
            equity: vec![initial],
            drawdown_pct: vec![0.0],
            drawdown_amount: vec![0.0],
            returns: vec![0.0],
            changes: vec![0.0],
            dates: vec![date],
            peak: initial,
            drawdown_start: None,
            drawdown_durations: Vec::new(),
        }
    }

    /// Unit curve starting at 1.0, for compounding return indexes.
    pub fn unit(date: Option<NaiveDate>) -> Self {
        Self::new(1.0, date)
    }

    pub fn last_equity(&self) -> f64 {
        *self.equity.last().expect("curve always has an initial point")
    }

    /// Append a fractional per-period return.
    pub fn add_return(&mut self, ret: f64, date: Option<NaiveDate>) {
        let prev = self.last_equity();
        let value = prev * (1.0 + ret);
        self.push(value, value - prev, ret, date);
    }

    /// Append an absolute change. The return is the change over the previous
    /// equity, or zero when the previous equity was zero.
    pub fn add_change(&mut self, change: f64, date: Option<NaiveDate>) {
        let prev = self.last_equity();
        let ret = if prev != 0.0 { change / prev } else { 0.0 };
        self.push(prev + change, change, ret, date);
    }

    /// Append a new equity level directly.
    pub fn add_value(&mut self, value: f64, date: Option<NaiveDate>) {
        let prev = self.last_equity();
        let change = value - prev;
        let ret = if prev != 0.0 { change / prev } else { 0.0 };
        self.push(value, change, ret, date);
    }

    fn push(&mut self, value: f64, change: f64, ret: f64, date: Option<NaiveDate>) {
        if value > self.peak {
            self.peak = value;
        }
        let dd_amount = value - self.peak;
        let dd_pct = if self.peak != 0.0 { dd_amount / self.peak } else { 0.0 };

        // Drawdown episode bookkeeping.
        if dd_pct < -RECOVERY_EPSILON {
            if self.drawdown_start.is_none() {
                self.drawdown_start = date;
            }
        } else if let Some(start) = self.drawdown_start.take() {
            if let Some(end) = date {
                self.drawdown_durations.push((end - start).num_days().max(0));
            } else {
                self.drawdown_durations.push(0);
            }
        }

        self.equity.push(value);
        self.drawdown_pct.push(dd_pct);
        self.drawdown_amount.push(dd_amount);
        self.returns.push(ret);
        self.changes.push(change);
        self.dates.push(date);
    }

    pub fn equity(&self) -> &[f64] {
        &self.equity
    }

    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    pub fn changes(&self) -> &[f64] {
        &self.changes
    }

    pub fn drawdown_pct(&self) -> &[f64] {
        &self.drawdown_pct
    }

    pub fn drawdown_amount(&self) -> &[f64] {
        &self.drawdown_amount
    }

    pub fn dates(&self) -> &[Option<NaiveDate>] {
        &self.dates
    }

    pub fn drawdown_durations(&self) -> &[i64] {
        &self.drawdown_durations
    }

    /// Deepest drawdown fraction (a value <= 0).
    pub fn max_drawdown_pct(&self) -> f64 {
        self.drawdown_pct.iter().copied().fold(0.0, f64::min)
    }

    /// Deepest drawdown in equity units (a value <= 0).
    pub fn max_drawdown_amount(&self) -> f64 {
        self.drawdown_amount.iter().copied().fold(0.0, f64::min)
    }

    /// Returns compounded multiplicatively within each (year, month).
    /// Points without a date are skipped.
    pub fn returns_by_month(&self) -> BTreeMap<(i32, u32), f64> {
        let mut months: BTreeMap<(i32, u32), f64> = BTreeMap::new();
        // The initial point carries no return.
        for (ret, date) in self.returns.iter().zip(&self.dates).skip(1) {
            if let Some(d) = date {
                let entry = months.entry((d.year(), d.month())).or_insert(1.0);
                *entry *= 1.0 + ret;
            }
        }
        months.into_iter().map(|(k, v)| (k, v - 1.0)).collect()
    }

    /// Absolute changes summed within each (year, month).
    pub fn pnl_by_month(&self) -> BTreeMap<(i32, u32), f64> {
        let mut months: BTreeMap<(i32, u32), f64> = BTreeMap::new();
        for (change, date) in self.changes.iter().zip(&self.dates).skip(1) {
            if let Some(d) = date {
                *months.entry((d.year(), d.month())).or_insert(0.0) += change;
            }
        }
        months
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> Option<NaiveDate> {
        Some(NaiveDate::from_ymd_opt(2024, m, day).unwrap())
    }

    #[test]
    fn equal_and_opposite_changes_round_trip() {
        let mut curve = EquityCurve::new(1000.0, d(1, 1));
        curve.add_change(250.0, d(1, 2));
        curve.add_change(-250.0, d(1, 3));
        assert!((curve.last_equity() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn drawdown_pct_never_positive() {
        let mut curve = EquityCurve::unit(d(1, 1));
        for (i, r) in [0.02, -0.05, 0.01, 0.08, -0.03].iter().enumerate() {
            curve.add_return(*r, d(1, 2 + i as u32));
        }
        assert!(curve.drawdown_pct().iter().all(|&dd| dd <= 0.0));
        assert!(curve.max_drawdown_pct() <= 0.0);
    }

    #[test]
    fn drawdown_episode_duration_non_negative() {
        let mut curve = EquityCurve::unit(d(1, 1));
        curve.add_return(-0.10, d(1, 2));
        curve.add_return(0.05, d(1, 5));
        // Recovers past the old peak on the 9th.
        curve.add_return(0.10, d(1, 9));
        assert_eq!(curve.drawdown_durations().len(), 1);
        assert_eq!(curve.drawdown_durations()[0], 7);
    }

    #[test]
    fn add_change_on_zero_equity_has_zero_return() {
        let mut curve = EquityCurve::new(0.0, d(1, 1));
        curve.add_change(100.0, d(1, 2));
        assert_eq!(curve.returns()[1], 0.0);
        assert!((curve.last_equity() - 100.0).abs() < 1e-12);
    }

    #[test]
    fn monthly_returns_compound() {
        let mut curve = EquityCurve::unit(d(1, 1));
        curve.add_return(0.10, d(1, 10));
        curve.add_return(0.10, d(1, 20));
        curve.add_return(-0.02, d(2, 5));
        let months = curve.returns_by_month();
        assert!((months[&(2024, 1)] - 0.21).abs() < 1e-12);
        assert!((months[&(2024, 2)] - (-0.02)).abs() < 1e-12);
    }

    #[test]
    fn monthly_pnl_sums() {
        let mut curve = EquityCurve::new(1000.0, d(1, 1));
        curve.add_change(50.0, d(1, 10));
        curve.add_change(-20.0, d(1, 15));
        curve.add_change(5.0, d(3, 2));
        let months = curve.pnl_by_month();
        assert!((months[&(2024, 1)] - 30.0).abs() < 1e-12);
        assert!((months[&(2024, 3)] - 5.0).abs() < 1e-12);
        assert!(!months.contains_key(&(2024, 2)));
    }
}
