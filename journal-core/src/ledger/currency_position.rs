//! Per-currency ledger: the FX analogue of `Position`, without FIFO lots or
//! capital usage.

use crate::domain::{CurrencyId, FxTransactionRecord};
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Running state for one non-base currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyPosition {
    currency_id: CurrencyId,
    quantity: Decimal,
    /// Average acquisition rate to base.
    cost_basis: Decimal,
    /// Reference rate for the day-level P&L stream, advanced at each mark.
    prior_cost_basis: Decimal,
    realized_pnl: Decimal,
    total_pnl: Decimal,
    todays_realized: Decimal,
}

impl CurrencyPosition {
    pub fn new(currency_id: CurrencyId) -> Self {
        Self {
            currency_id,
            quantity: Decimal::ZERO,
            cost_basis: Decimal::ZERO,
            prior_cost_basis: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            total_pnl: Decimal::ZERO,
            todays_realized: Decimal::ZERO,
        }
    }

    /// Apply an FX transaction using the same weighted-average/reversal
    /// basis rules as the instrument ledger, realizing P&L proportional to
    /// the quantity closed.
    pub fn add_transaction(&mut self, tx: &FxTransactionRecord) {
        let qty = tx.quantity;
        if qty.is_zero() {
            return;
        }
        let rate = tx.rate();

        let pos_qty = self.quantity;
        let same_side = pos_qty.is_zero() || pos_qty.signum() == qty.signum();
        let reversal = !same_side && qty.abs() > pos_qty.abs();

        if !same_side {
            let closed_abs = qty.abs().min(pos_qty.abs());
            let dir = pos_qty.signum();
            self.realized_pnl += closed_abs * dir * (rate - self.cost_basis);
            self.todays_realized += closed_abs * dir * (rate - self.prior_cost_basis);
        }

        if pos_qty.is_zero() || reversal {
            self.cost_basis = rate;
            self.prior_cost_basis = rate;
        } else if same_side {
            let total = pos_qty.abs() + qty.abs();
            self.cost_basis = (self.cost_basis * pos_qty.abs() + rate * qty.abs()) / total;
            self.prior_cost_basis =
                (self.prior_cost_basis * pos_qty.abs() + rate * qty.abs()) / total;
        }

        self.quantity += qty;
        if self.quantity.is_zero() {
            self.cost_basis = Decimal::ZERO;
            self.prior_cost_basis = Decimal::ZERO;
        }
    }

    /// Mark to the day's rate and return the day's P&L delta.
    pub fn mark(&mut self, rate: Decimal) -> Decimal {
        let mut pnl = self.todays_realized;
        if !self.quantity.is_zero() {
            pnl += self.quantity * (rate - self.prior_cost_basis);
            self.prior_cost_basis = rate;
        }
        self.todays_realized = Decimal::ZERO;
        self.total_pnl += pnl;
        pnl
    }

    /// Mark a day with no rate data: no movement off the prior basis.
    pub fn mark_no_data(&mut self) -> Decimal {
        self.mark(self.prior_cost_basis)
    }

    pub fn currency_id(&self) -> CurrencyId {
        self.currency_id
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    pub fn cost_basis(&self) -> Decimal {
        self.cost_basis
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    pub fn total_pnl(&self) -> Decimal {
        self.total_pnl
    }
}
