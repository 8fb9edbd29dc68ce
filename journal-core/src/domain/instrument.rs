use super::ids::{CurrencyId, InstrumentId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Asset class of an instrument.
///
/// Options and future-options get a reduced capital-usage multiplier in the
/// ledger, reflecting that they tie up margin rather than full notional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    Equity,
    Option,
    Future,
    FutureOption,
    Cash,
    Bond,
    Cfd,
    Index,
    Warrant,
}

impl AssetClass {
    /// True for instrument types charged at reduced capital usage.
    pub fn is_option_like(&self) -> bool {
        matches!(self, AssetClass::Option | AssetClass::FutureOption)
    }
}

/// Instrument snapshot. Immutable for the duration of a simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub symbol: String,
    pub asset_class: AssetClass,
    /// Contract multiplier (1 for equities).
    pub multiplier: Decimal,
    /// Strike price, options only.
    pub strike: Option<Decimal>,
    pub currency_id: CurrencyId,
}

impl Instrument {
    pub fn equity(id: InstrumentId, symbol: impl Into<String>, currency_id: CurrencyId) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            asset_class: AssetClass::Equity,
            multiplier: Decimal::ONE,
            strike: None,
            currency_id,
        }
    }
}

/// Currency snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Currency {
    pub id: CurrencyId,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_like_classes() {
        assert!(AssetClass::Option.is_option_like());
        assert!(AssetClass::FutureOption.is_option_like());
        assert!(!AssetClass::Equity.is_option_like());
        assert!(!AssetClass::Future.is_option_like());
    }
}
