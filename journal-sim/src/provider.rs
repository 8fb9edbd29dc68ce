//! Market-data provider trait, structured error types, and the shared
//! series cache.
//!
//! The `MarketDataProvider` trait abstracts over data sources (CSV files,
//! a broker's history endpoint, test fixtures) so replays can swap
//! implementations and mock for tests. The cache layer sits above the
//! trait — providers don't know about the cache.

use chrono::NaiveDate;
use journal_core::domain::{Currency, CurrencyId, Instrument, InstrumentId};
use journal_core::series::{Bar, TimeSeries};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::debug;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no price data for symbol '{symbol}'")]
    SymbolNotFound { symbol: String },

    #[error("no FX data for currency '{code}'")]
    CurrencyNotFound { code: String },

    #[error("provider has no data at all (empty universe)")]
    NoData,

    #[error("malformed bar data for '{symbol}': {detail}")]
    Malformed { symbol: String, detail: String },

    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("data error: {0}")]
    Other(String),
}

/// A source of daily price bars and FX-rate bars.
///
/// `price_series`/`fx_series` return bars ordered by date, covering at most
/// `[from, to]`. `latest_date` caps the replay horizon for still-open trades.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn price_series(
        &self,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Bar>, DataError>;

    /// Daily base-per-unit rates for a currency; the rate lives in `close`.
    fn fx_series(
        &self,
        currency: &Currency,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Bar>, DataError>;

    /// Latest date for which any data exists.
    fn latest_date(&self) -> Result<NaiveDate, DataError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SeriesKey {
    Price(InstrumentId, NaiveDate, NaiveDate),
    Fx(CurrencyId, NaiveDate, NaiveDate),
}

/// Shared series cache for a batch of replays.
///
/// One lock guards population; a populated entry is an `Arc` shared with
/// every `TimeSeries` handed out, so concurrent replays over the same
/// instrument never copy the bars. Readers of populated entries only take
/// the read lock.
#[derive(Debug, Default)]
pub struct SeriesCache {
    entries: RwLock<HashMap<SeriesKey, Arc<Vec<Bar>>>>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price_series<P: MarketDataProvider + ?Sized>(
        &self,
        provider: &P,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<TimeSeries, DataError> {
        let key = SeriesKey::Price(instrument.id, from, to);
        self.get_or_fetch(key, || {
            debug!(symbol = %instrument.symbol, %from, %to, "fetching price series");
            provider.price_series(instrument, from, to)
        })
    }

    pub fn fx_series<P: MarketDataProvider + ?Sized>(
        &self,
        provider: &P,
        currency: &Currency,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<TimeSeries, DataError> {
        let key = SeriesKey::Fx(currency.id, from, to);
        self.get_or_fetch(key, || {
            debug!(code = %currency.code, %from, %to, "fetching fx series");
            provider.fx_series(currency, from, to)
        })
    }

    fn get_or_fetch(
        &self,
        key: SeriesKey,
        fetch: impl FnOnce() -> Result<Vec<Bar>, DataError>,
    ) -> Result<TimeSeries, DataError> {
        if let Some(bars) = self
            .entries
            .read()
            .expect("series cache lock poisoned")
            .get(&key)
        {
            return Ok(TimeSeries::new(Arc::clone(bars)));
        }

        let mut entries = self.entries.write().expect("series cache lock poisoned");
        // Another replay may have populated the entry while we waited.
        if let Some(bars) = entries.get(&key) {
            return Ok(TimeSeries::new(Arc::clone(bars)));
        }
        let bars = Arc::new(fetch()?);
        entries.insert(key, Arc::clone(&bars));
        Ok(TimeSeries::new(bars))
    }
}
