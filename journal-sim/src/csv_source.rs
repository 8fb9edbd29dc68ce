//! CSV-backed market data provider, used for tests and demos.
//!
//! Expects one file per series in a single directory: `<SYMBOL>.csv` for
//! instruments and `<CODE>.csv` for currencies, with a
//! `date,open,high,low,close[,adj_close]` header. FX files carry the
//! base-per-unit rate in `close`.

use crate::provider::{DataError, MarketDataProvider};
use chrono::NaiveDate;
use journal_core::domain::{Currency, Instrument};
use journal_core::series::Bar;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvBar {
    date: NaiveDate,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    #[serde(default)]
    adj_close: Option<Decimal>,
}

impl From<CsvBar> for Bar {
    fn from(row: CsvBar) -> Self {
        Bar {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            adj_close: row.adj_close,
        }
    }
}

/// Directory-of-CSV-files provider.
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    dir: PathBuf,
}

impl CsvBarSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn read_file(
        &self,
        name: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.dir.join(format!("{name}.csv"));
        let mut reader = csv::Reader::from_path(&path).map_err(|e| match e.kind() {
            csv::ErrorKind::Io(_) => DataError::SymbolNotFound {
                symbol: name.to_string(),
            },
            _ => DataError::Malformed {
                symbol: name.to_string(),
                detail: e.to_string(),
            },
        })?;

        let mut bars = Vec::new();
        for row in reader.deserialize::<CsvBar>() {
            let row = row.map_err(|e| DataError::Malformed {
                symbol: name.to_string(),
                detail: e.to_string(),
            })?;
            if row.date >= from && row.date <= to {
                bars.push(Bar::from(row));
            }
        }
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

impl MarketDataProvider for CsvBarSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn price_series(
        &self,
        instrument: &Instrument,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        self.read_file(&instrument.symbol, from, to)
    }

    fn fx_series(
        &self,
        currency: &Currency,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        self.read_file(&currency.code, from, to)
            .map_err(|e| match e {
                DataError::SymbolNotFound { .. } => DataError::CurrencyNotFound {
                    code: currency.code.clone(),
                },
                other => other,
            })
    }

    /// Scans every CSV in the directory for the latest bar date.
    fn latest_date(&self) -> Result<NaiveDate, DataError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| DataError::Io {
            path: self.dir.display().to_string(),
            source: e,
        })?;

        let mut latest: Option<NaiveDate> = None;
        for entry in entries {
            let entry = entry.map_err(|e| DataError::Io {
                path: self.dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let bars = self.read_file(stem, NaiveDate::MIN, NaiveDate::MAX)?;
            if let Some(last) = bars.last() {
                latest = Some(latest.map_or(last.date, |d| d.max(last.date)));
            }
        }
        latest.ok_or(DataError::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::domain::{CurrencyId, InstrumentId};
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, body: &str) {
        let mut f = std::fs::File::create(dir.join(format!("{name}.csv"))).unwrap();
        writeln!(f, "date,open,high,low,close,adj_close").unwrap();
        write!(f, "{body}").unwrap();
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn reads_and_filters_price_bars() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "SPY",
            "2024-01-02,470,472,469,471,471\n\
             2024-01-03,471,473,470,472,472\n\
             2024-01-04,472,474,471,473,473\n",
        );
        let source = CsvBarSource::new(dir.path());
        let instrument = Instrument::equity(InstrumentId(1), "SPY", CurrencyId(1));

        let bars = source.price_series(&instrument, d(3), d(4)).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, d(3));
        assert_eq!(bars[1].close, dec!(473));
    }

    #[test]
    fn missing_symbol_is_a_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvBarSource::new(dir.path());
        let instrument = Instrument::equity(InstrumentId(1), "NOPE", CurrencyId(1));
        let err = source.price_series(&instrument, d(2), d(5)).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn latest_date_spans_all_files() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "SPY", "2024-01-02,470,472,469,471,471\n");
        write_csv(dir.path(), "EUR", "2024-01-05,1.2,1.2,1.2,1.2,\n");
        let source = CsvBarSource::new(dir.path());
        assert_eq!(source.latest_date().unwrap(), d(5));
    }
}
