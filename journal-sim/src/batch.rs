//! Batch entry point: replay every open trade, sequentially or in parallel.

use crate::provider::{MarketDataProvider, SeriesCache};
use crate::trade_sim::{SimError, TradeSimulator};
use journal_core::domain::{JournalSnapshot, Trade, TradeId};
use rayon::prelude::*;
use tracing::error;

/// Outcome of a batch run. A failed trade never aborts the batch; it is
/// logged and reported here instead.
#[derive(Debug)]
pub struct BatchOutcome {
    pub trades: Vec<Trade>,
    pub failures: Vec<(TradeId, SimError)>,
}

impl BatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Simulate every open trade in the snapshot.
///
/// All replays share one series cache, so each distinct series is fetched
/// once per batch regardless of how many trades reference it.
pub fn simulate_all<P: MarketDataProvider + ?Sized>(
    snapshot: &JournalSnapshot,
    provider: &P,
    parallel: bool,
) -> BatchOutcome {
    let mut trade_ids: Vec<TradeId> = snapshot
        .trades
        .values()
        .filter(|t| t.open)
        .map(|t| t.id)
        .collect();
    trade_ids.sort();

    let cache = SeriesCache::new();
    let run = |trade_id: &TradeId| -> Result<Trade, (TradeId, SimError)> {
        TradeSimulator::new(snapshot, provider, &cache)
            .simulate(*trade_id)
            .map_err(|e| (*trade_id, e))
    };

    let results: Vec<Result<Trade, (TradeId, SimError)>> = if parallel {
        trade_ids.par_iter().map(run).collect()
    } else {
        trade_ids.iter().map(run).collect()
    };

    let mut outcome = BatchOutcome {
        trades: Vec::new(),
        failures: Vec::new(),
    };
    for result in results {
        match result {
            Ok(trade) => outcome.trades.push(trade),
            Err((trade_id, err)) => {
                error!(%trade_id, error = %err, "trade simulation failed");
                outcome.failures.push((trade_id, err));
            }
        }
    }
    outcome
}
