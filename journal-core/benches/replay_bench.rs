//! Criterion benchmarks for the replay hot paths.
//!
//! Benchmarks:
//! 1. Position day loop (add_order + mark over a multi-year replay)
//! 2. FIFO lot matching under heavy churn
//! 3. EquityCurve accumulation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::NaiveDate;
use journal_core::curve::EquityCurve;
use journal_core::domain::{CurrencyId, Instrument, InstrumentId, OrderId, OrderRecord, TradeId};
use journal_core::ledger::Position;
use rust_decimal::Decimal;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_order(id: i64, qty: i64, price_cents: i64) -> OrderRecord {
    OrderRecord {
        id: OrderId(id),
        instrument_id: InstrumentId(1),
        trade_id: TradeId(1),
        quantity: Decimal::from(qty),
        price: Decimal::new(price_cents, 2),
        multiplier: Decimal::ONE,
        currency_id: CurrencyId(1),
        fx_rate_to_base: Decimal::ONE,
        commission: Decimal::new(100, 2),
        timestamp: NaiveDate::from_ymd_opt(2020, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap(),
    }
}

fn price_on(day: usize) -> Decimal {
    // Deterministic wander around 100.00.
    Decimal::new(10_000 + ((day * 37) % 500) as i64 - 250, 2)
}

// ── 1. Position day loop ─────────────────────────────────────────────

fn bench_position_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("position_replay");
    for days in [252usize, 1260] {
        group.bench_with_input(BenchmarkId::from_parameter(days), &days, |b, &days| {
            b.iter(|| {
                let mut position = Position::new(Instrument::equity(
                    InstrumentId(1),
                    "SPY",
                    CurrencyId(1),
                ));
                position.add_order(&make_order(0, 100, 10_000)).unwrap();
                for day in 0..days {
                    if day % 21 == 0 {
                        let qty = if day % 42 == 0 { 50 } else { -50 };
                        position
                            .add_order(&make_order(day as i64 + 1, qty, 10_000))
                            .unwrap();
                    }
                    black_box(position.mark(price_on(day), Decimal::ONE));
                }
                black_box(position.roac())
            })
        });
    }
    group.finish();
}

// ── 2. FIFO churn ────────────────────────────────────────────────────

fn bench_fifo_churn(c: &mut Criterion) {
    c.bench_function("fifo_churn_1k_orders", |b| {
        b.iter(|| {
            let mut position =
                Position::new(Instrument::equity(InstrumentId(1), "SPY", CurrencyId(1)));
            for i in 0..1000i64 {
                let qty = if i % 3 == 2 { -150 } else { 100 };
                position
                    .add_order(&make_order(i, qty, 10_000 + (i % 200)))
                    .unwrap();
            }
            black_box(position.lots().len())
        })
    });
}

// ── 3. EquityCurve accumulation ──────────────────────────────────────

fn bench_equity_curve(c: &mut Criterion) {
    c.bench_function("equity_curve_5k_points", |b| {
        let start = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        b.iter(|| {
            let mut curve = EquityCurve::unit(Some(start));
            for i in 0..5000u64 {
                let ret = ((i % 19) as f64 - 9.0) / 1000.0;
                curve.add_return(ret, Some(start + chrono::Days::new(i)));
            }
            black_box(curve.max_drawdown_pct())
        })
    });
}

criterion_group!(
    benches,
    bench_position_replay,
    bench_fifo_churn,
    bench_equity_curve
);
criterion_main!(benches);
