//! Criterion benchmarks for the per-ticker hot path.
//!
//! Benchmarks:
//! 1. Indicator frame computation
//! 2. Classification of a computed frame (default and full-filter profiles)
//! 3. Crossover backtest

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use macdscan_core::classifier::{Classifier, ClassifierConfig};
use macdscan_core::{simulate, Bar, IndicatorFrame, IndicatorParams};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            let open = close - 0.3;
            Bar::ohlcv(
                base_date + chrono::Duration::days(i as i64),
                open,
                close + 1.5,
                close - 1.5,
                close,
                1_000_000 + (i as u64 % 500_000),
            )
        })
        .collect()
}

// ── 1. Indicator frame ───────────────────────────────────────────────

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_frame");
    let params = IndicatorParams::default();

    for &bar_count in &[252, 1260, 2520] {
        let bars = make_bars(bar_count);
        group.bench_with_input(BenchmarkId::new("compute", bar_count), &bar_count, |b, _| {
            b.iter(|| IndicatorFrame::compute(black_box(&bars), black_box(&params)));
        });
    }

    group.finish();
}

// ── 2. Classification ────────────────────────────────────────────────

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    let frame = IndicatorFrame::compute(&make_bars(1260), &IndicatorParams::default()).unwrap();

    let default = Classifier::new(ClassifierConfig::default()).unwrap();
    group.bench_function("default_1260_bars", |b| {
        b.iter(|| default.classify(black_box(&frame), None, None));
    });

    let full = Classifier::new(ClassifierConfig::full_filters()).unwrap();
    group.bench_function("full_filters_1260_bars", |b| {
        b.iter(|| full.classify(black_box(&frame), None, None));
    });

    group.finish();
}

// ── 3. Backtest ──────────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let frame = IndicatorFrame::compute(&make_bars(2520), &IndicatorParams::default()).unwrap();
    c.bench_function("crossover_backtest_2520_bars", |b| {
        b.iter(|| simulate(black_box(&frame), 1_000_000.0));
    });
}

criterion_group!(benches, bench_frame, bench_classify, bench_backtest);
criterion_main!(benches);
