//! Concrete indicator implementations.
//!
//! Indicators are pure functions: bar history in, numeric series out. Every
//! output has the same length as its input; warmup positions hold `f64::NAN`
//! and are never coerced to zero. `IndicatorFrame` stitches them together.
//!
//! Multi-series indicators (MACD) are exposed as separate named instances per
//! line, keeping the single-series `Indicator` trait unchanged.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

use crate::domain::Bar;

pub use atr::{true_range, Atr};
pub use ema::{ema_of_series, Ema};
pub use macd::{macd_of_series, Macd, MacdLine, MacdSeries};
pub use rsi::Rsi;
pub use sma::{sma_of_series, Sma, SmaSource};

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or later.
/// Every indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_12", "atr_14").
    fn name(&self) -> &str;

    /// Number of leading bars whose output is undefined.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`.
    /// The first `lookback()` values are `f64::NAN`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Overwrite the first `count` values with NaN.
pub(crate) fn mask_warmup(values: &mut [f64], count: usize) {
    for v in values.iter_mut().take(count) {
        *v = f64::NAN;
    }
}

/// Close prices of a bar slice.
pub(crate) fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::ohlcv(
                base_date + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
