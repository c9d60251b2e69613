//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = k * x[t] + (1 - k) * EMA[t-1], k = 2 / (span + 1)
//! Seed: EMA[0] = x[0] (first value, not a simple-average seed).
//! Lookback: span - 1. The recursion runs from bar 0; only the reported
//! values are masked during warmup.

use crate::domain::Bar;

use super::{closes, mask_warmup, Indicator};

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    name: String,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self {
            span,
            name: format!("ema_{span}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.span.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = ema_of_series(&closes(bars), self.span);
        mask_warmup(&mut result, self.lookback());
        result
    }
}

/// Compute raw (unmasked) EMA values from a pre-extracted f64 slice.
///
/// Seeded by the first value. A NaN input taints its own position and every
/// later one, since the recursion cannot continue past it.
pub fn ema_of_series(values: &[f64], span: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n == 0 || span == 0 {
        return result;
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut prev = values[0];
    if prev.is_nan() {
        return result;
    }
    result[0] = prev;

    for i in 1..n {
        if values[i].is_nan() {
            return result;
        }
        let ema = values[i] * k + prev * (1.0 - k);
        result[i] = ema;
        prev = ema;
    }

    result
}
