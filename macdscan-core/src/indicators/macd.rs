//! MACD (Moving Average Convergence Divergence).
//!
//! MACD = EMA(close, fast) - EMA(close, slow)
//! Signal = EMA(MACD, signal)
//! Histogram = MACD - Signal
//!
//! Both EMAs and the signal EMA recurse from bar 0 (first-value seed), so a
//! value at bar t matches a causal pandas-style `ewm(adjust=False)` run.
//! Reported warmup:
//! - MACD undefined for t < max(fast, slow) - 1
//! - Signal and Histogram undefined for t < max(fast, slow) + signal - 2

use crate::domain::Bar;

use super::{closes, ema_of_series, mask_warmup, Indicator};

/// The three MACD lines, each the same length as the input.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub hist: Vec<f64>,
}

/// Compute all three MACD lines from a close series.
pub fn macd_of_series(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let ema_fast = ema_of_series(values, fast);
    let ema_slow = ema_of_series(values, slow);

    let raw_macd: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let mut signal_line = ema_of_series(&raw_macd, signal);
    let mut hist: Vec<f64> = raw_macd
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    let (macd_lookback, signal_lookback) = macd_lookbacks(fast, slow, signal);
    let mut macd = raw_macd;
    mask_warmup(&mut macd, macd_lookback);
    mask_warmup(&mut signal_line, signal_lookback);
    mask_warmup(&mut hist, signal_lookback);

    MacdSeries {
        macd,
        signal: signal_line,
        hist,
    }
}

/// (MACD lookback, signal/histogram lookback).
pub(crate) fn macd_lookbacks(fast: usize, slow: usize, signal: usize) -> (usize, usize) {
    let macd_lookback = fast.max(slow).saturating_sub(1);
    (macd_lookback, macd_lookback + signal.saturating_sub(1))
}

/// Which MACD line an indicator instance reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Macd,
    Signal,
    Histogram,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    line: MacdLine,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, line: MacdLine) -> Self {
        assert!(fast >= 1 && slow >= 1 && signal >= 1, "MACD spans must be >= 1");
        assert!(slow > fast, "slow span must be > fast span");
        let prefix = match line {
            MacdLine::Macd => "macd",
            MacdLine::Signal => "macd_signal",
            MacdLine::Histogram => "macd_hist",
        };
        Self {
            fast,
            slow,
            signal,
            line,
            name: format!("{prefix}_{fast}_{slow}_{signal}"),
        }
    }

    pub fn default_params(line: MacdLine) -> Self {
        Self::new(12, 26, 9, line)
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        let (macd_lookback, signal_lookback) = macd_lookbacks(self.fast, self.slow, self.signal);
        match self.line {
            MacdLine::Macd => macd_lookback,
            MacdLine::Signal | MacdLine::Histogram => signal_lookback,
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let series = macd_of_series(&closes(bars), self.fast, self.slow, self.signal);
        match self.line {
            MacdLine::Macd => series.macd,
            MacdLine::Signal => series.signal,
            MacdLine::Histogram => series.hist,
        }
    }
}
