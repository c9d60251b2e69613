//! Simple Moving Average (SMA).
//!
//! Rolling mean over a lookback window, on close or on volume.
//! Lookback: period - 1 (first valid value at index period-1).
//! A window containing a NaN (e.g. a bar with missing volume) is NaN.

use crate::domain::Bar;

use super::Indicator;

/// Which bar column an SMA averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmaSource {
    Close,
    Volume,
}

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: SmaSource,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self::of(period, SmaSource::Close)
    }

    pub fn volume(period: usize) -> Self {
        Self::of(period, SmaSource::Volume)
    }

    fn of(period: usize, source: SmaSource) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        let name = match source {
            SmaSource::Close => format!("sma_{period}"),
            SmaSource::Volume => format!("vol_sma_{period}"),
        };
        Self {
            period,
            source,
            name,
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let values: Vec<f64> = match self.source {
            SmaSource::Close => bars.iter().map(|b| b.close).collect(),
            SmaSource::Volume => bars.iter().map(Bar::volume_f64).collect(),
        };
        sma_of_series(&values, self.period)
    }
}

/// Rolling mean of an arbitrary series.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    // Running sum over finite values plus a count of NaNs in the window.
    let mut sum = 0.0;
    let mut nan_count = 0usize;

    for i in 0..n {
        let entering = values[i];
        if entering.is_nan() {
            nan_count += 1;
        } else {
            sum += entering;
        }

        if i >= period {
            let leaving = values[i - period];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }

        if i + 1 >= period && nan_count == 0 {
            result[i] = sum / period as f64;
        }
    }

    result
}
