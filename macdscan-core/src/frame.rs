//! Indicator engine: a validated bar series plus every derived column the
//! classifier reads.
//!
//! Columns are stored as `Vec<f64>` with NaN warmup, exactly like the
//! individual indicators; accessors hand out `Option<f64>` so callers cannot
//! mistake an undefined value for zero.

use serde::{Deserialize, Serialize};

use crate::domain::{validate_series, Bar};
use crate::error::CoreError;
use crate::indicators::{closes, macd_of_series, Atr, Ema, Indicator, Rsi, Sma};

/// Minimum history the daily classifier needs (roughly three months of
/// trading days).
pub const DEFAULT_MIN_HISTORY: usize = 60;

/// Spans and windows for the indicator engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub vol_fast: usize,
    pub vol_slow: usize,
    pub trend_period: usize,
    /// Floor on the series length, on top of the longest span.
    pub min_history: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
            rsi_period: 14,
            atr_period: 14,
            vol_fast: 3,
            vol_slow: 20,
            trend_period: 60,
            min_history: DEFAULT_MIN_HISTORY,
        }
    }
}

impl IndicatorParams {
    /// Same spans, no history floor. Used for weekly frames, where six months
    /// of history is only ~26 bars.
    pub fn weekly() -> Self {
        Self {
            min_history: 0,
            ..Self::default()
        }
    }

    /// Bars required before `IndicatorFrame::compute` will run: enough for
    /// the last bar to carry a defined Signal, and at least `min_history`.
    pub fn required_bars(&self) -> usize {
        (self.slow + self.signal).saturating_sub(1)
            .max(self.atr_period)
            .max(self.min_history)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let spans = [
            ("fast", self.fast),
            ("slow", self.slow),
            ("signal", self.signal),
            ("rsi_period", self.rsi_period),
            ("atr_period", self.atr_period),
            ("vol_fast", self.vol_fast),
            ("vol_slow", self.vol_slow),
            ("trend_period", self.trend_period),
        ];
        for (name, value) in spans {
            if value == 0 {
                return Err(CoreError::InvalidInput(format!("{name} must be >= 1")));
            }
        }
        if self.fast >= self.slow {
            return Err(CoreError::InvalidInput(format!(
                "fast span ({}) must be shorter than slow span ({})",
                self.fast, self.slow
            )));
        }
        Ok(())
    }
}

/// Series augmented with per-bar indicator columns.
///
/// Invariant: every column has `bars.len()` entries.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    bars: Vec<Bar>,
    params: IndicatorParams,
    pub ema_fast: Vec<f64>,
    pub ema_slow: Vec<f64>,
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub hist: Vec<f64>,
    pub rsi: Vec<f64>,
    pub atr: Vec<f64>,
    pub vol_ma_fast: Vec<f64>,
    pub vol_ma_slow: Vec<f64>,
    pub trend_ma: Vec<f64>,
}

impl IndicatorFrame {
    /// Validate `bars` and compute every column.
    ///
    /// Fails with `InvalidInput` for malformed bars and `InsufficientData`
    /// when the series is shorter than `params.required_bars()`.
    pub fn compute(bars: &[Bar], params: &IndicatorParams) -> Result<Self, CoreError> {
        params.validate()?;
        validate_series(bars)?;

        let required = params.required_bars();
        if bars.len() < required {
            return Err(CoreError::InsufficientData {
                required,
                actual: bars.len(),
            });
        }

        let macd = macd_of_series(&closes(bars), params.fast, params.slow, params.signal);

        Ok(Self {
            bars: bars.to_vec(),
            params: *params,
            ema_fast: Ema::new(params.fast).compute(bars),
            ema_slow: Ema::new(params.slow).compute(bars),
            macd: macd.macd,
            signal: macd.signal,
            hist: macd.hist,
            rsi: Rsi::new(params.rsi_period).compute(bars),
            atr: Atr::new(params.atr_period).compute(bars),
            vol_ma_fast: Sma::volume(params.vol_fast).compute(bars),
            vol_ma_slow: Sma::volume(params.vol_slow).compute(bars),
            trend_ma: Sma::new(params.trend_period).compute(bars),
        })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Index of the most recent bar.
    pub fn last_index(&self) -> usize {
        self.bars.len().saturating_sub(1)
    }

    pub fn last_bar(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn close(&self, i: usize) -> Option<f64> {
        self.bars.get(i).map(|b| b.close)
    }

    pub fn macd_at(&self, i: usize) -> Option<f64> {
        defined(&self.macd, i)
    }

    pub fn signal_at(&self, i: usize) -> Option<f64> {
        defined(&self.signal, i)
    }

    pub fn hist_at(&self, i: usize) -> Option<f64> {
        defined(&self.hist, i)
    }

    pub fn rsi_at(&self, i: usize) -> Option<f64> {
        defined(&self.rsi, i)
    }

    pub fn atr_at(&self, i: usize) -> Option<f64> {
        defined(&self.atr, i)
    }

    pub fn vol_ma_fast_at(&self, i: usize) -> Option<f64> {
        defined(&self.vol_ma_fast, i)
    }

    pub fn vol_ma_slow_at(&self, i: usize) -> Option<f64> {
        defined(&self.vol_ma_slow, i)
    }

    pub fn trend_ma_at(&self, i: usize) -> Option<f64> {
        defined(&self.trend_ma, i)
    }

    /// Indices whose MACD value is defined, oldest first.
    pub fn defined_macd_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|&i| !self.macd[i].is_nan())
    }

    /// Indices whose histogram (and therefore signal) is defined, oldest first.
    pub fn defined_hist_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|&i| !self.hist[i].is_nan())
    }

    /// Build a frame directly from precomputed columns.
    ///
    /// Every column must have one entry per bar. Intended for callers that
    /// already hold indicator values (and for tests that need exact values).
    #[allow(clippy::too_many_arguments)]
    pub fn from_columns(
        bars: Vec<Bar>,
        params: IndicatorParams,
        macd: Vec<f64>,
        signal: Vec<f64>,
        rsi: Vec<f64>,
        atr: Vec<f64>,
        vol_ma_fast: Vec<f64>,
        vol_ma_slow: Vec<f64>,
        trend_ma: Vec<f64>,
    ) -> Result<Self, CoreError> {
        validate_series(&bars)?;
        let n = bars.len();
        let columns = [
            ("macd", macd.len()),
            ("signal", signal.len()),
            ("rsi", rsi.len()),
            ("atr", atr.len()),
            ("vol_ma_fast", vol_ma_fast.len()),
            ("vol_ma_slow", vol_ma_slow.len()),
            ("trend_ma", trend_ma.len()),
        ];
        for (name, len) in columns {
            if len != n {
                return Err(CoreError::InvalidInput(format!(
                    "column {name} has {len} values for {n} bars"
                )));
            }
        }
        let hist = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();
        Ok(Self {
            ema_fast: vec![f64::NAN; n],
            ema_slow: vec![f64::NAN; n],
            bars,
            params,
            macd,
            signal,
            hist,
            rsi,
            atr,
            vol_ma_fast,
            vol_ma_slow,
            trend_ma,
        })
    }
}

fn defined(column: &[f64], i: usize) -> Option<f64> {
    column.get(i).copied().filter(|v| !v.is_nan())
}
