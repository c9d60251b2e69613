//! Composite ranking score for Main candidates.
//!
//! Four sub-scores, each in [0, 100], combined with normalised weights:
//! - pattern: how close the histogram has come back to zero, plus a bonus for
//!   a bullish divergence
//! - momentum: RSI near the midline and contracting volume
//! - fundamental: cheap valuation and revenue growth
//! - relative strength: trailing return against the benchmark

use serde::{Deserialize, Serialize};

use crate::domain::Fundamentals;
use crate::frame::IndicatorFrame;
use crate::round2;

use super::config::{FilterThresholds, ScoreWeights};
use super::gates::find_bullish_divergence;
use super::gates::pattern::last_three_hist;

/// Bars used for the relative-strength return.
pub const RELATIVE_STRENGTH_BARS: usize = 60;

/// Revenue growth that earns a full growth score.
const FULL_GROWTH: f64 = 0.30;

/// Market-wide inputs shared by every ticker in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketContext {
    /// Benchmark percentage return over the same trailing window.
    pub benchmark_return_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub pattern: f64,
    pub momentum: f64,
    pub fundamental: f64,
    pub relative_strength: f64,
    pub total: f64,
}

fn clamp100(x: f64) -> f64 {
    x.clamp(0.0, 100.0)
}

fn pattern_score(frame: &IndicatorFrame, thresholds: &FilterThresholds) -> f64 {
    let convergence = match last_three_hist(frame) {
        Some([h1, _, h3]) if h1 != 0.0 => (60.0 * (1.0 - h3.abs() / h1.abs())).clamp(0.0, 60.0),
        _ => 0.0,
    };
    let divergence = find_bullish_divergence(
        frame,
        thresholds.divergence_lookback,
        thresholds.divergence_window,
    );
    convergence + if divergence.is_some() { 40.0 } else { 0.0 }
}

fn momentum_score(frame: &IndicatorFrame) -> f64 {
    let last = frame.last_index();
    let rsi = frame
        .rsi_at(last)
        .map_or(50.0, |r| clamp100(100.0 - 2.5 * (r - 50.0).abs()));
    let volume = match (frame.vol_ma_fast_at(last), frame.vol_ma_slow_at(last)) {
        (Some(fast), Some(slow)) if slow > 0.0 => clamp100(100.0 * (1.0 - fast / slow) + 50.0),
        _ => 50.0,
    };
    (rsi + volume) / 2.0
}

fn fundamental_score(fundamentals: Option<&Fundamentals>, max_pe: f64) -> f64 {
    let Some((pe, growth)) = fundamentals.and_then(|f| Some((f.trailing_pe?, f.revenue_growth?)))
    else {
        return 0.0;
    };
    let valuation = if pe > 0.0 {
        clamp100(100.0 * (max_pe - pe) / max_pe)
    } else {
        0.0
    };
    let growth = clamp100(100.0 * growth / FULL_GROWTH);
    (valuation + growth) / 2.0
}

/// Percentage close return over the last `RELATIVE_STRENGTH_BARS` bars (all
/// bars when fewer).
pub fn trailing_return_pct(frame: &IndicatorFrame) -> Option<f64> {
    let n = frame.len();
    if n < 2 {
        return None;
    }
    let lag = RELATIVE_STRENGTH_BARS.min(n - 1);
    let last = frame.close(n - 1)?;
    let base = frame.close(n - 1 - lag)?;
    Some((last / base - 1.0) * 100.0)
}

fn relative_strength_score(frame: &IndicatorFrame, market: &MarketContext) -> f64 {
    let r = trailing_return_pct(frame).unwrap_or(0.0);
    let b = market.benchmark_return_pct.unwrap_or(0.0);
    clamp100(50.0 + 2.5 * (r - b))
}

/// Score the last bar of `frame`.
pub fn compute_score(
    frame: &IndicatorFrame,
    fundamentals: Option<&Fundamentals>,
    weights: &ScoreWeights,
    thresholds: &FilterThresholds,
    market: &MarketContext,
) -> ScoreBreakdown {
    let pattern = pattern_score(frame, thresholds);
    let momentum = momentum_score(frame);
    let fundamental = fundamental_score(fundamentals, thresholds.max_pe);
    let relative_strength = relative_strength_score(frame, market);

    let weighted = weights.pattern * pattern
        + weights.momentum * momentum
        + weights.fundamental * fundamental
        + weights.relative_strength * relative_strength;
    let total = if weights.total() > 0.0 {
        weighted / weights.total()
    } else {
        0.0
    };

    ScoreBreakdown {
        pattern: round2(pattern),
        momentum: round2(momentum),
        fundamental: round2(fundamental),
        relative_strength: round2(relative_strength),
        total: round2(total),
    }
}
