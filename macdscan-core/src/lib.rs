//! macdscan core: MACD signal detection for daily equity series.
//!
//! This crate contains the pure, single-threaded pipeline:
//! - Domain types (bars, fundamentals) and series validation
//! - Indicators (EMA, MACD, RSI, ATR, SMA) and the `IndicatorFrame`
//! - Daily → weekly resampling
//! - The gate classifier (Main / Watchlist / Reject) and composite score
//! - Risk/reward annotation and the MACD crossover backtest

pub mod backtest;
pub mod classifier;
pub mod domain;
pub mod error;
pub mod frame;
pub mod indicators;
pub mod resample;
pub mod risk;

pub use backtest::{simulate, simulate_detailed, BacktestReport, Trade};
pub use classifier::{screen, Classification, Classifier, ClassifierConfig, Verdict};
pub use domain::{Bar, Fundamentals};
pub use error::CoreError;
pub use frame::{IndicatorFrame, IndicatorParams};
pub use resample::resample_weekly;
pub use risk::{annotate, Action, RiskAnnotation};

/// Round to 2 decimal places (half away from zero).
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
