//! Classifier output types.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::frame::IndicatorFrame;

use super::gates::{GateId, GateOutcome};
use super::score::ScoreBreakdown;

/// Bounds a candidate is currently held to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Strict,
    Relaxed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Main,
    Watchlist,
    Reject,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "Main",
            Self::Watchlist => "Watchlist",
            Self::Reject => "Reject",
        }
    }

    /// Sort rank: Main first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Main => 0,
            Self::Watchlist => 1,
            Self::Reject => 2,
        }
    }
}

impl From<Tier> for Classification {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Strict => Self::Main,
            Tier::Relaxed => Self::Watchlist,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a verdict came out the way it did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerdictReason {
    /// Every enabled gate passed.
    Qualified,
    GateFailed { gate: GateId, detail: String },
    InsufficientData { required: usize, actual: usize },
    InvalidInput { message: String },
}

impl VerdictReason {
    /// Short code for tables and logs, e.g. `gate_failed:negative_histogram`.
    pub fn code(&self) -> String {
        match self {
            Self::Qualified => "qualified".to_string(),
            Self::GateFailed { gate, .. } => format!("gate_failed:{gate}"),
            Self::InsufficientData { .. } => "insufficient_data".to_string(),
            Self::InvalidInput { .. } => "invalid_input".to_string(),
        }
    }
}

impl From<CoreError> for VerdictReason {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientData { required, actual } => {
                Self::InsufficientData { required, actual }
            }
            CoreError::InvalidInput(message) | CoreError::NotAnnotatable(message) => {
                Self::InvalidInput { message }
            }
        }
    }
}

/// ATR-based exit levels for a Main verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLevels {
    pub atr: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl RiskLevels {
    pub fn from_atr(close: f64, atr: f64, stop_mult: f64, target_mult: f64) -> Self {
        Self {
            atr,
            stop_loss: close - stop_mult * atr,
            take_profit: close + target_mult * atr,
        }
    }
}

/// Classification of the last bar of a series. Ticker-agnostic; the caller
/// attaches identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub classification: Classification,
    pub reason: VerdictReason,
    pub date: Option<NaiveDate>,
    pub close: Option<f64>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub hist: Option<f64>,
    /// Main only.
    pub levels: Option<RiskLevels>,
    /// Main only, when scoring is enabled.
    pub score: Option<ScoreBreakdown>,
    /// Every gate evaluated, in order. Ends at the first failure.
    pub gates: Vec<GateOutcome>,
}

impl Verdict {
    /// Verdict skeleton carrying the last bar's values.
    pub(crate) fn for_frame(frame: &IndicatorFrame, classification: Classification) -> Self {
        let last = frame.last_index();
        Self {
            classification,
            reason: VerdictReason::Qualified,
            date: frame.last_bar().map(|b| b.date),
            close: frame.close(last),
            macd: frame.macd_at(last),
            signal: frame.signal_at(last),
            hist: frame.hist_at(last),
            levels: None,
            score: None,
            gates: Vec::new(),
        }
    }

    /// Reject without a frame (the series could not be computed).
    pub fn rejected(reason: VerdictReason, date: Option<NaiveDate>, close: Option<f64>) -> Self {
        Self {
            classification: Classification::Reject,
            reason,
            date,
            close,
            macd: None,
            signal: None,
            hist: None,
            levels: None,
            score: None,
            gates: Vec::new(),
        }
    }

    pub fn is_main(&self) -> bool {
        self.classification == Classification::Main
    }

    /// The gate that rejected this verdict, if any.
    pub fn failed_gate(&self) -> Option<GateId> {
        match &self.reason {
            VerdictReason::GateFailed { gate, .. } => Some(*gate),
            _ => None,
        }
    }
}
