//! Classifier gates: one admission condition each.
//!
//! A gate evaluates the indicator frame (plus optional weekly frame and
//! fundamentals) under a tier and returns a `GateOutcome` carrying the verdict
//! and a snapshot of the values it looked at. Gates never mutate anything; the
//! pipeline in `Classifier` owns ordering and tier transitions.

pub mod divergence;
pub mod fundamental;
pub mod market;
pub mod pattern;
pub mod weekly;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Fundamentals;
use crate::error::CoreError;
use crate::frame::IndicatorFrame;

use super::Tier;

pub use divergence::{find_bullish_divergence, BullishDivergence, Divergence};
pub use fundamental::FundamentalFilter;
pub use market::{OverheatFilter, TrendFilter, VolumeContraction};
pub use pattern::{HistogramConvergence, NegativeHistogram, SignalAboveZero, ZeroLineCrossing};
pub use weekly::WeeklyConfirmation;

/// Gate identity, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateId {
    ZeroLineCrossing,
    NegativeHistogram,
    SignalAboveZero,
    HistogramConvergence,
    WeeklyConfirmation,
    VolumeContraction,
    TrendFilter,
    OverheatFilter,
    BullishDivergence,
    Fundamentals,
}

impl GateId {
    /// 1-based position in the pipeline.
    pub fn number(self) -> u8 {
        match self {
            Self::ZeroLineCrossing => 1,
            Self::NegativeHistogram => 2,
            Self::SignalAboveZero => 3,
            Self::HistogramConvergence => 4,
            Self::WeeklyConfirmation => 5,
            Self::VolumeContraction => 6,
            Self::TrendFilter => 7,
            Self::OverheatFilter => 8,
            Self::BullishDivergence => 9,
            Self::Fundamentals => 10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZeroLineCrossing => "zero_line_crossing",
            Self::NegativeHistogram => "negative_histogram",
            Self::SignalAboveZero => "signal_above_zero",
            Self::HistogramConvergence => "histogram_convergence",
            Self::WeeklyConfirmation => "weekly_confirmation",
            Self::VolumeContraction => "volume_contraction",
            Self::TrendFilter => "trend_filter",
            Self::OverheatFilter => "overheat_filter",
            Self::BullishDivergence => "bullish_divergence",
            Self::Fundamentals => "fundamentals",
        }
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    /// Passed under the given tier's bounds.
    Passed(Tier),
    Failed,
    /// Not evaluated because its inputs are absent and policy allows it.
    Skipped,
}

impl GateStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Record of one gate evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateOutcome {
    pub gate: GateId,
    pub status: GateStatus,
    /// Human-readable explanation of the decision.
    pub detail: String,
    /// Snapshot of the values the gate compared (finite values only).
    pub state: BTreeMap<String, f64>,
}

impl GateOutcome {
    pub fn passed(gate: GateId, tier: Tier, detail: impl Into<String>) -> Self {
        Self::with_status(gate, GateStatus::Passed(tier), detail)
    }

    pub fn failed(gate: GateId, detail: impl Into<String>) -> Self {
        Self::with_status(gate, GateStatus::Failed, detail)
    }

    pub fn skipped(gate: GateId, detail: impl Into<String>) -> Self {
        Self::with_status(gate, GateStatus::Skipped, detail)
    }

    fn with_status(gate: GateId, status: GateStatus, detail: impl Into<String>) -> Self {
        Self {
            gate,
            status,
            detail: detail.into(),
            state: BTreeMap::new(),
        }
    }

    /// Record a value in the state snapshot. Undefined values are left out.
    pub fn with(mut self, key: &str, value: Option<f64>) -> Self {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.state.insert(key.to_string(), v);
        }
        self
    }

    /// Pass or fail on `ok`, with the matching detail.
    pub fn decide(gate: GateId, tier: Tier, ok: bool, pass: &str, fail: &str) -> Self {
        if ok {
            Self::passed(gate, tier, pass)
        } else {
            Self::failed(gate, fail)
        }
    }
}

/// Weekly input as seen by gate 5.
#[derive(Debug, Clone)]
pub enum WeeklyInput<'a> {
    /// A weekly frame supplied by the caller.
    Frame(&'a IndicatorFrame),
    /// The caller's weekly series could not be turned into a frame.
    Unavailable(CoreError),
    /// Nothing supplied: resample the daily bars.
    Derive,
}

/// Everything a gate may read.
#[derive(Debug, Clone)]
pub struct GateContext<'a> {
    pub frame: &'a IndicatorFrame,
    pub weekly: WeeklyInput<'a>,
    pub fundamentals: Option<&'a Fundamentals>,
}

impl<'a> GateContext<'a> {
    pub fn new(frame: &'a IndicatorFrame) -> Self {
        Self {
            frame,
            weekly: WeeklyInput::Derive,
            fundamentals: None,
        }
    }
}

/// Trait for classifier gates.
///
/// # Invariant
/// A gate reads only the context it is handed. Evaluating the same gate twice
/// on the same context and tier gives the same outcome.
pub trait Gate: Send + Sync {
    fn id(&self) -> GateId;

    /// Tiered gates are retried under Relaxed bounds when Strict fails.
    fn tiered(&self) -> bool {
        false
    }

    fn evaluate(&self, ctx: &GateContext<'_>, tier: Tier) -> GateOutcome;
}
