//! Risk/reward annotation for Main verdicts.
//!
//! RR = (take_profit − price) / (price − stop_loss), rounded to 2 decimals.
//! The action is decided on the rounded ratio.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classifier::{RiskLevels, Verdict};
use crate::error::CoreError;
use crate::round2;

/// Ratio at or above which a candidate is worth entering.
pub const ENTER_RR: f64 = 2.0;
/// Ratio at or above which a candidate is worth watching.
pub const WATCH_RR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Enter,
    Watch,
    InsufficientReward,
    /// Price at or below the stop; the ratio is undefined.
    InsufficientData,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Watch => "watch",
            Self::InsufficientReward => "insufficient reward",
            Self::InsufficientData => "insufficient data",
        }
    }

    fn for_ratio(rr: f64) -> Self {
        if rr >= ENTER_RR {
            Self::Enter
        } else if rr >= WATCH_RR {
            Self::Watch
        } else {
            Self::InsufficientReward
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAnnotation {
    pub current_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward: Option<f64>,
    pub action: Action,
}

/// Annotate explicit levels at `current_price`. Never divides by a
/// non-positive risk.
pub fn annotate_levels(levels: &RiskLevels, current_price: f64) -> RiskAnnotation {
    let risk = current_price - levels.stop_loss;
    let risk_reward = if current_price.is_finite() && risk > 0.0 {
        Some(round2((levels.take_profit - current_price) / risk))
    } else {
        None
    };
    RiskAnnotation {
        current_price,
        stop_loss: levels.stop_loss,
        take_profit: levels.take_profit,
        risk_reward,
        action: risk_reward.map_or(Action::InsufficientData, Action::for_ratio),
    }
}

/// Annotate a Main verdict at `current_price`.
///
/// Fails with `NotAnnotatable` for Watchlist/Reject verdicts and for a Main
/// verdict without levels (ATR undefined).
pub fn annotate(verdict: &Verdict, current_price: f64) -> Result<RiskAnnotation, CoreError> {
    if !verdict.is_main() {
        return Err(CoreError::NotAnnotatable(format!(
            "{} verdict has no exit levels",
            verdict.classification
        )));
    }
    let levels = verdict
        .levels
        .as_ref()
        .ok_or_else(|| CoreError::NotAnnotatable("ATR undefined on the last bar".into()))?;
    Ok(annotate_levels(levels, current_price))
}
