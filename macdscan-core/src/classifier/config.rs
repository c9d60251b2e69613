//! Classifier policy: tier bounds, optional gate selection, thresholds and
//! score weights. Everything here is plain data so a scan config can carry it
//! in TOML.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::frame::IndicatorParams;

/// Bounds for the two tiered gates under one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBounds {
    /// Lowest MACD/Signal value allowed in the recent negative-histogram bars.
    pub macd_floor: f64,
    /// Lowest allowed final histogram value (`floor <= h3 < 0`).
    pub hist_floor: f64,
}

impl TierBounds {
    pub fn strict() -> Self {
        Self {
            macd_floor: 0.0,
            hist_floor: -1.0,
        }
    }

    pub fn relaxed() -> Self {
        Self {
            macd_floor: -1.0,
            hist_floor: -3.0,
        }
    }
}

/// How the three-bar histogram convergence check reads h1, h2, h3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceRule {
    /// All negative, |h1| > |h2| > |h3|, and `hist_floor <= h3 < 0`.
    #[default]
    Magnitude,
    /// `h1 < h2 < h3` and `h3 < signed_rise_ceiling`, regardless of tier.
    SignedRise,
}

/// What gate 10 does when fundamentals are absent or incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFundamentalsPolicy {
    #[default]
    Reject,
    Skip,
}

/// Which optional gates (5–10) run for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionalGates {
    pub weekly: bool,
    pub volume: bool,
    pub trend: bool,
    pub overheat: bool,
    pub divergence: bool,
    pub fundamentals: bool,
}

impl OptionalGates {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            weekly: true,
            volume: true,
            trend: true,
            overheat: true,
            divergence: true,
            fundamentals: true,
        }
    }
}

/// Numeric thresholds for the optional gates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterThresholds {
    pub max_rsi: f64,
    pub max_pe: f64,
    pub min_revenue_growth: f64,
    pub divergence_lookback: usize,
    pub divergence_window: usize,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            max_rsi: 70.0,
            max_pe: 30.0,
            min_revenue_growth: 0.0,
            divergence_lookback: 40,
            divergence_window: 10,
        }
    }
}

/// ATR multiples for stop-loss and take-profit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskMultipliers {
    pub stop_atr: f64,
    pub target_atr: f64,
}

impl Default for RiskMultipliers {
    fn default() -> Self {
        Self {
            stop_atr: 2.0,
            target_atr: 3.0,
        }
    }
}

/// Composite score weights. Normalised by their sum, so 40/30/15/15 and
/// 0.4/0.3/0.15/0.15 are equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub pattern: f64,
    pub momentum: f64,
    pub fundamental: f64,
    pub relative_strength: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            pattern: 40.0,
            momentum: 30.0,
            fundamental: 15.0,
            relative_strength: 15.0,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.pattern + self.momentum + self.fundamental + self.relative_strength
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let all = [
            self.pattern,
            self.momentum,
            self.fundamental,
            self.relative_strength,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(CoreError::InvalidInput(
                "score weights must be finite and non-negative".into(),
            ));
        }
        if self.total() <= 0.0 {
            return Err(CoreError::InvalidInput(
                "score weights must sum to a positive value".into(),
            ));
        }
        Ok(())
    }
}

/// Full classifier policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub strict: TierBounds,
    pub relaxed: TierBounds,
    /// How many of the most recent negative-histogram bars gate 3 inspects.
    pub negative_window: usize,
    pub convergence: ConvergenceRule,
    pub signed_rise_ceiling: f64,
    /// Optional gates applied to Strict-tier candidates.
    pub main_gates: OptionalGates,
    /// Optional gates applied to Relaxed-tier candidates.
    pub watchlist_gates: OptionalGates,
    pub thresholds: FilterThresholds,
    pub missing_fundamentals: MissingFundamentalsPolicy,
    pub risk: RiskMultipliers,
    /// `None` disables the composite score.
    pub scoring: Option<ScoreWeights>,
    /// Spans for a weekly frame derived from daily bars.
    pub weekly_params: IndicatorParams,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strict: TierBounds::strict(),
            relaxed: TierBounds::relaxed(),
            negative_window: 5,
            convergence: ConvergenceRule::Magnitude,
            signed_rise_ceiling: -1.0,
            main_gates: OptionalGates::none(),
            watchlist_gates: OptionalGates::none(),
            thresholds: FilterThresholds::default(),
            missing_fundamentals: MissingFundamentalsPolicy::Reject,
            risk: RiskMultipliers::default(),
            scoring: Some(ScoreWeights::default()),
            weekly_params: IndicatorParams::weekly(),
        }
    }
}

impl ClassifierConfig {
    /// The later scripts' profile: every optional gate on for Main.
    pub fn full_filters() -> Self {
        Self {
            main_gates: OptionalGates::all(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.negative_window == 0 {
            return Err(CoreError::InvalidInput("negative_window must be >= 1".into()));
        }
        for (name, b) in [("strict", self.strict), ("relaxed", self.relaxed)] {
            if !b.macd_floor.is_finite() || !b.hist_floor.is_finite() || b.hist_floor >= 0.0 {
                return Err(CoreError::InvalidInput(format!(
                    "{name} bounds must be finite with a negative hist_floor"
                )));
            }
        }
        if self.relaxed.hist_floor > self.strict.hist_floor
            || self.relaxed.macd_floor > self.strict.macd_floor
        {
            return Err(CoreError::InvalidInput(
                "relaxed bounds must be at least as loose as strict bounds".into(),
            ));
        }
        let t = &self.thresholds;
        if t.divergence_window == 0 || t.divergence_lookback < 2 * t.divergence_window {
            return Err(CoreError::InvalidInput(
                "divergence_lookback must hold two non-empty windows".into(),
            ));
        }
        if !(t.max_pe > 0.0 && t.max_rsi.is_finite() && t.min_revenue_growth.is_finite()) {
            return Err(CoreError::InvalidInput(
                "max_pe must be positive and thresholds finite".into(),
            ));
        }
        if !(self.risk.stop_atr > 0.0 && self.risk.target_atr > 0.0) {
            return Err(CoreError::InvalidInput("ATR multipliers must be positive".into()));
        }
        if let Some(weights) = &self.scoring {
            weights.validate()?;
        }
        self.weekly_params.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ClassifierConfig::default().validate().is_ok());
        assert!(ClassifierConfig::full_filters().validate().is_ok());
    }

    #[test]
    fn relaxed_tighter_than_strict_is_rejected() {
        let config = ClassifierConfig {
            relaxed: TierBounds {
                macd_floor: 0.5,
                hist_floor: -3.0,
            },
            ..ClassifierConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn divergence_windows_must_fit() {
        let mut config = ClassifierConfig::default();
        config.thresholds.divergence_lookback = 15;
        assert!(config.validate().is_err());
    }

    #[test]
    fn weights_must_be_positive() {
        let zero = ScoreWeights {
            pattern: 0.0,
            momentum: 0.0,
            fundamental: 0.0,
            relative_strength: 0.0,
        };
        assert!(zero.validate().is_err());
        let negative = ScoreWeights {
            pattern: -1.0,
            ..ScoreWeights::default()
        };
        assert!(negative.validate().is_err());
        assert_eq!(ScoreWeights::default().total(), 100.0);
    }

    #[test]
    fn config_deserializes_from_partial_json() {
        let config: ClassifierConfig = serde_json::from_str(
            r#"{"missing_fundamentals":"skip","main_gates":{"trend":true}}"#,
        )
        .unwrap();
        assert_eq!(config.missing_fundamentals, MissingFundamentalsPolicy::Skip);
        assert!(config.main_gates.trend);
        assert!(!config.main_gates.weekly);
        assert_eq!(config.negative_window, 5);
    }
}
