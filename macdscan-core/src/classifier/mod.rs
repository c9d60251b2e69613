//! Classifier: ordered gate pipeline over an indicator frame.
//!
//! The four mandatory gates run first. Gates 3 and 4 are tiered: a Strict
//! failure is retried under Relaxed bounds and, if that passes, the candidate
//! drops to the Relaxed tier for the rest of the run. The optional gates
//! enabled for the current tier run next, in pipeline order. The first
//! failure rejects; otherwise the final tier decides Main vs Watchlist.

pub mod config;
pub mod gates;
pub mod score;
pub mod verdict;

use crate::domain::{Bar, Fundamentals};
use crate::error::CoreError;
use crate::frame::{IndicatorFrame, IndicatorParams};

pub use config::{
    ClassifierConfig, ConvergenceRule, FilterThresholds, MissingFundamentalsPolicy,
    OptionalGates, RiskMultipliers, ScoreWeights, TierBounds,
};
pub use gates::{Gate, GateContext, GateId, GateOutcome, GateStatus, WeeklyInput};
pub use score::{compute_score, MarketContext, ScoreBreakdown};
pub use verdict::{Classification, RiskLevels, Tier, Verdict, VerdictReason};

use gates::{
    BullishDivergence, FundamentalFilter, HistogramConvergence, NegativeHistogram,
    OverheatFilter, SignalAboveZero, TrendFilter, VolumeContraction, WeeklyConfirmation,
    ZeroLineCrossing,
};

/// A configured gate pipeline.
pub struct Classifier {
    config: ClassifierConfig,
    market: MarketContext,
    mandatory: Vec<Box<dyn Gate>>,
    main_optional: Vec<Box<dyn Gate>>,
    watchlist_optional: Vec<Box<dyn Gate>>,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("config", &self.config)
            .field("market", &self.market)
            .finish_non_exhaustive()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::build(ClassifierConfig::default(), MarketContext::default())
    }
}

impl Classifier {
    /// Build a classifier after validating `config`.
    pub fn new(config: ClassifierConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self::build(config, MarketContext::default()))
    }

    pub fn with_market(mut self, market: MarketContext) -> Self {
        self.market = market;
        self
    }

    fn build(config: ClassifierConfig, market: MarketContext) -> Self {
        let mut convergence =
            HistogramConvergence::new(config.convergence, config.strict, config.relaxed);
        convergence.signed_rise_ceiling = config.signed_rise_ceiling;

        let mandatory: Vec<Box<dyn Gate>> = vec![
            Box::new(ZeroLineCrossing),
            Box::new(NegativeHistogram),
            Box::new(SignalAboveZero::new(
                config.negative_window,
                config.strict,
                config.relaxed,
            )),
            Box::new(convergence),
        ];
        let main_optional = optional_gates(&config, &config.main_gates);
        let watchlist_optional = optional_gates(&config, &config.watchlist_gates);

        Self {
            config,
            market,
            mandatory,
            main_optional,
            watchlist_optional,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn market(&self) -> &MarketContext {
        &self.market
    }

    /// Classify the last bar of `frame`.
    ///
    /// With no `weekly` frame, gate 5 (when enabled) resamples the daily bars.
    pub fn classify(
        &self,
        frame: &IndicatorFrame,
        weekly: Option<&IndicatorFrame>,
        fundamentals: Option<&Fundamentals>,
    ) -> Verdict {
        let weekly = match weekly {
            Some(w) => WeeklyInput::Frame(w),
            None => WeeklyInput::Derive,
        };
        self.run(&GateContext {
            frame,
            weekly,
            fundamentals,
        })
    }

    fn run(&self, ctx: &GateContext<'_>) -> Verdict {
        let mut tier = Tier::Strict;
        let mut trace = Vec::new();

        for gate in &self.mandatory {
            let mut outcome = gate.evaluate(ctx, tier);
            if outcome.status.is_failed() && gate.tiered() && tier == Tier::Strict {
                let relaxed = gate.evaluate(ctx, Tier::Relaxed);
                if !relaxed.status.is_failed() {
                    tier = Tier::Relaxed;
                    outcome = relaxed;
                }
            }
            if let Some(verdict) = record(ctx.frame, &mut trace, outcome) {
                return verdict;
            }
        }

        let optional = match tier {
            Tier::Strict => &self.main_optional,
            Tier::Relaxed => &self.watchlist_optional,
        };
        for gate in optional {
            if let Some(verdict) = record(ctx.frame, &mut trace, gate.evaluate(ctx, tier)) {
                return verdict;
            }
        }

        let mut verdict = Verdict::for_frame(ctx.frame, tier.into());
        verdict.gates = trace;
        if tier == Tier::Strict {
            self.annotate_main(&mut verdict, ctx);
        }
        verdict
    }

    fn annotate_main(&self, verdict: &mut Verdict, ctx: &GateContext<'_>) {
        let frame = ctx.frame;
        let last = frame.last_index();
        if let (Some(close), Some(atr)) = (frame.close(last), frame.atr_at(last)) {
            verdict.levels = Some(RiskLevels::from_atr(
                close,
                atr,
                self.config.risk.stop_atr,
                self.config.risk.target_atr,
            ));
        }
        if let Some(weights) = &self.config.scoring {
            verdict.score = Some(compute_score(
                frame,
                ctx.fundamentals,
                weights,
                &self.config.thresholds,
                &self.market,
            ));
        }
    }
}

/// Push `outcome` onto the trace; a failure ends the run with a Reject.
fn record(
    frame: &IndicatorFrame,
    trace: &mut Vec<GateOutcome>,
    outcome: GateOutcome,
) -> Option<Verdict> {
    let failed = outcome.status.is_failed();
    let reason = VerdictReason::GateFailed {
        gate: outcome.gate,
        detail: outcome.detail.clone(),
    };
    trace.push(outcome);
    if !failed {
        return None;
    }
    let mut verdict = Verdict::for_frame(frame, Classification::Reject);
    verdict.reason = reason;
    verdict.gates = std::mem::take(trace);
    Some(verdict)
}

fn optional_gates(config: &ClassifierConfig, enabled: &OptionalGates) -> Vec<Box<dyn Gate>> {
    let t = &config.thresholds;
    let mut gates: Vec<Box<dyn Gate>> = Vec::new();
    if enabled.weekly {
        gates.push(Box::new(WeeklyConfirmation::new(config.weekly_params)));
    }
    if enabled.volume {
        gates.push(Box::new(VolumeContraction));
    }
    if enabled.trend {
        gates.push(Box::new(TrendFilter));
    }
    if enabled.overheat {
        gates.push(Box::new(OverheatFilter::new(t.max_rsi)));
    }
    if enabled.divergence {
        gates.push(Box::new(BullishDivergence::new(
            t.divergence_lookback,
            t.divergence_window,
        )));
    }
    if enabled.fundamentals {
        gates.push(Box::new(FundamentalFilter::new(
            t.max_pe,
            t.min_revenue_growth,
            config.missing_fundamentals,
        )));
    }
    gates
}

/// Validate and compute `series`, then classify it.
///
/// Never fails: unusable input becomes a Reject verdict with an
/// `insufficient_data` or `invalid_input` reason. A weekly series that cannot
/// be computed fails gate 5 (when enabled) instead of the whole verdict.
pub fn screen(
    series: &[Bar],
    weekly: Option<&[Bar]>,
    fundamentals: Option<&Fundamentals>,
    params: &IndicatorParams,
    classifier: &Classifier,
) -> Verdict {
    let frame = match IndicatorFrame::compute(series, params) {
        Ok(frame) => frame,
        Err(err) => {
            let last = series.last();
            return Verdict::rejected(err.into(), last.map(|b| b.date), last.map(|b| b.close));
        }
    };

    let weekly_frame =
        weekly.map(|bars| IndicatorFrame::compute(bars, &classifier.config.weekly_params));
    let weekly = match &weekly_frame {
        Some(Ok(w)) => WeeklyInput::Frame(w),
        Some(Err(err)) => WeeklyInput::Unavailable(err.clone()),
        None => WeeklyInput::Derive,
    };

    classifier.run(&GateContext {
        frame: &frame,
        weekly,
        fundamentals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    /// Frame whose last bars have the given histogram values.
    /// MACD = `level + hist`, Signal = `level`, ATR = 2, everything else undefined.
    fn hist_frame(macd_history: &[f64], level: f64, hist: &[f64]) -> IndicatorFrame {
        let mut macd: Vec<f64> = macd_history.to_vec();
        let mut signal = vec![f64::NAN; macd_history.len()];
        for h in hist {
            macd.push(level + h);
            signal.push(level);
        }
        let n = macd.len();
        IndicatorFrame::from_columns(
            make_bars(&vec![100.0; n]),
            IndicatorParams::default(),
            macd,
            signal,
            vec![f64::NAN; n],
            vec![2.0; n],
            vec![f64::NAN; n],
            vec![f64::NAN; n],
            vec![f64::NAN; n],
        )
        .unwrap()
    }

    fn gates_run(v: &Verdict) -> Vec<GateId> {
        v.gates.iter().map(|g| g.gate).collect()
    }

    #[test]
    fn strict_pattern_is_main_with_levels() {
        let frame = hist_frame(&[-1.0, 0.5], 2.0, &[0.5, -1.5, -1.0, -0.5]);
        let verdict = Classifier::default().classify(&frame, None, None);
        assert_eq!(verdict.classification, Classification::Main);
        assert_eq!(verdict.reason, VerdictReason::Qualified);
        let levels = verdict.levels.unwrap();
        assert_eq!(levels.stop_loss, 96.0);
        assert_eq!(levels.take_profit, 106.0);
        assert!(verdict.score.is_some());
        assert_eq!(
            gates_run(&verdict),
            vec![
                GateId::ZeroLineCrossing,
                GateId::NegativeHistogram,
                GateId::SignalAboveZero,
                GateId::HistogramConvergence,
            ]
        );
    }

    #[test]
    fn relaxed_signal_floor_gives_watchlist() {
        // MACD dips below zero while the histogram is negative
        let frame = hist_frame(&[1.0], 0.0, &[-0.9, -0.7, -0.5]);
        let verdict = Classifier::default().classify(&frame, None, None);
        assert_eq!(verdict.classification, Classification::Watchlist);
        assert_eq!(verdict.gates[2].status, GateStatus::Passed(Tier::Relaxed));
        assert_eq!(verdict.gates[3].status, GateStatus::Passed(Tier::Relaxed));
        assert!(verdict.levels.is_none());
        assert!(verdict.score.is_none());
    }

    #[test]
    fn deep_histogram_downgrades_at_gate_four() {
        let frame = hist_frame(&[-1.0], 5.0, &[-4.0, -3.0, -2.0]);
        let verdict = Classifier::default().classify(&frame, None, None);
        assert_eq!(verdict.classification, Classification::Watchlist);
        assert_eq!(verdict.gates[2].status, GateStatus::Passed(Tier::Strict));
        assert_eq!(verdict.gates[3].status, GateStatus::Passed(Tier::Relaxed));
    }

    #[test]
    fn first_failure_short_circuits() {
        // MACD never negative
        let frame = hist_frame(&[1.0], 2.0, &[-1.5, -1.0, -0.5]);
        let verdict = Classifier::default().classify(&frame, None, None);
        assert_eq!(verdict.classification, Classification::Reject);
        assert_eq!(verdict.failed_gate(), Some(GateId::ZeroLineCrossing));
        assert_eq!(verdict.gates.len(), 1);
        assert_eq!(verdict.reason.code(), "gate_failed:zero_line_crossing");
    }

    #[test]
    fn optional_gates_only_for_enabled_tier() {
        let config = ClassifierConfig {
            main_gates: OptionalGates {
                fundamentals: true,
                ..OptionalGates::none()
            },
            ..ClassifierConfig::default()
        };
        let classifier = Classifier::new(config).unwrap();

        let strict = hist_frame(&[-1.0, 0.5], 2.0, &[0.5, -1.5, -1.0, -0.5]);
        let verdict = classifier.classify(&strict, None, None);
        assert_eq!(verdict.classification, Classification::Reject);
        assert_eq!(verdict.failed_gate(), Some(GateId::Fundamentals));

        // Watchlist candidates skip the Main-only fundamentals gate
        let relaxed = hist_frame(&[1.0], 0.0, &[-0.9, -0.7, -0.5]);
        let verdict = classifier.classify(&relaxed, None, None);
        assert_eq!(verdict.classification, Classification::Watchlist);
        assert_eq!(verdict.gates.len(), 4);
    }

    #[test]
    fn skip_policy_keeps_main() {
        let config = ClassifierConfig {
            main_gates: OptionalGates {
                fundamentals: true,
                ..OptionalGates::none()
            },
            missing_fundamentals: MissingFundamentalsPolicy::Skip,
            ..ClassifierConfig::default()
        };
        let classifier = Classifier::new(config).unwrap();
        let frame = hist_frame(&[-1.0, 0.5], 2.0, &[0.5, -1.5, -1.0, -0.5]);
        let verdict = classifier.classify(&frame, None, None);
        assert_eq!(verdict.classification, Classification::Main);
        assert_eq!(verdict.gates.last().unwrap().status, GateStatus::Skipped);
    }

    #[test]
    fn undefined_atr_gives_main_without_levels() {
        let mut frame = hist_frame(&[-1.0, 0.5], 2.0, &[0.5, -1.5, -1.0, -0.5]);
        let last = frame.last_index();
        frame.atr[last] = f64::NAN;
        let verdict = Classifier::default().classify(&frame, None, None);
        assert_eq!(verdict.classification, Classification::Main);
        assert!(verdict.levels.is_none());
    }

    #[test]
    fn scoring_can_be_disabled() {
        let config = ClassifierConfig {
            scoring: None,
            ..ClassifierConfig::default()
        };
        let classifier = Classifier::new(config).unwrap();
        let frame = hist_frame(&[-1.0, 0.5], 2.0, &[0.5, -1.5, -1.0, -0.5]);
        assert!(classifier.classify(&frame, None, None).score.is_none());
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = ClassifierConfig {
            negative_window: 0,
            ..ClassifierConfig::default()
        };
        assert!(Classifier::new(config).is_err());
    }

    #[test]
    fn screen_rejects_short_series() {
        let bars = make_bars(&[100.0; 20]);
        let verdict = screen(
            &bars,
            None,
            None,
            &IndicatorParams::default(),
            &Classifier::default(),
        );
        assert_eq!(verdict.classification, Classification::Reject);
        assert_eq!(
            verdict.reason,
            VerdictReason::InsufficientData {
                required: 60,
                actual: 20
            }
        );
        assert_eq!(verdict.close, Some(100.0));
    }

    #[test]
    fn screen_rejects_invalid_series() {
        let mut bars = make_bars(&[100.0; 80]);
        bars[10].close = f64::NAN;
        let verdict = screen(
            &bars,
            None,
            None,
            &IndicatorParams::default(),
            &Classifier::default(),
        );
        assert_eq!(verdict.reason.code(), "invalid_input");
    }

    #[test]
    fn screen_constant_series_rejects() {
        let bars = make_bars(&[42.0; 120]);
        let verdict = screen(
            &bars,
            None,
            None,
            &IndicatorParams::default(),
            &Classifier::default(),
        );
        assert_eq!(verdict.classification, Classification::Reject);
    }
}
