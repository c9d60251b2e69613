//! The four mandatory MACD pattern gates.
//!
//! 1. MACD has been on both sides of zero.
//! 2. The last histogram bar is negative.
//! 3. MACD and Signal stayed above a floor during the recent negative bars (tiered).
//! 4. The histogram is converging toward zero (tiered).

use crate::classifier::config::{ConvergenceRule, TierBounds};
use crate::classifier::Tier;

use super::{Gate, GateContext, GateId, GateOutcome};

/// Gate 1: over every defined MACD value, MACD was > 0 at least once and
/// < 0 at least once.
#[derive(Debug, Clone, Default)]
pub struct ZeroLineCrossing;

impl Gate for ZeroLineCrossing {
    fn id(&self) -> GateId {
        GateId::ZeroLineCrossing
    }

    fn evaluate(&self, ctx: &GateContext<'_>, tier: Tier) -> GateOutcome {
        let frame = ctx.frame;
        let (mut max, mut min): (Option<f64>, Option<f64>) = (None, None);
        for i in frame.defined_macd_indices() {
            let v = frame.macd[i];
            max = Some(max.map_or(v, |m| m.max(v)));
            min = Some(min.map_or(v, |m| m.min(v)));
        }

        let (Some(hi), Some(lo)) = (max, min) else {
            return GateOutcome::failed(self.id(), "no defined MACD values");
        };
        GateOutcome::decide(
            self.id(),
            tier,
            hi > 0.0 && lo < 0.0,
            "MACD crossed zero",
            "MACD never crossed zero",
        )
        .with("max_macd", max)
        .with("min_macd", min)
    }
}

/// Gate 2: last histogram value defined and negative.
#[derive(Debug, Clone, Default)]
pub struct NegativeHistogram;

impl Gate for NegativeHistogram {
    fn id(&self) -> GateId {
        GateId::NegativeHistogram
    }

    fn evaluate(&self, ctx: &GateContext<'_>, tier: Tier) -> GateOutcome {
        let hist = ctx.frame.hist_at(ctx.frame.last_index());
        match hist {
            None => GateOutcome::failed(self.id(), "histogram undefined on last bar"),
            Some(h) => GateOutcome::decide(
                self.id(),
                tier,
                h < 0.0,
                "last histogram negative",
                "last histogram not negative",
            )
            .with("hist", hist),
        }
    }
}

/// Gate 3: among the most recent `window` bars with a negative histogram,
/// MACD and Signal never dropped below the tier's floor.
#[derive(Debug, Clone)]
pub struct SignalAboveZero {
    pub window: usize,
    pub strict: TierBounds,
    pub relaxed: TierBounds,
}

impl SignalAboveZero {
    pub fn new(window: usize, strict: TierBounds, relaxed: TierBounds) -> Self {
        assert!(window >= 1, "window must be >= 1");
        Self {
            window,
            strict,
            relaxed,
        }
    }

    fn floor(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Strict => self.strict.macd_floor,
            Tier::Relaxed => self.relaxed.macd_floor,
        }
    }
}

impl Default for SignalAboveZero {
    fn default() -> Self {
        Self::new(5, TierBounds::strict(), TierBounds::relaxed())
    }
}

impl Gate for SignalAboveZero {
    fn id(&self) -> GateId {
        GateId::SignalAboveZero
    }

    fn tiered(&self) -> bool {
        true
    }

    fn evaluate(&self, ctx: &GateContext<'_>, tier: Tier) -> GateOutcome {
        let frame = ctx.frame;
        let negatives: Vec<usize> = frame
            .defined_hist_indices()
            .filter(|&i| frame.hist[i] < 0.0)
            .collect();
        let recent = &negatives[negatives.len().saturating_sub(self.window)..];
        if recent.is_empty() {
            return GateOutcome::failed(self.id(), "no negative histogram bars");
        }

        let floor = self.floor(tier);
        let min_macd = recent.iter().map(|&i| frame.macd[i]).fold(f64::INFINITY, f64::min);
        let min_signal = recent
            .iter()
            .map(|&i| frame.signal[i])
            .fold(f64::INFINITY, f64::min);

        let ok = min_macd >= floor && min_signal >= floor;
        let outcome = if ok {
            GateOutcome::passed(self.id(), tier, format!("MACD and Signal held >= {floor}"))
        } else {
            GateOutcome::failed(
                self.id(),
                format!("MACD or Signal fell below {floor} in the negative-histogram bars"),
            )
        };
        outcome
            .with("floor", Some(floor))
            .with("min_macd", Some(min_macd))
            .with("min_signal", Some(min_signal))
            .with("bars", Some(recent.len() as f64))
    }
}

/// Gate 4: the last three histogram values converge toward zero.
#[derive(Debug, Clone)]
pub struct HistogramConvergence {
    pub rule: ConvergenceRule,
    pub strict: TierBounds,
    pub relaxed: TierBounds,
    /// Upper bound on h3 for `ConvergenceRule::SignedRise`.
    pub signed_rise_ceiling: f64,
}

impl HistogramConvergence {
    pub fn new(rule: ConvergenceRule, strict: TierBounds, relaxed: TierBounds) -> Self {
        Self {
            rule,
            strict,
            relaxed,
            signed_rise_ceiling: -1.0,
        }
    }

    fn floor(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Strict => self.strict.hist_floor,
            Tier::Relaxed => self.relaxed.hist_floor,
        }
    }
}

impl Default for HistogramConvergence {
    fn default() -> Self {
        Self::new(
            ConvergenceRule::Magnitude,
            TierBounds::strict(),
            TierBounds::relaxed(),
        )
    }
}

/// Last three defined histogram values, oldest first.
pub(crate) fn last_three_hist(frame: &crate::frame::IndicatorFrame) -> Option<[f64; 3]> {
    let defined: Vec<usize> = frame.defined_hist_indices().collect();
    match defined.as_slice() {
        [.., a, b, c] => Some([frame.hist[*a], frame.hist[*b], frame.hist[*c]]),
        _ => None,
    }
}

impl Gate for HistogramConvergence {
    fn id(&self) -> GateId {
        GateId::HistogramConvergence
    }

    fn tiered(&self) -> bool {
        self.rule == ConvergenceRule::Magnitude
    }

    fn evaluate(&self, ctx: &GateContext<'_>, tier: Tier) -> GateOutcome {
        let Some([h1, h2, h3]) = last_three_hist(ctx.frame) else {
            return GateOutcome::failed(self.id(), "fewer than 3 defined histogram values");
        };

        let outcome = match self.rule {
            ConvergenceRule::Magnitude => {
                let floor = self.floor(tier);
                let negative = h1 < 0.0 && h2 < 0.0 && h3 < 0.0;
                let shrinking = h1.abs() > h2.abs() && h2.abs() > h3.abs();
                let near_zero = h3 >= floor && h3 < 0.0;
                let outcome = if !negative {
                    GateOutcome::failed(self.id(), "histogram not negative on the last 3 bars")
                } else if !shrinking {
                    GateOutcome::failed(self.id(), "histogram magnitude not shrinking")
                } else if !near_zero {
                    GateOutcome::failed(self.id(), format!("final histogram below {floor}"))
                } else {
                    GateOutcome::passed(self.id(), tier, "histogram converging toward zero")
                };
                outcome.with("floor", Some(floor))
            }
            ConvergenceRule::SignedRise => {
                let ceiling = self.signed_rise_ceiling;
                GateOutcome::decide(
                    self.id(),
                    tier,
                    h1 < h2 && h2 < h3 && h3 < ceiling,
                    "histogram rising below ceiling",
                    "histogram not rising below ceiling",
                )
                .with("ceiling", Some(ceiling))
            }
        };
        outcome.with("h1", Some(h1)).with("h2", Some(h2)).with("h3", Some(h3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::gates::GateStatus;
    use crate::frame::{IndicatorFrame, IndicatorParams};
    use crate::indicators::make_bars;

    /// Frame with explicit MACD and Signal columns; other columns undefined.
    fn frame_from(macd: &[f64], signal: &[f64]) -> IndicatorFrame {
        let n = macd.len();
        let bars = make_bars(&vec![100.0; n]);
        IndicatorFrame::from_columns(
            bars,
            IndicatorParams::default(),
            macd.to_vec(),
            signal.to_vec(),
            vec![f64::NAN; n],
            vec![f64::NAN; n],
            vec![f64::NAN; n],
            vec![f64::NAN; n],
            vec![f64::NAN; n],
        )
        .unwrap()
    }

    /// Frame from histogram values, with MACD = `level + hist` and Signal = `level`.
    fn frame_from_hist(level: f64, hist: &[f64]) -> IndicatorFrame {
        let macd: Vec<f64> = hist.iter().map(|h| level + h).collect();
        frame_from(&macd, &vec![level; hist.len()])
    }

    #[test]
    fn zero_line_needs_both_sides() {
        let crossed = frame_from(&[f64::NAN, -1.0, 0.5, 2.0], &[f64::NAN; 4]);
        let ctx = GateContext::new(&crossed);
        assert!(!ZeroLineCrossing.evaluate(&ctx, Tier::Strict).status.is_failed());

        let positive = frame_from(&[f64::NAN, 1.0, 0.5, 2.0], &[f64::NAN; 4]);
        let ctx = GateContext::new(&positive);
        let outcome = ZeroLineCrossing.evaluate(&ctx, Tier::Strict);
        assert!(outcome.status.is_failed());
        assert_eq!(outcome.state["min_macd"], 0.5);
    }

    #[test]
    fn zero_line_ignores_exact_zero() {
        let frame = frame_from(&[0.0, 1.0, 2.0], &[f64::NAN; 3]);
        let ctx = GateContext::new(&frame);
        assert!(ZeroLineCrossing.evaluate(&ctx, Tier::Strict).status.is_failed());
    }

    #[test]
    fn negative_histogram_on_last_bar() {
        let frame = frame_from_hist(1.0, &[0.2, -0.1]);
        let ctx = GateContext::new(&frame);
        assert_eq!(
            NegativeHistogram.evaluate(&ctx, Tier::Strict).status,
            GateStatus::Passed(Tier::Strict)
        );

        let frame = frame_from_hist(1.0, &[-0.2, 0.0]);
        let ctx = GateContext::new(&frame);
        assert!(NegativeHistogram.evaluate(&ctx, Tier::Strict).status.is_failed());
    }

    #[test]
    fn negative_histogram_undefined_last_bar_fails() {
        let frame = frame_from(&[1.0, 2.0], &[0.5, f64::NAN]);
        let ctx = GateContext::new(&frame);
        let outcome = NegativeHistogram.evaluate(&ctx, Tier::Strict);
        assert!(outcome.status.is_failed());
        assert!(outcome.detail.contains("undefined"));
    }

    #[test]
    fn signal_above_zero_strict_and_relaxed() {
        // negative-hist bars at the end: MACD dips to -0.5 on one of them
        let macd = [2.0, 1.5, 1.0, -0.5, 0.2];
        let signal = [1.0, 1.8, 1.2, 0.3, 0.4];
        let frame = frame_from(&macd, &signal);
        let ctx = GateContext::new(&frame);
        let gate = SignalAboveZero::default();

        let strict = gate.evaluate(&ctx, Tier::Strict);
        assert!(strict.status.is_failed());
        assert_eq!(strict.state["min_macd"], -0.5);

        let relaxed = gate.evaluate(&ctx, Tier::Relaxed);
        assert_eq!(relaxed.status, GateStatus::Passed(Tier::Relaxed));
    }

    #[test]
    fn signal_above_zero_only_inspects_recent_window() {
        // an old negative bar with deep MACD falls outside the last 2 negatives
        let macd = [-5.0, 3.0, 0.5, 0.4];
        let signal = [0.0, 1.0, 1.0, 1.0];
        let frame = frame_from(&macd, &signal);
        let ctx = GateContext::new(&frame);
        let gate = SignalAboveZero::new(2, TierBounds::strict(), TierBounds::relaxed());
        let outcome = gate.evaluate(&ctx, Tier::Strict);
        assert_eq!(outcome.status, GateStatus::Passed(Tier::Strict));
        assert_eq!(outcome.state["bars"], 2.0);

        let wide = SignalAboveZero::new(5, TierBounds::strict(), TierBounds::relaxed());
        assert!(wide.evaluate(&ctx, Tier::Strict).status.is_failed());
        assert!(wide.evaluate(&ctx, Tier::Relaxed).status.is_failed());
    }

    #[test]
    fn convergence_magnitude_tiers() {
        let gate = HistogramConvergence::default();

        let tight = frame_from_hist(1.0, &[-1.5, -1.0, -0.5]);
        let ctx = GateContext::new(&tight);
        assert_eq!(
            gate.evaluate(&ctx, Tier::Strict).status,
            GateStatus::Passed(Tier::Strict)
        );

        let deep = frame_from_hist(5.0, &[-4.0, -3.0, -2.0]);
        let ctx = GateContext::new(&deep);
        assert!(gate.evaluate(&ctx, Tier::Strict).status.is_failed());
        assert_eq!(
            gate.evaluate(&ctx, Tier::Relaxed).status,
            GateStatus::Passed(Tier::Relaxed)
        );

        let too_deep = frame_from_hist(5.0, &[-6.0, -5.0, -4.0]);
        let ctx = GateContext::new(&too_deep);
        assert!(gate.evaluate(&ctx, Tier::Relaxed).status.is_failed());

        let wide_shallow = frame_from_hist(5.0, &[-3.0, -2.0, -0.5]);
        let ctx = GateContext::new(&wide_shallow);
        assert_eq!(
            gate.evaluate(&ctx, Tier::Strict).status,
            GateStatus::Passed(Tier::Strict)
        );

        let mid = frame_from_hist(5.0, &[-3.0, -2.0, -1.5]);
        let ctx = GateContext::new(&mid);
        assert!(gate.evaluate(&ctx, Tier::Strict).status.is_failed());
        assert_eq!(
            gate.evaluate(&ctx, Tier::Relaxed).status,
            GateStatus::Passed(Tier::Relaxed)
        );
    }

    #[test]
    fn convergence_floors_are_inclusive() {
        let gate = HistogramConvergence::default();

        let at_strict_floor = frame_from_hist(1.0, &[-2.0, -1.5, -1.0]);
        let ctx = GateContext::new(&at_strict_floor);
        assert_eq!(
            gate.evaluate(&ctx, Tier::Strict).status,
            GateStatus::Passed(Tier::Strict)
        );

        let at_relaxed_floor = frame_from_hist(5.0, &[-5.0, -4.0, -3.0]);
        let ctx = GateContext::new(&at_relaxed_floor);
        assert!(gate.evaluate(&ctx, Tier::Strict).status.is_failed());
        assert_eq!(
            gate.evaluate(&ctx, Tier::Relaxed).status,
            GateStatus::Passed(Tier::Relaxed)
        );
    }

    #[test]
    fn convergence_requires_shrinking_magnitude() {
        let widening = frame_from_hist(1.0, &[-0.2, -0.4, -0.6]);
        let ctx = GateContext::new(&widening);
        let outcome = HistogramConvergence::default().evaluate(&ctx, Tier::Relaxed);
        assert!(outcome.status.is_failed());
        assert!(outcome.detail.contains("shrinking"));
    }

    #[test]
    fn convergence_needs_three_values() {
        let short = frame_from_hist(1.0, &[-0.4, -0.2]);
        let ctx = GateContext::new(&short);
        assert!(HistogramConvergence::default()
            .evaluate(&ctx, Tier::Strict)
            .status
            .is_failed());
    }

    #[test]
    fn signed_rise_is_tier_agnostic() {
        let gate = HistogramConvergence::new(
            ConvergenceRule::SignedRise,
            TierBounds::strict(),
            TierBounds::relaxed(),
        );
        assert!(!gate.tiered());

        let rising = frame_from_hist(5.0, &[-4.0, -3.0, -2.0]);
        let ctx = GateContext::new(&rising);
        assert_eq!(
            gate.evaluate(&ctx, Tier::Strict).status,
            GateStatus::Passed(Tier::Strict)
        );

        // h3 = -0.5 is above the -1 ceiling
        let shallow = frame_from_hist(1.0, &[-1.5, -1.0, -0.5]);
        let ctx = GateContext::new(&shallow);
        assert!(gate.evaluate(&ctx, Tier::Strict).status.is_failed());
    }
}
