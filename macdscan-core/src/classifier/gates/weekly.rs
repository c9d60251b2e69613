//! Gate 5: weekly MACD confirmation.

use crate::classifier::Tier;
use crate::frame::{IndicatorFrame, IndicatorParams};
use crate::resample::resample_weekly;

use super::{Gate, GateContext, GateId, GateOutcome, WeeklyInput};

/// Latest weekly MACD and Signal both above zero.
///
/// Uses the caller's weekly frame when there is one; otherwise the daily bars
/// are resampled to weeks and computed with `params`.
#[derive(Debug, Clone)]
pub struct WeeklyConfirmation {
    pub params: IndicatorParams,
}

impl WeeklyConfirmation {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params }
    }

    fn judge(&self, weekly: &IndicatorFrame, tier: Tier) -> GateOutcome {
        let last = weekly.last_index();
        let (macd, signal) = (weekly.macd_at(last), weekly.signal_at(last));
        let outcome = match (macd, signal) {
            (Some(m), Some(s)) => GateOutcome::decide(
                self.id(),
                tier,
                m > 0.0 && s > 0.0,
                "weekly MACD and Signal above zero",
                "weekly MACD or Signal not above zero",
            ),
            _ => GateOutcome::failed(self.id(), "weekly MACD undefined"),
        };
        outcome
            .with("weekly_macd", macd)
            .with("weekly_signal", signal)
            .with("weekly_bars", Some(weekly.len() as f64))
    }
}

impl Default for WeeklyConfirmation {
    fn default() -> Self {
        Self::new(IndicatorParams::weekly())
    }
}

impl Gate for WeeklyConfirmation {
    fn id(&self) -> GateId {
        GateId::WeeklyConfirmation
    }

    fn evaluate(&self, ctx: &GateContext<'_>, tier: Tier) -> GateOutcome {
        match &ctx.weekly {
            WeeklyInput::Frame(frame) => self.judge(frame, tier),
            WeeklyInput::Unavailable(err) => {
                GateOutcome::failed(self.id(), format!("weekly frame unavailable: {err}"))
            }
            WeeklyInput::Derive => {
                let bars = resample_weekly(ctx.frame.bars());
                match IndicatorFrame::compute(&bars, &self.params) {
                    Ok(frame) => self.judge(&frame, tier),
                    Err(err) => {
                        GateOutcome::failed(self.id(), format!("weekly frame unavailable: {err}"))
                    }
                }
            }
        }
    }
}
