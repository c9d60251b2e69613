//! Last-bar market condition gates: volume, trend and overheat.

use crate::classifier::Tier;

use super::{Gate, GateContext, GateId, GateOutcome};

/// Gate 6: short volume average below the long one (selling pressure drying up).
#[derive(Debug, Clone, Default)]
pub struct VolumeContraction;

impl Gate for VolumeContraction {
    fn id(&self) -> GateId {
        GateId::VolumeContraction
    }

    fn evaluate(&self, ctx: &GateContext<'_>, tier: Tier) -> GateOutcome {
        let last = ctx.frame.last_index();
        let fast = ctx.frame.vol_ma_fast_at(last);
        let slow = ctx.frame.vol_ma_slow_at(last);
        let outcome = match (fast, slow) {
            (Some(f), Some(s)) => GateOutcome::decide(
                self.id(),
                tier,
                f < s,
                "volume contracting",
                "volume not contracting",
            ),
            _ => GateOutcome::failed(self.id(), "volume averages undefined"),
        };
        outcome.with("vol_ma_fast", fast).with("vol_ma_slow", slow)
    }
}

/// Gate 7: last close at or above the long moving average.
#[derive(Debug, Clone, Default)]
pub struct TrendFilter;

impl Gate for TrendFilter {
    fn id(&self) -> GateId {
        GateId::TrendFilter
    }

    fn evaluate(&self, ctx: &GateContext<'_>, tier: Tier) -> GateOutcome {
        let last = ctx.frame.last_index();
        let close = ctx.frame.close(last);
        let ma = ctx.frame.trend_ma_at(last);
        let outcome = match (close, ma) {
            (Some(c), Some(m)) => GateOutcome::decide(
                self.id(),
                tier,
                c >= m,
                "close above trend average",
                "close below trend average",
            ),
            _ => GateOutcome::failed(self.id(), "trend average undefined"),
        };
        outcome.with("close", close).with("trend_ma", ma)
    }
}

/// Gate 8: last RSI at or below `max_rsi`.
#[derive(Debug, Clone)]
pub struct OverheatFilter {
    pub max_rsi: f64,
}

impl OverheatFilter {
    pub fn new(max_rsi: f64) -> Self {
        Self { max_rsi }
    }
}

impl Default for OverheatFilter {
    fn default() -> Self {
        Self::new(70.0)
    }
}

impl Gate for OverheatFilter {
    fn id(&self) -> GateId {
        GateId::OverheatFilter
    }

    fn evaluate(&self, ctx: &GateContext<'_>, tier: Tier) -> GateOutcome {
        let rsi = ctx.frame.rsi_at(ctx.frame.last_index());
        let outcome = match rsi {
            Some(r) => GateOutcome::decide(
                self.id(),
                tier,
                r <= self.max_rsi,
                "RSI not overheated",
                "RSI overheated",
            ),
            None => GateOutcome::failed(self.id(), "RSI undefined"),
        };
        outcome.with("rsi", rsi).with("max_rsi", Some(self.max_rsi))
    }
}
