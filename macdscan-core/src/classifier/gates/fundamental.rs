//! Gate 10: valuation and growth.

use crate::classifier::config::MissingFundamentalsPolicy;
use crate::classifier::Tier;

use super::{Gate, GateContext, GateId, GateOutcome};

/// Trailing P/E in `(0, max_pe]` and revenue growth at or above `min_growth`.
#[derive(Debug, Clone)]
pub struct FundamentalFilter {
    pub max_pe: f64,
    pub min_growth: f64,
    pub missing: MissingFundamentalsPolicy,
}

impl FundamentalFilter {
    pub fn new(max_pe: f64, min_growth: f64, missing: MissingFundamentalsPolicy) -> Self {
        Self {
            max_pe,
            min_growth,
            missing,
        }
    }
}

impl Default for FundamentalFilter {
    fn default() -> Self {
        Self::new(30.0, 0.0, MissingFundamentalsPolicy::Reject)
    }
}

impl Gate for FundamentalFilter {
    fn id(&self) -> GateId {
        GateId::Fundamentals
    }

    fn evaluate(&self, ctx: &GateContext<'_>, tier: Tier) -> GateOutcome {
        let complete = ctx
            .fundamentals
            .filter(|f| f.is_complete())
            .and_then(|f| Some((f.trailing_pe?, f.revenue_growth?)));

        let Some((pe, growth)) = complete else {
            return match self.missing {
                MissingFundamentalsPolicy::Reject => {
                    GateOutcome::failed(self.id(), "missing fundamentals")
                }
                MissingFundamentalsPolicy::Skip => {
                    GateOutcome::skipped(self.id(), "missing fundamentals")
                }
            };
        };

        let outcome = if pe <= 0.0 || pe > self.max_pe {
            GateOutcome::failed(self.id(), format!("P/E {pe} outside (0, {}]", self.max_pe))
        } else if growth < self.min_growth {
            GateOutcome::failed(
                self.id(),
                format!("revenue growth {growth} below {}", self.min_growth),
            )
        } else {
            GateOutcome::passed(self.id(), tier, "valuation and growth acceptable")
        };
        outcome
            .with("trailing_pe", Some(pe))
            .with("revenue_growth", Some(growth))
    }
}
