//! Gate 9: bullish MACD divergence.
//!
//! Over the trailing `lookback` bars, compare the lowest close of the first
//! `window` bars with the lowest close of the last `window` bars. Price making
//! a lower low while MACD makes a higher low is a bullish divergence.

use serde::{Deserialize, Serialize};

use crate::classifier::Tier;
use crate::frame::IndicatorFrame;

use super::{Gate, GateContext, GateId, GateOutcome};

/// The two lows compared by the divergence check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    pub earlier_index: usize,
    pub later_index: usize,
    pub earlier_close: f64,
    pub later_close: f64,
    pub earlier_macd: f64,
    pub later_macd: f64,
}

impl Divergence {
    pub fn is_bullish(&self) -> bool {
        self.later_close < self.earlier_close && self.later_macd > self.earlier_macd
    }
}

/// Index of the lowest close in `start..end`, first occurrence on ties.
fn lowest_close(frame: &IndicatorFrame, start: usize, end: usize) -> Option<usize> {
    let bars = frame.bars();
    (start..end).reduce(|best, i| {
        if bars[i].close < bars[best].close {
            i
        } else {
            best
        }
    })
}

/// Locate both lows. Fails with a reason when the frame is too short or MACD
/// is undefined at either low.
pub fn measure_divergence(
    frame: &IndicatorFrame,
    lookback: usize,
    window: usize,
) -> Result<Divergence, String> {
    let n = frame.len();
    if window == 0 || lookback < 2 * window {
        return Err(format!("invalid divergence windows {lookback}/{window}"));
    }
    if n < lookback {
        return Err(format!("need {lookback} bars for divergence, have {n}"));
    }
    let start = n - lookback;
    let earlier = lowest_close(frame, start, start + window).ok_or("empty earlier window")?;
    let later = lowest_close(frame, n - window, n).ok_or("empty later window")?;

    let (Some(earlier_macd), Some(later_macd)) = (frame.macd_at(earlier), frame.macd_at(later))
    else {
        return Err("MACD undefined at a divergence low".to_string());
    };

    Ok(Divergence {
        earlier_index: earlier,
        later_index: later,
        earlier_close: frame.bars()[earlier].close,
        later_close: frame.bars()[later].close,
        earlier_macd,
        later_macd,
    })
}

/// The divergence, if one is present.
pub fn find_bullish_divergence(
    frame: &IndicatorFrame,
    lookback: usize,
    window: usize,
) -> Option<Divergence> {
    measure_divergence(frame, lookback, window)
        .ok()
        .filter(Divergence::is_bullish)
}

#[derive(Debug, Clone)]
pub struct BullishDivergence {
    pub lookback: usize,
    pub window: usize,
}

impl BullishDivergence {
    pub fn new(lookback: usize, window: usize) -> Self {
        assert!(window >= 1, "window must be >= 1");
        assert!(lookback >= 2 * window, "lookback must hold both windows");
        Self { lookback, window }
    }
}

impl Default for BullishDivergence {
    fn default() -> Self {
        Self::new(40, 10)
    }
}

impl Gate for BullishDivergence {
    fn id(&self) -> GateId {
        GateId::BullishDivergence
    }

    fn evaluate(&self, ctx: &GateContext<'_>, tier: Tier) -> GateOutcome {
        match measure_divergence(ctx.frame, self.lookback, self.window) {
            Err(reason) => GateOutcome::failed(self.id(), reason),
            Ok(d) => GateOutcome::decide(
                self.id(),
                tier,
                d.is_bullish(),
                "price lower low with MACD higher low",
                "no bullish divergence",
            )
            .with("earlier_close", Some(d.earlier_close))
            .with("later_close", Some(d.later_close))
            .with("earlier_macd", Some(d.earlier_macd))
            .with("later_macd", Some(d.later_macd)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::gates::GateStatus;
    use crate::frame::IndicatorParams;
    use crate::indicators::make_bars;

    fn frame(closes: &[f64], macd: &[f64]) -> IndicatorFrame {
        let n = closes.len();
        IndicatorFrame::from_columns(
            make_bars(closes),
            IndicatorParams::default(),
            macd.to_vec(),
            vec![f64::NAN; n],
            vec![f64::NAN; n],
            vec![f64::NAN; n],
            vec![f64::NAN; n],
            vec![f64::NAN; n],
            vec![f64::NAN; n],
        )
        .unwrap()
    }

    /// 8 bars: earlier window = 0..2, later window = 6..8.
    fn shaped(later_low: f64, later_macd: f64) -> IndicatorFrame {
        let closes = [20.0, 18.0, 25.0, 26.0, 27.0, 24.0, later_low, 22.0];
        let macd = [-1.0, -2.0, 0.0, 0.5, 0.3, 0.0, later_macd, -0.5];
        frame(&closes, &macd)
    }

    #[test]
    fn detects_lower_low_with_higher_macd() {
        let f = shaped(17.0, -1.0);
        let d = find_bullish_divergence(&f, 8, 2).unwrap();
        assert_eq!(d.earlier_index, 1);
        assert_eq!(d.later_index, 6);

        let ctx = GateContext::new(&f);
        let outcome = BullishDivergence::new(8, 2).evaluate(&ctx, Tier::Strict);
        assert_eq!(outcome.status, GateStatus::Passed(Tier::Strict));
        assert_eq!(outcome.state["later_close"], 17.0);
    }

    #[test]
    fn no_divergence_when_macd_also_lower() {
        let f = shaped(17.0, -3.0);
        assert!(find_bullish_divergence(&f, 8, 2).is_none());
    }

    #[test]
    fn no_divergence_when_price_holds() {
        let f = shaped(19.0, -1.0);
        assert!(find_bullish_divergence(&f, 8, 2).is_none());
        let ctx = GateContext::new(&f);
        let outcome = BullishDivergence::new(8, 2).evaluate(&ctx, Tier::Strict);
        assert!(outcome.status.is_failed());
    }

    #[test]
    fn short_frame_fails_with_reason() {
        let f = shaped(17.0, -1.0);
        let ctx = GateContext::new(&f);
        let outcome = BullishDivergence::default().evaluate(&ctx, Tier::Strict);
        assert!(outcome.status.is_failed());
        assert!(outcome.detail.contains("need 40 bars"));
    }

    #[test]
    fn undefined_macd_at_low_fails() {
        let f = shaped(17.0, f64::NAN);
        let err = measure_divergence(&f, 8, 2).unwrap_err();
        assert!(err.contains("MACD undefined"));
    }

    #[test]
    fn only_trailing_lookback_is_inspected() {
        // a very low close before the lookback must be ignored
        let mut closes = vec![5.0, 30.0];
        closes.extend([20.0, 18.0, 25.0, 26.0, 27.0, 24.0, 17.0, 22.0]);
        let mut macd = vec![-9.0, 0.0];
        macd.extend([-1.0, -2.0, 0.0, 0.5, 0.3, 0.0, -1.0, -0.5]);
        let f = frame(&closes, &macd);
        let d = find_bullish_divergence(&f, 8, 2).unwrap();
        assert_eq!(d.earlier_index, 3);
    }
}
