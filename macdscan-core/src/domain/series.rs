//! Series validation.
//!
//! A series is a plain `&[Bar]` ordered oldest → newest. All indicator math is
//! causal, so the ordering invariant is checked up front instead of being
//! repaired silently.

use crate::error::CoreError;

use super::Bar;

/// Validate a bar series before any indicator computation.
///
/// Rejects empty series, non-finite or non-positive closes, non-positive or
/// non-finite optional prices, `high < low`, and dates that are not strictly
/// increasing. The first offending bar is named in the error.
pub fn validate_series(bars: &[Bar]) -> Result<(), CoreError> {
    if bars.is_empty() {
        return Err(CoreError::InvalidInput("series is empty".into()));
    }

    for (i, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() {
            return Err(CoreError::InvalidInput(format!(
                "bar {i} ({}) has a non-finite close",
                bar.date
            )));
        }
        if bar.close <= 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "bar {i} ({}) has non-positive close {}",
                bar.date, bar.close
            )));
        }
        if !bar.is_sane() {
            return Err(CoreError::InvalidInput(format!(
                "bar {i} ({}) has malformed open/high/low",
                bar.date
            )));
        }
        if i > 0 && bar.date <= bars[i - 1].date {
            return Err(CoreError::InvalidInput(format!(
                "dates not strictly increasing at bar {i}: {} after {}",
                bar.date,
                bars[i - 1].date
            )));
        }
    }

    Ok(())
}
