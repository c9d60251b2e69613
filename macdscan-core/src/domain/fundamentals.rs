//! Optional per-ticker fundamentals.

use serde::{Deserialize, Serialize};

/// Trailing fundamentals for a ticker.
///
/// `revenue_growth` is a fraction (`0.12` = +12% year over year).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    #[serde(default)]
    pub trailing_pe: Option<f64>,
    #[serde(default)]
    pub revenue_growth: Option<f64>,
}

impl Fundamentals {
    pub fn new(trailing_pe: Option<f64>, revenue_growth: Option<f64>) -> Self {
        Self {
            trailing_pe: trailing_pe.filter(|v| v.is_finite()),
            revenue_growth: revenue_growth.filter(|v| v.is_finite()),
        }
    }

    /// Both fields present and finite.
    pub fn is_complete(&self) -> bool {
        matches!(
            (self.trailing_pe, self.revenue_growth),
            (Some(pe), Some(g)) if pe.is_finite() && g.is_finite()
        )
    }
}
