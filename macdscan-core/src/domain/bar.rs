//! Bar: one trading day (or week) of price history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single ticker on a single trading day.
///
/// Only `date` and `close` are required. Exchange feeds and vendor histories
/// regularly omit open/high/low or volume on thin days, so those columns are
/// optional rather than sentinel-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<u64>,
    #[serde(default)]
    pub adj_close: Option<f64>,
}

impl Bar {
    /// Bar with every column present.
    pub fn ohlcv(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close,
            volume: Some(volume),
            adj_close: None,
        }
    }

    /// Close-only bar.
    pub fn close_only(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
            adj_close: None,
        }
    }

    /// Returns true if the close is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !self.close.is_finite()
    }

    /// Basic sanity check: every present price is finite and positive, and
    /// `high >= low` when both are present.
    pub fn is_sane(&self) -> bool {
        if self.is_void() || self.close <= 0.0 {
            return false;
        }
        let present_ok = [self.open, self.high, self.low, self.adj_close]
            .iter()
            .flatten()
            .all(|p| p.is_finite() && *p > 0.0);
        let range_ok = match (self.high, self.low) {
            (Some(h), Some(l)) => h >= l,
            _ => true,
        };
        present_ok && range_ok
    }

    /// Volume as `f64`, `NaN` when missing.
    pub fn volume_f64(&self) -> f64 {
        self.volume.map(|v| v as f64).unwrap_or(f64::NAN)
    }
}
