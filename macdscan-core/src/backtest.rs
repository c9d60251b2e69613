//! MACD crossover backtest.
//!
//! Long-only, all-in: buy with all cash at the close of a bar where MACD
//! crosses above Signal, sell everything at the close of a bar where it
//! crosses below. No costs, no slippage, no partial sizing. A position still
//! open on the last bar is marked at the last close.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::frame::IndicatorFrame;
use crate::round2;

/// Direction of a MACD/Signal crossover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cross {
    Above,
    Below,
}

/// Crossover at bar `i`, if any. Both `i - 1` and `i` need defined MACD and
/// Signal; equality on either bar is not a cross.
pub fn cross_at(frame: &IndicatorFrame, i: usize) -> Option<Cross> {
    if i == 0 {
        return None;
    }
    let prev_macd = frame.macd_at(i - 1)?;
    let prev_signal = frame.signal_at(i - 1)?;
    let macd = frame.macd_at(i)?;
    let signal = frame.signal_at(i)?;

    if prev_macd < prev_signal && macd > signal {
        Some(Cross::Above)
    } else if prev_macd > prev_signal && macd < signal {
        Some(Cross::Below)
    } else {
        None
    }
}

/// One round trip. `exit_*` are `None` for a position still open at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub shares: f64,
    pub exit_bar: Option<usize>,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<f64>,
}

impl Trade {
    /// Return on the trade as a percentage of entry price.
    pub fn return_pct(&self) -> Option<f64> {
        self.exit_price
            .map(|exit| (exit / self.entry_price - 1.0) * 100.0)
    }

    pub fn is_open(&self) -> bool {
        self.exit_bar.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub initial_capital: f64,
    pub final_value: f64,
    /// `(final / initial − 1) · 100`, rounded to 2 decimals.
    pub roi_pct: f64,
    /// Completed round trips, oldest first.
    pub trades: Vec<Trade>,
    /// Position held at the last bar, if any.
    pub open_trade: Option<Trade>,
}

/// Run the crossover strategy over `frame`.
pub fn simulate_detailed(
    frame: &IndicatorFrame,
    initial_capital: f64,
) -> Result<BacktestReport, CoreError> {
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(CoreError::InvalidInput(format!(
            "initial capital must be finite and positive, got {initial_capital}"
        )));
    }

    let bars = frame.bars();
    let mut cash = initial_capital;
    let mut open: Option<Trade> = None;
    let mut trades = Vec::new();

    for i in 1..bars.len() {
        let close = bars[i].close;
        match (cross_at(frame, i), open.take()) {
            (Some(Cross::Above), None) => {
                let shares = cash / close;
                cash = 0.0;
                open = Some(Trade {
                    entry_bar: i,
                    entry_date: bars[i].date,
                    entry_price: close,
                    shares,
                    exit_bar: None,
                    exit_date: None,
                    exit_price: None,
                });
            }
            (Some(Cross::Below), Some(mut trade)) => {
                cash += trade.shares * close;
                trade.exit_bar = Some(i);
                trade.exit_date = Some(bars[i].date);
                trade.exit_price = Some(close);
                trades.push(trade);
            }
            (_, held) => open = held,
        }
    }

    let last_close = frame.close(frame.last_index()).unwrap_or(0.0);
    let final_value = cash + open.as_ref().map_or(0.0, |t| t.shares * last_close);

    Ok(BacktestReport {
        initial_capital,
        final_value,
        roi_pct: round2((final_value / initial_capital - 1.0) * 100.0),
        trades,
        open_trade: open,
    })
}

/// ROI percentage of the crossover strategy.
pub fn simulate(frame: &IndicatorFrame, initial_capital: f64) -> Result<f64, CoreError> {
    simulate_detailed(frame, initial_capital).map(|report| report.roi_pct)
}
