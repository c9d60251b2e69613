//! Daily → weekly bar aggregation.
//!
//! Groups bars by ISO week and produces one bar per week with:
//! - open = first bar's open
//! - high = max high in the week
//! - low = min low in the week
//! - close = last bar's close
//! - volume = sum of the known volumes
//! - date = last trading day of the week
//!
//! Missing optional columns stay missing when no bar in the week has them.

use chrono::Datelike;

use crate::domain::Bar;

/// Aggregate a daily series into weekly bars. Input must be ordered oldest →
/// newest; the output keeps that order.
pub fn resample_weekly(daily: &[Bar]) -> Vec<Bar> {
    let mut weekly: Vec<Bar> = Vec::new();
    let mut current: Option<((i32, u32), Vec<&Bar>)> = None;

    for bar in daily {
        let iso = bar.date.iso_week();
        let key = (iso.year(), iso.week());

        match &mut current {
            Some((k, bars)) if *k == key => bars.push(bar),
            _ => {
                if let Some((_, bars)) = current.take() {
                    weekly.extend(make_weekly_bar(&bars));
                }
                current = Some((key, vec![bar]));
            }
        }
    }

    if let Some((_, bars)) = current {
        weekly.extend(make_weekly_bar(&bars));
    }

    weekly
}

fn make_weekly_bar(bars: &[&Bar]) -> Option<Bar> {
    let first = bars.first()?;
    let last = bars.last()?;

    let high = bars.iter().filter_map(|b| b.high).reduce(f64::max);
    let low = bars.iter().filter_map(|b| b.low).reduce(f64::min);
    let volume = bars
        .iter()
        .filter_map(|b| b.volume)
        .fold(None, |acc: Option<u64>, v| Some(acc.unwrap_or(0) + v));

    Some(Bar {
        date: last.date,
        open: first.open,
        high,
        low,
        close: last.close,
        volume,
        adj_close: last.adj_close,
    })
}
