//! Input loading for the runner.
//!
//! Reads the ticker list, per-ticker bar CSVs, and the optional fundamentals
//! and company-info tables. Files are UTF-8, a leading BOM is tolerated, and
//! headers match case-insensitively with spaces and underscores ignored
//! (`Adj Close`, `adj_close` and `ADJCLOSE` are the same column).
//!
//! Missing cells (`""`, `N/A`, `NaN`, `null`, `-`) load as `None`. A cell
//! that is present but not a number is a malformed row and fails the file.
//!
//! When a bar file is absent and synthetic mode is on, a deterministic random
//! walk is generated instead. Synthetic series are tagged so that reports
//! built on them are never mistaken for real scans.

use chrono::{Datelike, NaiveDate};
use macdscan_core::{Bar, Fundamentals};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Length of a generated synthetic series (about one trading year).
pub const SYNTHETIC_BARS: usize = 250;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{path}:{line}: {message}")]
    Malformed {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("no bar file for '{ticker}' at {path} (use --synthetic for generated data)")]
    MissingBars { ticker: String, path: PathBuf },
}

/// Where a ticker's bars came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    File,
    Synthetic,
}

/// Display metadata from the company-info table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: Option<String>,
    pub industry: Option<String>,
}

// ── Ticker list ──────────────────────────────────────────────────────

/// One ticker per line; blank lines and `#` comments are skipped.
pub fn parse_tickers(text: &str) -> Vec<String> {
    text.trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn load_tickers(path: &Path) -> Result<Vec<String>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_tickers(&text))
}

// ── Cells and headers ────────────────────────────────────────────────

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_missing(cell: &str) -> bool {
    matches!(
        cell.to_ascii_lowercase().as_str(),
        "" | "n/a" | "na" | "nan" | "null" | "none" | "-" | "--"
    )
}

/// Parse an optional numeric cell. Thousands separators are allowed.
fn parse_number(cell: &str) -> Result<Option<f64>, String> {
    let cell = cell.trim();
    if is_missing(cell) {
        return Ok(None);
    }
    let cleaned: String = cell.chars().filter(|c| *c != ',').collect();
    let value: f64 = cleaned
        .parse()
        .map_err(|_| format!("'{cell}' is not a number"))?;
    Ok(Some(value).filter(|v| v.is_finite()))
}

fn parse_date(cell: &str) -> Result<NaiveDate, String> {
    let cell = cell.trim();
    ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(cell, fmt).ok())
        .ok_or_else(|| format!("'{cell}' is not a date"))
}

/// Column positions keyed by normalized header name.
struct Columns(HashMap<String, usize>);

impl Columns {
    fn new(headers: &csv::StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (normalize_header(h), i))
                .collect(),
        )
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.0.get(name).copied()
    }

    fn require(&self, name: &'static str, path: &Path) -> Result<usize, LoadError> {
        self.find(name).ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: name,
        })
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn record_line(record: &csv::StringRecord) -> u64 {
    record.position().map_or(0, |p| p.line())
}

// ── Bars ─────────────────────────────────────────────────────────────

/// Parse bars from CSV text. `path` only labels errors.
///
/// Rows without a close are dropped. The result is sorted by date; duplicate
/// dates are left in place for series validation to report.
pub fn read_bars<R: Read>(reader: R, path: &Path) -> Result<Vec<Bar>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv_reader(reader);
    let columns = Columns::new(rdr.headers().map_err(csv_err)?);

    let date_col = columns.require("date", path)?;
    let close_col = columns.require("close", path)?;
    let open_col = columns.find("open");
    let high_col = columns.find("high");
    let low_col = columns.find("low");
    let volume_col = columns.find("volume");
    let adj_col = columns.find("adjclose");

    let mut bars = Vec::new();
    let mut dropped = 0usize;
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let line = record_line(&record);
        let malformed = |message: String| LoadError::Malformed {
            path: path.to_path_buf(),
            line,
            message,
        };
        let cell = |col: Option<usize>| col.and_then(|c| record.get(c)).unwrap_or("");
        let number = |col: Option<usize>| parse_number(cell(col)).map_err(malformed);

        let date = parse_date(cell(Some(date_col))).map_err(malformed)?;
        let Some(close) = number(Some(close_col))? else {
            dropped += 1;
            continue;
        };
        let volume = number(volume_col)?
            .map(|v| {
                if v < 0.0 {
                    Err(malformed(format!("negative volume {v}")))
                } else {
                    Ok(v.round() as u64)
                }
            })
            .transpose()?;

        bars.push(Bar {
            date,
            open: number(open_col)?,
            high: number(high_col)?,
            low: number(low_col)?,
            close,
            volume,
            adj_close: number(adj_col)?,
        });
    }

    if dropped > 0 {
        debug!(path = %path.display(), dropped, "dropped rows without a close");
    }
    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

pub fn load_bars(path: &Path) -> Result<Vec<Bar>, LoadError> {
    read_bars(open(path)?, path)
}

/// Keep the last `window` bars. `0` keeps everything.
pub fn trailing_window(mut bars: Vec<Bar>, window: usize) -> Vec<Bar> {
    if window > 0 && bars.len() > window {
        bars.drain(..bars.len() - window);
    }
    bars
}

/// Bar file path for a ticker.
pub fn bars_path(bars_dir: &Path, ticker: &str) -> PathBuf {
    bars_dir.join(format!("{ticker}.csv"))
}

/// Load a ticker's bars, falling back to synthetic data when allowed.
pub fn resolve_bars(
    bars_dir: &Path,
    ticker: &str,
    synthetic: bool,
) -> Result<(Vec<Bar>, DataSource), LoadError> {
    let path = bars_path(bars_dir, ticker);
    if path.is_file() {
        return load_bars(&path).map(|bars| (bars, DataSource::File));
    }
    if synthetic {
        warn!(
            ticker,
            "no bar file; generating synthetic data, results will be tagged as synthetic"
        );
        return Ok((generate_synthetic_bars(ticker, SYNTHETIC_BARS), DataSource::Synthetic));
    }
    Err(LoadError::MissingBars {
        ticker: ticker.to_string(),
        path,
    })
}

// ── Tables ───────────────────────────────────────────────────────────

/// `Ticker,TrailingPE,RevenueGrowth`. Growth is a fraction.
pub fn read_fundamentals<R: Read>(
    reader: R,
    path: &Path,
) -> Result<BTreeMap<String, Fundamentals>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv_reader(reader);
    let columns = Columns::new(rdr.headers().map_err(csv_err)?);
    let ticker_col = columns.require("ticker", path)?;
    let pe_col = columns.require("trailingpe", path)?;
    let growth_col = columns.require("revenuegrowth", path)?;

    let mut table = BTreeMap::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let line = record_line(&record);
        let malformed = |message: String| LoadError::Malformed {
            path: path.to_path_buf(),
            line,
            message,
        };
        let ticker = record.get(ticker_col).unwrap_or("").trim();
        if ticker.is_empty() {
            continue;
        }
        let pe = parse_number(record.get(pe_col).unwrap_or("")).map_err(malformed)?;
        let growth = parse_number(record.get(growth_col).unwrap_or("")).map_err(malformed)?;
        table.insert(ticker.to_string(), Fundamentals::new(pe, growth));
    }
    Ok(table)
}

pub fn load_fundamentals(path: &Path) -> Result<BTreeMap<String, Fundamentals>, LoadError> {
    read_fundamentals(open(path)?, path)
}

/// `Ticker,Price`: current quotes for risk/reward. Rows with a blank or
/// non-positive price are skipped.
pub fn read_quotes<R: Read>(reader: R, path: &Path) -> Result<BTreeMap<String, f64>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv_reader(reader);
    let columns = Columns::new(rdr.headers().map_err(csv_err)?);
    let ticker_col = columns.require("ticker", path)?;
    let price_col = columns.require("price", path)?;

    let mut table = BTreeMap::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let line = record_line(&record);
        let ticker = record.get(ticker_col).unwrap_or("").trim();
        if ticker.is_empty() {
            continue;
        }
        let price = parse_number(record.get(price_col).unwrap_or("")).map_err(|message| {
            LoadError::Malformed {
                path: path.to_path_buf(),
                line,
                message,
            }
        })?;
        match price {
            Some(p) if p > 0.0 => {
                table.insert(ticker.to_string(), p);
            }
            _ => debug!(ticker, "no usable quote"),
        }
    }
    Ok(table)
}

pub fn load_quotes(path: &Path) -> Result<BTreeMap<String, f64>, LoadError> {
    read_quotes(open(path)?, path)
}

/// `Ticker,Name,Industry`. Name and industry may be blank.
pub fn read_company_info<R: Read>(
    reader: R,
    path: &Path,
) -> Result<BTreeMap<String, CompanyInfo>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv_reader(reader);
    let columns = Columns::new(rdr.headers().map_err(csv_err)?);
    let ticker_col = columns.require("ticker", path)?;
    let name_col = columns.find("name");
    let industry_col = columns.find("industry");

    let text = |record: &csv::StringRecord, col: Option<usize>| {
        col.and_then(|c| record.get(c))
            .map(str::trim)
            .filter(|s| !is_missing(s))
            .map(str::to_string)
    };

    let mut table = BTreeMap::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let ticker = record.get(ticker_col).unwrap_or("").trim();
        if ticker.is_empty() {
            continue;
        }
        table.insert(
            ticker.to_string(),
            CompanyInfo {
                name: text(&record, name_col),
                industry: text(&record, industry_col),
            },
        );
    }
    Ok(table)
}

pub fn load_company_info(path: &Path) -> Result<BTreeMap<String, CompanyInfo>, LoadError> {
    read_company_info(open(path)?, path)
}

// ── Fingerprint ──────────────────────────────────────────────────────

/// Deterministic BLAKE3 hash over every loaded series.
///
/// Tickers are hashed in sorted order, so the result does not depend on load
/// order. Missing values hash differently from any number.
pub fn dataset_hash<'a, I>(series: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a [Bar])>,
{
    let mut sorted: Vec<(&str, &[Bar])> = series.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = blake3::Hasher::new();
    for (ticker, bars) in sorted {
        hasher.update(ticker.as_bytes());
        hasher.update(&[0xff]);
        for bar in bars {
            hasher.update(bar.date.to_string().as_bytes());
            for value in [bar.open, bar.high, bar.low, Some(bar.close), bar.adj_close] {
                hash_optional(&mut hasher, value);
            }
            hash_optional(&mut hasher, bar.volume.map(|v| v as f64));
        }
    }
    hasher.finalize().to_hex().to_string()
}

fn hash_optional(hasher: &mut blake3::Hasher, value: Option<f64>) {
    match value {
        Some(v) => {
            hasher.update(&[1]);
            hasher.update(&v.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

// ── Synthetic ────────────────────────────────────────────────────────

/// Deterministic random-walk bars for developer runs.
///
/// The seed is the BLAKE3 hash of the ticker, so a ticker always gets the
/// same series. Weekdays only, starting 2023-01-02. These are fake prices.
pub fn generate_synthetic_bars(ticker: &str, count: usize) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(ticker.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::with_capacity(count);
    let mut price = 100.0_f64;
    let mut current = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap_or(NaiveDate::MIN);

    while bars.len() < count {
        let weekday = current.weekday();
        if weekday != chrono::Weekday::Sat && weekday != chrono::Weekday::Sun {
            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64);
            bars.push(Bar::ohlcv(current, open, high, low, close, volume));
            price = close;
        }
        current += chrono::Duration::days(1);
    }

    bars
}
