//! Batch scan: every ticker through the core pipeline, in parallel.
//!
//! Each ticker is independent. A ticker whose bars cannot be loaded becomes a
//! Reject row with reason `load_failed`; a ticker whose bars fail validation
//! becomes a Reject row with the core's reason. Nothing a single ticker does
//! aborts the batch.

use std::collections::BTreeMap;
use std::path::Path;

use macdscan_core::classifier::{Classification, VerdictReason};
use macdscan_core::{
    annotate, simulate, Bar, Classifier, CoreError, Fundamentals, IndicatorFrame, RiskAnnotation,
    Verdict,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ConfigHash, ScanConfig};
use crate::data_loader::{
    dataset_hash, load_company_info, load_fundamentals, load_quotes, load_tickers, resolve_bars,
    trailing_window, CompanyInfo, DataSource, LoadError,
};

/// Current schema version for exported scan reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Reason code for a ticker whose bars could not be read.
pub const LOAD_FAILED: &str = "load_failed";

/// Everything a scan reads besides the bar files.
#[derive(Debug, Clone, Default)]
pub struct ScanInputs {
    pub tickers: Vec<String>,
    pub fundamentals: BTreeMap<String, Fundamentals>,
    pub company_info: BTreeMap<String, CompanyInfo>,
    /// Current price per ticker, for risk/reward.
    pub quotes: BTreeMap<String, f64>,
}

impl ScanInputs {
    /// Resolve the ticker list and optional tables named by `config`.
    ///
    /// Inline `data.symbols` win over the ticker file.
    pub fn load(config: &ScanConfig) -> Result<Self, LoadError> {
        let data = &config.data;
        let tickers = match (&data.tickers, data.symbols.is_empty()) {
            (_, false) => data.symbols.clone(),
            (Some(path), true) => load_tickers(path)?,
            (None, true) => Vec::new(),
        };
        let fundamentals = data
            .fundamentals
            .as_deref()
            .map(load_fundamentals)
            .transpose()?
            .unwrap_or_default();
        let company_info = data
            .company_info
            .as_deref()
            .map(load_company_info)
            .transpose()?
            .unwrap_or_default();
        let quotes = data
            .quotes
            .as_deref()
            .map(load_quotes)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            tickers: dedup_preserving_order(tickers),
            fundamentals,
            company_info,
            quotes,
        })
    }
}

fn dedup_preserving_order(tickers: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tickers
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// One ticker's line in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRow {
    pub ticker: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    /// `None` when the bars could not be loaded.
    pub source: Option<DataSource>,
    pub classification: Classification,
    /// Reason code: the verdict's code, or `load_failed`.
    pub reason: String,
    /// Human-readable detail for rejects.
    pub detail: Option<String>,
    pub verdict: Option<Verdict>,
    /// Main only, and only when the ticker has a quoted price.
    pub annotation: Option<RiskAnnotation>,
    /// Main only.
    pub backtest_roi: Option<f64>,
}

impl ScanRow {
    fn load_failed(ticker: &str, info: Option<&CompanyInfo>, err: &LoadError) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: info.and_then(|i| i.name.clone()),
            industry: info.and_then(|i| i.industry.clone()),
            source: None,
            classification: Classification::Reject,
            reason: LOAD_FAILED.to_string(),
            detail: Some(err.to_string()),
            verdict: None,
            annotation: None,
            backtest_roi: None,
        }
    }

    pub fn score(&self) -> Option<f64> {
        self.verdict
            .as_ref()
            .and_then(|v| v.score.as_ref())
            .map(|s| s.total)
    }
}

/// Result of a batch scan, rows in report order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub schema_version: u32,
    pub config_hash: ConfigHash,
    pub dataset_hash: String,
    /// True when any ticker ran on generated bars.
    pub synthetic: bool,
    pub rows: Vec<ScanRow>,
}

impl ScanReport {
    pub fn count(&self, classification: Classification) -> usize {
        self.rows
            .iter()
            .filter(|r| r.classification == classification)
            .count()
    }

    pub fn load_failures(&self) -> usize {
        self.rows.iter().filter(|r| r.reason == LOAD_FAILED).count()
    }
}

/// Report order: Main by score (highest first), then Watchlist, then
/// Reject; ties broken by ticker.
pub fn sort_rows(rows: &mut [ScanRow]) {
    rows.sort_by(|a, b| {
        a.classification
            .rank()
            .cmp(&b.classification.rank())
            .then_with(|| {
                let sa = a.score().unwrap_or(f64::NEG_INFINITY);
                let sb = b.score().unwrap_or(f64::NEG_INFINITY);
                sb.total_cmp(&sa)
            })
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
}

/// Classify one already-loaded series. Main verdicts get a backtest and, when
/// `quote` is given, a risk/reward annotation at that price.
pub fn evaluate_series(
    bars: &[Bar],
    fundamentals: Option<&Fundamentals>,
    quote: Option<f64>,
    config: &ScanConfig,
    classifier: &Classifier,
) -> (Verdict, Option<RiskAnnotation>, Option<f64>) {
    let frame = match IndicatorFrame::compute(bars, &config.indicators) {
        Ok(frame) => frame,
        Err(err) => {
            let last = bars.last();
            let verdict =
                Verdict::rejected(err.into(), last.map(|b| b.date), last.map(|b| b.close));
            return (verdict, None, None);
        }
    };

    let verdict = classifier.classify(&frame, None, fundamentals);
    if !verdict.is_main() {
        return (verdict, None, None);
    }

    let annotation = quote
        .map(|price| annotate(&verdict, price))
        .transpose()
        .unwrap_or_else(|err: CoreError| {
            debug!(error = %err, "main verdict without levels");
            None
        });
    let roi = if config.backtest.enabled {
        simulate(&frame, config.backtest.initial_capital).ok()
    } else {
        None
    };
    (verdict, annotation, roi)
}

fn scan_ticker(
    ticker: &str,
    bars_dir: &Path,
    config: &ScanConfig,
    classifier: &Classifier,
    inputs: &ScanInputs,
) -> (ScanRow, Option<Vec<Bar>>) {
    let info = inputs.company_info.get(ticker);
    let (bars, source) = match resolve_bars(bars_dir, ticker, config.data.synthetic) {
        Ok((bars, source)) => (trailing_window(bars, config.data.history_bars), source),
        Err(err) => {
            warn!(ticker, error = %err, "failed to load bars");
            return (ScanRow::load_failed(ticker, info, &err), None);
        }
    };

    let fundamentals = inputs.fundamentals.get(ticker);
    let quote = inputs.quotes.get(ticker).copied();
    let (verdict, annotation, backtest_roi) =
        evaluate_series(&bars, fundamentals, quote, config, classifier);

    debug!(
        ticker,
        bars = bars.len(),
        classification = %verdict.classification,
        reason = %verdict.reason.code(),
        "classified"
    );

    let detail = match &verdict.reason {
        VerdictReason::GateFailed { detail, .. } => Some(detail.clone()),
        VerdictReason::InvalidInput { message } => Some(message.clone()),
        VerdictReason::InsufficientData { required, actual } => {
            Some(format!("need {required} bars, have {actual}"))
        }
        VerdictReason::Qualified => None,
    };

    let row = ScanRow {
        ticker: ticker.to_string(),
        name: info.and_then(|i| i.name.clone()),
        industry: info.and_then(|i| i.industry.clone()),
        source: Some(source),
        classification: verdict.classification,
        reason: verdict.reason.code(),
        detail,
        verdict: Some(verdict),
        annotation,
        backtest_roi,
    };
    (row, Some(bars))
}

/// Scan every ticker in `inputs`.
///
/// Fails only on an unusable classifier configuration; per-ticker problems
/// become rows.
pub fn run_scan(config: &ScanConfig, inputs: &ScanInputs) -> Result<ScanReport, ConfigError> {
    let classifier = Classifier::new(config.classifier.clone())
        .map_err(|e| ConfigError::Invalid(format!("classifier: {e}")))?
        .with_market(config.market);
    let bars_dir = config.data.bars_dir.as_path();

    info!(
        tickers = inputs.tickers.len(),
        bars_dir = %bars_dir.display(),
        synthetic = config.data.synthetic,
        "starting scan"
    );

    let results: Vec<(ScanRow, Option<Vec<Bar>>)> = inputs
        .tickers
        .par_iter()
        .map(|ticker| scan_ticker(ticker, bars_dir, config, &classifier, inputs))
        .collect();

    let dataset_hash = dataset_hash(
        results
            .iter()
            .filter_map(|(row, bars)| bars.as_deref().map(|b| (row.ticker.as_str(), b))),
    );
    let mut rows: Vec<ScanRow> = results.into_iter().map(|(row, _)| row).collect();
    sort_rows(&mut rows);

    let report = ScanReport {
        schema_version: SCHEMA_VERSION,
        config_hash: config.config_hash(),
        dataset_hash,
        synthetic: rows.iter().any(|r| r.source == Some(DataSource::Synthetic)),
        rows,
    };

    info!(
        main = report.count(Classification::Main),
        watchlist = report.count(Classification::Watchlist),
        reject = report.count(Classification::Reject),
        load_failed = report.load_failures(),
        "scan complete"
    );
    if report.synthetic {
        warn!("report includes synthetic data");
    }
    Ok(report)
}
