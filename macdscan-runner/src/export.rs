//! Scan artifacts: `scan_results.csv` and `scan_results.json`.
//!
//! The JSON report carries a `schema_version`; unknown versions are rejected
//! on load. In the CSV, a value that does not exist is an empty cell.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::config::OutputConfig;
use crate::scan::{ScanReport, ScanRow, SCHEMA_VERSION};

pub const CSV_FILE: &str = "scan_results.csv";
pub const JSON_FILE: &str = "scan_results.json";

pub const CSV_COLUMNS: [&str; 16] = [
    "Ticker",
    "Name",
    "Industry",
    "LastDate",
    "Classification",
    "Reason",
    "Close",
    "MACD",
    "Signal",
    "Hist",
    "StopLoss",
    "TakeProfit",
    "Score",
    "RiskReward",
    "Action",
    "BacktestROI",
];

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ScanReport to JSON")
}

/// Deserialize a report, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<ScanReport> {
    let report: ScanReport =
        serde_json::from_str(json).context("failed to deserialize ScanReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV ────────────────────────────────────────────────────────────

fn cell(value: Option<f64>, decimals: usize) -> String {
    value
        .filter(|v| v.is_finite())
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_default()
}

fn csv_record(row: &ScanRow) -> [String; 16] {
    let verdict = row.verdict.as_ref();
    let levels = verdict.and_then(|v| v.levels.as_ref());
    let annotation = row.annotation.as_ref();
    [
        row.ticker.clone(),
        row.name.clone().unwrap_or_default(),
        row.industry.clone().unwrap_or_default(),
        verdict
            .and_then(|v| v.date)
            .map(|d| d.to_string())
            .unwrap_or_default(),
        row.classification.to_string(),
        row.reason.clone(),
        cell(verdict.and_then(|v| v.close), 2),
        cell(verdict.and_then(|v| v.macd), 4),
        cell(verdict.and_then(|v| v.signal), 4),
        cell(verdict.and_then(|v| v.hist), 4),
        cell(levels.map(|l| l.stop_loss), 2),
        cell(levels.map(|l| l.take_profit), 2),
        cell(row.score(), 2),
        cell(annotation.and_then(|a| a.risk_reward), 2),
        annotation.map(|a| a.action.to_string()).unwrap_or_default(),
        cell(row.backtest_roi, 2),
    ]
}

/// One row per ticker, in report order.
pub fn export_csv(report: &ScanReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_COLUMNS)?;
    for row in &report.rows {
        wtr.write_record(csv_record(row))?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the enabled artifacts into `output.dir`, creating it if needed.
///
/// Returns the paths written.
pub fn save_artifacts(report: &ScanReport, output: &OutputConfig) -> Result<Vec<PathBuf>> {
    save_to(report, &output.dir, output.csv, output.json)
}

fn save_to(report: &ScanReport, dir: &Path, csv: bool, json: bool) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))?;

    let mut written = Vec::new();
    if csv {
        let path = dir.join(CSV_FILE);
        std::fs::write(&path, export_csv(report)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    if json {
        let path = dir.join(JSON_FILE);
        std::fs::write(&path, export_json(report)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Load a report from an output directory's JSON artifact.
pub fn load_report(dir: &Path) -> Result<ScanReport> {
    let path = dir.join(JSON_FILE);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macdscan_core::classifier::{Classification, VerdictReason};
    use macdscan_core::Verdict;

    fn sample_report() -> ScanReport {
        let verdict = Verdict::rejected(
            VerdictReason::InsufficientData {
                required: 60,
                actual: 12,
            },
            chrono::NaiveDate::from_ymd_opt(2024, 5, 2),
            Some(612.0),
        );
        ScanReport {
            schema_version: SCHEMA_VERSION,
            config_hash: "abc".into(),
            dataset_hash: "def".into(),
            synthetic: false,
            rows: vec![
                ScanRow {
                    ticker: "2330".into(),
                    name: Some("TSMC".into()),
                    industry: None,
                    source: Some(crate::data_loader::DataSource::File),
                    classification: Classification::Reject,
                    reason: verdict.reason.code(),
                    detail: None,
                    verdict: Some(verdict),
                    annotation: None,
                    backtest_roi: None,
                },
                ScanRow {
                    ticker: "9999".into(),
                    name: None,
                    industry: None,
                    source: None,
                    classification: Classification::Reject,
                    reason: crate::scan::LOAD_FAILED.into(),
                    detail: Some("no bar file".into()),
                    verdict: None,
                    annotation: None,
                    backtest_roi: None,
                },
            ],
        }
    }

    #[test]
    fn csv_has_header_and_empty_cells_for_missing_values() {
        let csv = export_csv(&sample_report()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CSV_COLUMNS.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "2330,TSMC,,2024-05-02,Reject,insufficient_data,612.00,,,,,,,,,"
        );
        assert_eq!(lines.next().unwrap(), "9999,,,,Reject,load_failed,,,,,,,,,,");
        assert!(!csv.contains("N/A"));
        assert!(!csv.to_lowercase().contains("nan"));
    }

    #[test]
    fn json_roundtrip() {
        let report = sample_report();
        let back = import_json(&export_json(&report).unwrap()).unwrap();
        assert_eq!(report, back);
    }

    #[test]
    fn json_rejects_unknown_version() {
        let mut report = sample_report();
        report.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&report).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn artifacts_land_in_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let output = OutputConfig {
            dir: out.clone(),
            csv: true,
            json: true,
        };
        let written = save_artifacts(&sample_report(), &output).unwrap();
        assert_eq!(written, vec![out.join(CSV_FILE), out.join(JSON_FILE)]);
        assert_eq!(load_report(&out).unwrap(), sample_report());
    }
}
