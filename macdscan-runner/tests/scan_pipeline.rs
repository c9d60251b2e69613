//! End-to-end batch scans over bar files in a temp directory.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use macdscan_core::classifier::{Classification, GateStatus};
use macdscan_core::Action;
use macdscan_runner::config::DataConfig;
use macdscan_runner::export::{export_csv, load_report, CSV_FILE};
use macdscan_runner::scan::LOAD_FAILED;
use macdscan_runner::{run_scan, save_artifacts, DataSource, ScanConfig, ScanInputs};

/// 40-bar decline, 60-bar rally, then a shallow pullback whose histogram is
/// converging back to zero.
fn main_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..40).map(|i| 100.0 - 0.5 * i as f64).collect();
    closes.extend((1..=60).map(|i| 80.5 + 0.8 * i as f64));
    let mut pullback = vec![-1.5, -1.5, -1.0, -0.5, 0.0, 0.2, 0.3, 0.4, 0.4];
    pullback.extend([0.5; 11]);
    let mut price = *closes.last().unwrap();
    for step in pullback {
        price += step;
        closes.push(price);
    }
    closes
}

fn bars_csv(closes: &[f64]) -> String {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let mut out = String::from("Date,Open,High,Low,Close,Volume\n");
    for (i, &close) in closes.iter().enumerate() {
        let open = if i == 0 { close } else { closes[i - 1] };
        let date = base + chrono::Duration::days(i as i64);
        out.push_str(&format!(
            "{date},{open},{},{},{close},1000\n",
            open.max(close) + 1.0,
            open.min(close) - 1.0
        ));
    }
    out
}

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

/// Bars dir with one Main candidate, one flat ticker, one short history and
/// one malformed file.
fn fixture(dir: &Path) -> ScanConfig {
    let bars_dir = dir.join("bars");
    std::fs::create_dir_all(&bars_dir).unwrap();
    write(&bars_dir, "2330.csv", &bars_csv(&main_closes()));
    write(&bars_dir, "1101.csv", &bars_csv(&[52.0; 120]));
    write(&bars_dir, "2317.csv", &bars_csv(&main_closes()[..30]));
    write(&bars_dir, "2454.csv", "Date,Close\n2024-01-02,abc\n");

    let tickers = write(dir, "tickers.txt", "# TW50 subset\n2330\n1101\n\n2317\n2454\n6666\n");
    let company = write(
        dir,
        "company.csv",
        "Ticker,Name,Industry\n2330,TSMC,Semiconductors\n2454,MediaTek,Semiconductors\n",
    );

    ScanConfig {
        data: DataConfig {
            bars_dir,
            tickers: Some(tickers),
            company_info: Some(company),
            ..DataConfig::default()
        },
        ..ScanConfig::default()
    }
}

#[test]
fn batch_reports_every_ticker_despite_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    let inputs = ScanInputs::load(&config).unwrap();
    assert_eq!(inputs.tickers.len(), 5);

    let report = run_scan(&config, &inputs).unwrap();
    assert_eq!(report.rows.len(), 5);
    assert!(!report.synthetic);
    assert_eq!(report.count(Classification::Main), 1);
    assert_eq!(report.load_failures(), 2);

    // Main sorts first
    let main = &report.rows[0];
    assert_eq!(main.ticker, "2330");
    assert_eq!(main.classification, Classification::Main);
    assert_eq!(main.name.as_deref(), Some("TSMC"));
    assert_eq!(main.source, Some(DataSource::File));
    assert_eq!(main.backtest_roi, Some(54.69));
    // no quotes table, so no risk/reward
    assert!(main.annotation.is_none());
    assert!(main.score().is_some());

    let by_ticker = |t: &str| report.rows.iter().find(|r| r.ticker == t).unwrap();

    assert_eq!(by_ticker("1101").classification, Classification::Reject);
    assert!(by_ticker("1101").reason.starts_with("gate_failed:"));
    assert!(by_ticker("1101").backtest_roi.is_none());

    assert_eq!(by_ticker("2317").reason, "insufficient_data");

    let malformed = by_ticker("2454");
    assert_eq!(malformed.reason, LOAD_FAILED);
    assert_eq!(malformed.name.as_deref(), Some("MediaTek"));
    assert!(malformed.detail.as_deref().unwrap().contains("abc"));

    assert_eq!(by_ticker("6666").reason, LOAD_FAILED);
}

#[test]
fn csv_export_never_writes_na() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture(dir.path());
    config.output.dir = dir.path().join("out");
    let inputs = ScanInputs::load(&config).unwrap();
    let report = run_scan(&config, &inputs).unwrap();

    let written = save_artifacts(&report, &config.output).unwrap();
    assert_eq!(written.len(), 2);

    let csv = std::fs::read_to_string(config.output.dir.join(CSV_FILE)).unwrap();
    assert_eq!(csv, export_csv(&report).unwrap());
    assert!(!csv.contains("N/A"));
    assert_eq!(csv.lines().count(), 6);
    assert!(csv
        .lines()
        .nth(1)
        .unwrap()
        .starts_with("2330,TSMC,Semiconductors,2024-04-30,Main,qualified,130.80,"));

    let reloaded = load_report(&config.output.dir).unwrap();
    assert_eq!(reloaded.config_hash, report.config_hash);
    let tickers: Vec<&str> = reloaded.rows.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers[0], "2330");
    assert_eq!(tickers.len(), 5);
}

#[test]
fn repeated_scans_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    let inputs = ScanInputs::load(&config).unwrap();
    let a = run_scan(&config, &inputs).unwrap();
    let b = run_scan(&config, &inputs).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.config_hash, config.config_hash());
    assert_eq!(a.dataset_hash.len(), 64);
}

#[test]
fn synthetic_mode_fills_missing_files_and_tags_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = ScanConfig {
        data: DataConfig {
            bars_dir: dir.path().to_path_buf(),
            symbols: vec!["FAKE1".into(), "FAKE2".into()],
            synthetic: true,
            ..DataConfig::default()
        },
        ..ScanConfig::default()
    };
    let inputs = ScanInputs::load(&config).unwrap();
    let report = run_scan(&config, &inputs).unwrap();
    assert!(report.synthetic);
    assert_eq!(report.load_failures(), 0);
    assert!(report
        .rows
        .iter()
        .all(|r| r.source == Some(DataSource::Synthetic) && r.verdict.is_some()));
}

#[test]
fn fundamentals_table_feeds_the_filter() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture(dir.path());
    config.data.fundamentals = Some(write(
        dir.path(),
        "fundamentals.csv",
        "Ticker,TrailingPE,RevenueGrowth\n2330,45.0,0.2\n",
    ));
    config.classifier.main_gates.fundamentals = true;

    let inputs = ScanInputs::load(&config).unwrap();
    let report = run_scan(&config, &inputs).unwrap();
    let row = report.rows.iter().find(|r| r.ticker == "2330").unwrap();
    assert_eq!(row.classification, Classification::Reject);
    assert_eq!(row.reason, "gate_failed:fundamentals");
}

#[test]
fn quoted_price_drives_risk_reward() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture(dir.path());
    config.output.dir = dir.path().join("out");
    // 2330 closes at 130.80 with ATR ~2.47: stop ~125.86, target ~138.21
    config.data.quotes = Some(write(
        dir.path(),
        "quotes.csv",
        "Ticker,Price\n2330,128.0\n1101,52.0\n",
    ));

    let inputs = ScanInputs::load(&config).unwrap();
    assert_eq!(inputs.quotes.len(), 2);
    let report = run_scan(&config, &inputs).unwrap();

    let main = &report.rows[0];
    assert_eq!(main.ticker, "2330");
    let annotation = main.annotation.unwrap();
    assert_eq!(annotation.current_price, 128.0);
    assert!(annotation.risk_reward.unwrap() >= 2.0);
    assert_eq!(annotation.action, Action::Enter);

    // quoted, but not Main
    let flat = report.rows.iter().find(|r| r.ticker == "1101").unwrap();
    assert!(flat.annotation.is_none());

    let csv = export_csv(&report).unwrap();
    let line = csv.lines().nth(1).unwrap();
    assert!(line.contains(",enter,"), "{line}");
}

/// 40-bar decline, then a 170-bar steady rally.
fn old_crossing_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..40).map(|i| 100.0 - 0.5 * i as f64).collect();
    closes.extend((1..=170).map(|i| 80.5 + 0.5 * i as f64));
    closes
}

#[test]
fn zero_crossing_older_than_history_window_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let bars_dir = dir.path().join("bars");
    std::fs::create_dir_all(&bars_dir).unwrap();
    write(&bars_dir, "3008.csv", &bars_csv(&old_crossing_closes()));

    let mut config = ScanConfig {
        data: DataConfig {
            bars_dir,
            symbols: vec!["3008".into()],
            ..DataConfig::default()
        },
        ..ScanConfig::default()
    };
    let inputs = ScanInputs::load(&config).unwrap();

    // default window: only the rally is visible, MACD never went negative
    let report = run_scan(&config, &inputs).unwrap();
    let row = &report.rows[0];
    assert_eq!(row.reason, "gate_failed:zero_line_crossing");
    assert!(row.detail.as_deref().unwrap().contains("never crossed zero"));

    // whole file: the decline supplies the negative side
    config.data.history_bars = 0;
    let report = run_scan(&config, &inputs).unwrap();
    let verdict = report.rows[0].verdict.as_ref().unwrap();
    assert_ne!(verdict.gates[0].status, GateStatus::Failed);
}
