//! macdscan CLI: batch scan and single-series commands.
//!
//! Commands:
//! - `scan`: classify every ticker in a bars directory and export results
//! - `classify`: classify one bar CSV and print the verdict
//! - `backtest`: run the MACD crossover backtest on one bar CSV
//! - `annotate`: risk/reward for one bar CSV at a given price

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use macdscan_core::classifier::GateStatus;
use macdscan_core::{
    annotate, screen, simulate_detailed, Bar, Classifier, Fundamentals, IndicatorFrame, Verdict,
};
use macdscan_runner::data_loader::trailing_window;
use macdscan_runner::logging::{init_with_default, LogFormat};
use macdscan_runner::{load_bars, run_scan, save_artifacts, ScanConfig, ScanInputs, ScanReport};

#[derive(Parser)]
#[command(
    name = "macdscan",
    about = "macdscan: MACD pullback screener for daily equity series"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every ticker and write scan_results.csv / scan_results.json.
    Scan {
        /// TOML scan config. Flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory holding {ticker}.csv bar files.
        #[arg(long)]
        bars_dir: Option<PathBuf>,

        /// Ticker list file, one per line.
        #[arg(long)]
        tickers: Option<PathBuf>,

        /// Ticker,TrailingPE,RevenueGrowth table.
        #[arg(long)]
        fundamentals: Option<PathBuf>,

        /// Ticker,Name,Industry table.
        #[arg(long)]
        company_info: Option<PathBuf>,

        /// Ticker,Price table of current quotes for risk/reward.
        #[arg(long)]
        quotes: Option<PathBuf>,

        /// Trailing bars per ticker to classify (0 = whole file).
        #[arg(long)]
        history_bars: Option<usize>,

        /// Output directory for result files.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Generate synthetic bars for tickers without a file.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Classify a single bar CSV.
    Classify {
        #[arg(long)]
        csv: PathBuf,

        /// Trailing P/E for the fundamentals filter and score.
        #[arg(long)]
        pe: Option<f64>,

        /// Revenue growth as a fraction (0.12 = +12%).
        #[arg(long)]
        growth: Option<f64>,

        /// TOML scan config supplying indicator and classifier settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the full verdict as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the MACD crossover backtest on a single bar CSV.
    Backtest {
        #[arg(long)]
        csv: PathBuf,

        #[arg(long, default_value_t = macdscan_runner::config::DEFAULT_CAPITAL)]
        capital: f64,

        /// TOML scan config supplying indicator spans and history window.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the full report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Risk/reward of a Main candidate at a given price.
    Annotate {
        #[arg(long)]
        csv: PathBuf,

        #[arg(long)]
        price: f64,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_with_default(format, if cli.verbose { "debug" } else { "info" });

    match cli.command {
        Commands::Scan {
            config,
            bars_dir,
            tickers,
            fundamentals,
            company_info,
            quotes,
            history_bars,
            output_dir,
            synthetic,
        } => {
            let mut scan_config = load_config(config.as_deref())?;
            let data = &mut scan_config.data;
            if let Some(dir) = bars_dir {
                data.bars_dir = dir;
            }
            if let Some(path) = tickers {
                data.tickers = Some(path);
                data.symbols.clear();
            }
            if fundamentals.is_some() {
                data.fundamentals = fundamentals;
            }
            if company_info.is_some() {
                data.company_info = company_info;
            }
            if quotes.is_some() {
                data.quotes = quotes;
            }
            if let Some(n) = history_bars {
                data.history_bars = n;
            }
            data.synthetic |= synthetic;
            if let Some(dir) = output_dir {
                scan_config.output.dir = dir;
            }
            run_scan_cmd(&scan_config)
        }
        Commands::Classify {
            csv,
            pe,
            growth,
            config,
            json,
        } => run_classify(&csv, pe, growth, config.as_deref(), json),
        Commands::Backtest {
            csv,
            capital,
            config,
            json,
        } => run_backtest(&csv, capital, config.as_deref(), json),
        Commands::Annotate { csv, price, config } => run_annotate(&csv, price, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    match path {
        Some(path) => ScanConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(ScanConfig::default()),
    }
}

/// Bars from `csv`, cut to the config's trailing history window.
fn read_series(csv: &Path, config: &ScanConfig) -> Result<Vec<Bar>> {
    let bars =
        load_bars(csv).with_context(|| format!("failed to load bars from {}", csv.display()))?;
    Ok(trailing_window(bars, config.data.history_bars))
}

fn classifier_for(config: &ScanConfig) -> Result<Classifier> {
    Ok(Classifier::new(config.classifier.clone())
        .context("invalid classifier configuration")?
        .with_market(config.market))
}

// ── scan ─────────────────────────────────────────────────────────────

fn run_scan_cmd(config: &ScanConfig) -> Result<()> {
    config.validate().context("invalid scan configuration")?;
    if config.data.tickers.is_none() && config.data.symbols.is_empty() {
        bail!("no tickers: pass --tickers or set data.tickers / data.symbols in the config");
    }

    let inputs = ScanInputs::load(config).context("failed to load scan inputs")?;
    let report = run_scan(config, &inputs).context("scan failed")?;
    print_scan_summary(&report);

    for path in save_artifacts(&report, &config.output)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_scan_summary(report: &ScanReport) {
    use macdscan_core::classifier::Classification;

    println!("=== Scan Summary ===");
    println!("Tickers:     {}", report.rows.len());
    println!("Main:        {}", report.count(Classification::Main));
    println!("Watchlist:   {}", report.count(Classification::Watchlist));
    println!("Reject:      {}", report.count(Classification::Reject));
    println!("Load failed: {}", report.load_failures());
    if report.synthetic {
        println!("WARNING: report includes synthetic data");
    }

    let candidates: Vec<_> = report
        .rows
        .iter()
        .filter(|r| r.classification != Classification::Reject)
        .collect();
    if candidates.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<8} {:<20} {:<10} {:>10} {:>8} {:>6}  {}",
        "Ticker", "Name", "Class", "Close", "Score", "RR", "Action"
    );
    for row in candidates {
        let verdict = row.verdict.as_ref();
        println!(
            "{:<8} {:<20} {:<10} {:>10} {:>8} {:>6}  {}",
            row.ticker,
            row.name.as_deref().unwrap_or(""),
            row.classification.as_str(),
            fmt_opt(verdict.and_then(|v| v.close)),
            fmt_opt(row.score()),
            fmt_opt(row.annotation.and_then(|a| a.risk_reward)),
            row.annotation
                .map(|a| a.action.to_string())
                .unwrap_or_default(),
        );
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".into())
}

// ── classify ─────────────────────────────────────────────────────────

fn run_classify(
    csv: &Path,
    pe: Option<f64>,
    growth: Option<f64>,
    config: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let classifier = classifier_for(&config)?;
    let bars = read_series(csv, &config)?;
    let fundamentals = (pe.is_some() || growth.is_some()).then(|| Fundamentals::new(pe, growth));

    let verdict = screen(
        &bars,
        None,
        fundamentals.as_ref(),
        &config.indicators,
        &classifier,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        print_verdict(&verdict);
    }
    Ok(())
}

fn print_verdict(verdict: &Verdict) {
    println!("=== Verdict ===");
    println!("Classification: {}", verdict.classification);
    println!("Reason:         {}", verdict.reason.code());
    if let Some(date) = verdict.date {
        println!("Last bar:       {date}");
    }
    println!("Close:          {}", fmt_opt(verdict.close));
    println!(
        "MACD / Signal / Hist: {} / {} / {}",
        fmt4(verdict.macd),
        fmt4(verdict.signal),
        fmt4(verdict.hist)
    );
    if let Some(levels) = &verdict.levels {
        println!("ATR:            {:.2}", levels.atr);
        println!("Stop loss:      {:.2}", levels.stop_loss);
        println!("Take profit:    {:.2}", levels.take_profit);
    }
    if let Some(score) = &verdict.score {
        println!(
            "Score:          {:.2} (pattern {:.2}, momentum {:.2}, fundamental {:.2}, RS {:.2})",
            score.total, score.pattern, score.momentum, score.fundamental, score.relative_strength
        );
    }
    if !verdict.gates.is_empty() {
        println!();
        println!("--- Gates ---");
        for outcome in &verdict.gates {
            let status = match outcome.status {
                GateStatus::Passed(tier) => format!("pass ({tier:?})"),
                GateStatus::Failed => "FAIL".to_string(),
                GateStatus::Skipped => "skip".to_string(),
            };
            println!(
                "{:>2}. {:<22} {:<15} {}",
                outcome.gate.number(),
                outcome.gate.as_str(),
                status,
                outcome.detail
            );
        }
    }
}

fn fmt4(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".into())
}

// ── backtest ─────────────────────────────────────────────────────────

fn run_backtest(csv: &Path, capital: f64, config: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config)?;
    let bars = read_series(csv, &config)?;
    let frame =
        IndicatorFrame::compute(&bars, &config.indicators).context("cannot compute indicators")?;
    let report = simulate_detailed(&frame, capital).context("backtest failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("=== Backtest ===");
    println!("Initial capital: {:.2}", report.initial_capital);
    println!("Final value:     {:.2}", report.final_value);
    println!("ROI:             {:.2}%", report.roi_pct);
    println!("Round trips:     {}", report.trades.len());
    for trade in &report.trades {
        println!(
            "  {} @ {:.2} -> {} @ {:.2}  ({}%)",
            trade.entry_date,
            trade.entry_price,
            trade
                .exit_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
            trade.exit_price.unwrap_or(f64::NAN),
            fmt_opt(trade.return_pct())
        );
    }
    if let Some(open) = &report.open_trade {
        println!(
            "Open position since {} @ {:.2}",
            open.entry_date, open.entry_price
        );
    }
    Ok(())
}

// ── annotate ─────────────────────────────────────────────────────────

fn run_annotate(csv: &Path, price: f64, config: Option<&Path>) -> Result<()> {
    if !price.is_finite() || price <= 0.0 {
        bail!("--price must be positive, got {price}");
    }
    let config = load_config(config)?;
    let classifier = classifier_for(&config)?;
    let bars = read_series(csv, &config)?;
    let verdict = screen(&bars, None, None, &config.indicators, &classifier);

    let annotation = annotate(&verdict, price).with_context(|| {
        format!(
            "{} is {} ({}); only Main candidates can be annotated",
            csv.display(),
            verdict.classification,
            verdict.reason.code()
        )
    })?;

    println!("=== Risk/Reward ===");
    println!("Price:       {:.2}", annotation.current_price);
    println!("Stop loss:   {:.2}", annotation.stop_loss);
    println!("Take profit: {:.2}", annotation.take_profit);
    println!("R/R:         {}", fmt_opt(annotation.risk_reward));
    println!("Action:      {}", annotation.action);
    Ok(())
}
