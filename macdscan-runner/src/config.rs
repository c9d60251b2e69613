//! TOML scan configuration.
//!
//! Every section is `#[serde(default)]`, so a minimal file only names what it
//! changes:
//!
//! ```toml
//! [data]
//! bars_dir = "data/bars"
//! tickers = "data/tickers.txt"
//!
//! [classifier.main_gates]
//! volume = true
//! ```

use macdscan_core::classifier::{ClassifierConfig, MarketContext};
use macdscan_core::IndicatorParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Content hash identifying a configuration.
pub type ConfigHash = String;

/// Default starting capital for the per-ticker crossover backtest.
pub const DEFAULT_CAPITAL: f64 = 1_000_000.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Trailing daily bars handed to the classifier: about six months.
pub const DEFAULT_HISTORY_BARS: usize = 126;

/// Where the inputs live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding `{ticker}.csv` bar files.
    pub bars_dir: PathBuf,
    /// Ticker list file. Ignored when `symbols` is non-empty.
    pub tickers: Option<PathBuf>,
    /// Inline ticker list.
    pub symbols: Vec<String>,
    /// `Ticker,TrailingPE,RevenueGrowth` table.
    pub fundamentals: Option<PathBuf>,
    /// `Ticker,Name,Industry` table.
    pub company_info: Option<PathBuf>,
    /// `Ticker,Price` table of current quotes. Main rows are annotated only
    /// for tickers with a quote.
    pub quotes: Option<PathBuf>,
    /// Classify only the last `history_bars` bars of each file. `0` uses the
    /// whole file.
    pub history_bars: usize,
    /// Generate random-walk bars for tickers without a bar file.
    pub synthetic: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            bars_dir: PathBuf::new(),
            tickers: None,
            symbols: Vec::new(),
            fundamentals: None,
            company_info: None,
            quotes: None,
            history_bars: DEFAULT_HISTORY_BARS,
            synthetic: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub enabled: bool,
    pub initial_capital: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_capital: DEFAULT_CAPITAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub csv: bool,
    pub json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            csv: true,
            json: true,
        }
    }
}

/// Complete, reproducible description of a scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub data: DataConfig,
    pub indicators: IndicatorParams,
    pub classifier: ClassifierConfig,
    pub market: MarketContext,
    pub backtest: BacktestConfig,
    pub output: OutputConfig,
}

impl ScanConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check every section. Core sections reuse the core's own validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.indicators
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("indicators: {e}")))?;
        self.classifier
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("classifier: {e}")))?;

        if let Some(r) = self.market.benchmark_return_pct {
            if !r.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "market.benchmark_return_pct must be finite, got {r}"
                )));
            }
        }
        let capital = self.backtest.initial_capital;
        if !capital.is_finite() || capital <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "backtest.initial_capital must be finite and positive, got {capital}"
            )));
        }
        let history = self.data.history_bars;
        if history != 0 && history < self.indicators.required_bars() {
            return Err(ConfigError::Invalid(format!(
                "data.history_bars ({history}) is shorter than the {} bars the indicators need",
                self.indicators.required_bars()
            )));
        }
        if self.data.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid("data.symbols contains a blank ticker".into()));
        }
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the configuration.
    ///
    /// Two scans with identical configs share a hash, so exported artifacts
    /// can be matched to the settings that produced them.
    pub fn config_hash(&self) -> ConfigHash {
        // Plain structs of numbers, strings and paths; serialization cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
