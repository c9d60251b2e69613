//! macdscan runner: batch scanning on top of `macdscan-core`.
//!
//! - TOML scan configuration with a content hash
//! - Ticker list, bar CSV, fundamentals and company-info loading
//! - Parallel per-ticker scan with failure isolation
//! - CSV and JSON export
//! - Tracing subscriber setup for binaries

pub mod config;
pub mod data_loader;
pub mod export;
pub mod logging;
pub mod scan;

pub use config::{ConfigError, ScanConfig};
pub use data_loader::{generate_synthetic_bars, load_bars, DataSource, LoadError};
pub use export::{export_csv, export_json, save_artifacts};
pub use logging::{init_logging, LogFormat};
pub use scan::{run_scan, ScanInputs, ScanReport, ScanRow, SCHEMA_VERSION};
