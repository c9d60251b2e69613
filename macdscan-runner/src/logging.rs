//! Tracing subscriber setup for binaries.
//!
//! Filter comes from `RUST_LOG`, falling back to `info`. Logs go to stderr so
//! that command output on stdout stays machine-readable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, colored when stderr is a terminal.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(format: LogFormat) {
    init_with_default(format, "info");
}

/// Like [`init_logging`] with an explicit fallback level (`"debug"` for `-v`).
pub fn init_with_default(format: LogFormat, default_level: &str) {
    let registry = tracing_subscriber::registry().with(env_filter(default_level));
    let result = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };
    // already installed (tests, repeated calls)
    let _ = result;
}
