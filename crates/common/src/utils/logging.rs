//! Tracing subscriber setup for the faucet binary.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// HTTP plumbing that is noisy at `debug`; operators can still override via `RUST_LOG`.
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "reqwest=warn", "h2=warn"];

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    InvalidFilter(#[from] ParseError),

    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Output shape of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event, for log shippers.
    Json,
    #[default]
    Pretty,
    Compact,
}

/// The `[logging]` section of the faucet config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level or directive list, e.g. `info` or `info,faucet_service=debug`.
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
    /// Colored output; turn off when stdout is a file.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_target: true,
            ansi: true,
        }
    }
}

/// Install the global tracing subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(filter_directives(config, std::env::var("RUST_LOG").ok()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_target)
        .with_ansi(config.ansi);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    installed.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::info!("Logging initialized (level {}, {:?})", config.level, config.format);
    Ok(())
}

/// Configured level, then dependency quieting, then `RUST_LOG`; later directives win.
fn filter_directives(config: &LoggingConfig, rust_log: Option<String>) -> String {
    let mut directives = vec![config.level.trim().to_string()];
    directives.extend(QUIET_DEPENDENCIES.iter().map(|d| d.to_string()));
    if let Some(extra) = rust_log.filter(|v| !v.trim().is_empty()) {
        directives.push(extra);
    }
    directives.join(",")
}

/// Route events to the test harness writer. Safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .with_target(false)
        .try_init();
}
