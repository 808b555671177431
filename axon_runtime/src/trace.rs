//! Tracing bootstrap for runtime applications.
//!
//! Libraries only emit `tracing` events; installing a subscriber is the
//! application's job. These helpers wrap the standard `fmt` subscriber
//! with an `EnvFilter`, so `RUST_LOG` directives still override the
//! configured default level.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Install a human-readable subscriber at the given default level.
///
/// # Panics
/// Panics if a global subscriber is already installed.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::from_default_env().add_directive(Level::from(level).into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Install a JSON-lines subscriber at the given default level, for
/// deployments that ship logs to a collector.
///
/// # Panics
/// Panics if a global subscriber is already installed.
pub fn init_json(level: LogLevel) {
    let filter = EnvFilter::from_default_env().add_directive(Level::from(level).into());
    tracing_subscriber::fmt().with_env_filter(filter).json().init();
}
