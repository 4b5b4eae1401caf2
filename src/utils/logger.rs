//! Logging setup
//!
//! Logs go to stderr; stdout carries the worker protocol.

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Pick the worker's log level: an explicit name wins, then the debug flag
pub fn log_level(name: Option<&str>, debug: bool) -> Result<Level> {
    match name {
        Some(name) => name
            .parse()
            .with_context(|| format!("Unknown log level: {name}")),
        None if debug => Ok(Level::DEBUG),
        None => Ok(Level::INFO),
    }
}

/// Install the global subscriber; `RUST_LOG` takes precedence over `level`
pub fn init_logger(level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("nitra_worker={}", level.as_str().to_lowercase()))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
