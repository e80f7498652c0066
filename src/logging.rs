//! Structured logging setup
//!
//! The library itself only emits `tracing` events; embedding services call
//! [`init_logging`] once at startup to print them.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogConfig, LogFormat};
use crate::{Error, Result};

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. Calling this when a global
/// subscriber is already in place is a no-op, whoever installed it.
///
/// # Errors
///
/// Returns [`Error::Config`] if another thread installs a subscriber between
/// the check and our own install.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        tracing::debug!("global subscriber already installed, keeping it");
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    };
    result.map_err(|e| Error::Config(format!("failed to install log subscriber: {e}")))
}
