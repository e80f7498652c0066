//! Tracking store configuration
//!
//! Loaded from JSON (string or file) or assembled through
//! [`crate::TrackingDb::builder`]. Every field has a default, so an empty
//! object `{}` is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default maximum number of points in one metric series
pub const DEFAULT_MAX_POINTS_PER_SERIES: usize = 100_000;

/// Default maximum encoded size of one metadata/summary document (4MB)
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 4 * 1024 * 1024;

/// Log level
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including per-key storage events
    Trace,
    /// Per-write events
    Debug,
    /// Lifecycle events (default)
    #[default]
    Info,
    /// Rejected requests
    Warn,
    /// Storage failures only
    Error,
}

impl LogLevel {
    /// Directive string understood by `EnvFilter`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, for development
    #[default]
    Pretty,
    /// Single-line, for production log collectors
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Level used when `RUST_LOG` is not set
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
}

/// Tracking store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackingConfig {
    /// Pre-allocated key capacity of the in-memory backend
    pub initial_capacity: usize,
    /// Maximum number of points accepted in one metric series
    pub max_points_per_series: usize,
    /// Maximum encoded size of one metadata, table-meta or summary document
    pub max_document_bytes: usize,
    /// Logging
    pub log: LogConfig,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            max_points_per_series: DEFAULT_MAX_POINTS_PER_SERIES,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            log: LogConfig::default(),
        }
    }
}

impl TrackingConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed JSON or invalid limits.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("failed to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, [`Error::Config`]
    /// if it is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Check that limits are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_points_per_series == 0 {
            return Err(Error::Config("max_points_per_series must be positive".into()));
        }
        if self.max_document_bytes == 0 {
            return Err(Error::Config("max_document_bytes must be positive".into()));
        }
        Ok(())
    }
}
