//! Error types for Trueno-Tracking
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trueno-Tracking error types
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing task address component (caller bug, not retried)
    #[error("Invalid address: {0}\nCheck job_id/component_name/task_id/task_version/role/party_id")]
    InvalidAddress(String),

    /// Malformed request payload (caller bug, not retried)
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A metric point that is not a `(key, value)` pair with a numeric or null value
    #[error("Invalid metric point at index {index}: {reason}")]
    InvalidMetricPoint {
        /// Position of the offending point in the submitted series
        index: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Backing persistence layer unreachable (transient, safe to retry)
    #[error(
        "Storage unavailable: {0}\nAll tracking writes are idempotent or append-only, \
         retrying is safe"
    )]
    StorageUnavailable(String),

    /// Stored document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration rejected by validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failed call may be retried unchanged.
    ///
    /// Only storage-layer failures are transient; validation failures will
    /// fail again with the same input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::Io(_))
    }

    /// Whether the error was caused by the caller's input.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress(_) | Self::InvalidPayload(_) | Self::InvalidMetricPoint { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::StorageUnavailable("down".into()).is_retryable());
        assert!(!Error::InvalidAddress("empty job_id".into()).is_retryable());
        assert!(!Error::Config("zero limit".into()).is_retryable());
    }

    #[test]
    fn test_caller_error_classification() {
        let point = Error::InvalidMetricPoint {
            index: 3,
            reason: "value is a string".into(),
        };
        assert!(point.is_caller_error());
        assert!(Error::InvalidPayload("x".into()).is_caller_error());
        assert!(!Error::StorageUnavailable("down".into()).is_caller_error());
    }
}
