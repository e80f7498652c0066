//! Uniform response envelope

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Result code carried by every [`Envelope`].
///
/// "No data found" is never a code: it is [`RetCode::Success`] with an empty
/// or absent payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum RetCode {
    /// Call succeeded (including empty reads)
    Success,
    /// Unexpected internal failure
    Internal,
    /// Malformed or missing address component
    InvalidAddress,
    /// Malformed payload
    InvalidPayload,
    /// Backing storage unreachable; retry is safe
    StorageUnavailable,
}

impl RetCode {
    /// Numeric wire code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Success => 0,
            Self::Internal => 100,
            Self::InvalidAddress => 101,
            Self::InvalidPayload => 102,
            Self::StorageUnavailable => 103,
        }
    }
}

impl From<RetCode> for u16 {
    fn from(code: RetCode) -> Self {
        code.code()
    }
}

/// Unknown numeric result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownRetCode(pub u16);

impl fmt::Display for UnknownRetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown retcode {}", self.0)
    }
}

impl TryFrom<u16> for RetCode {
    type Error = UnknownRetCode;

    fn try_from(code: u16) -> std::result::Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Success),
            100 => Ok(Self::Internal),
            101 => Ok(Self::InvalidAddress),
            102 => Ok(Self::InvalidPayload),
            103 => Ok(Self::StorageUnavailable),
            other => Err(UnknownRetCode(other)),
        }
    }
}

impl From<&Error> for RetCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::InvalidAddress(_) => Self::InvalidAddress,
            Error::InvalidPayload(_) | Error::InvalidMetricPoint { .. } => Self::InvalidPayload,
            Error::StorageUnavailable(_) | Error::Io(_) => Self::StorageUnavailable,
            Error::Serialization(_) | Error::Config(_) => Self::Internal,
        }
    }
}

/// Success/failure envelope returned by every [`super::Tracker`] operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Result code
    pub retcode: RetCode,
    /// Human-readable message
    pub retmsg: String,
    /// Payload; `None` for writes and failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Successful envelope carrying `data`.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            retcode: RetCode::Success,
            retmsg: "success".to_string(),
            data: Some(data),
        }
    }

    /// Failed envelope for `error`.
    #[must_use]
    pub fn error(error: &Error) -> Self {
        Self {
            retcode: RetCode::from(error),
            retmsg: error.to_string(),
            data: None,
        }
    }

    /// Whether the call succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.retcode == RetCode::Success
    }
}

impl Envelope<()> {
    /// Successful envelope without payload.
    #[must_use]
    pub fn done() -> Self {
        Self {
            retcode: RetCode::Success,
            retmsg: "success".to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retcode_round_trip() {
        for code in [
            RetCode::Success,
            RetCode::Internal,
            RetCode::InvalidAddress,
            RetCode::InvalidPayload,
            RetCode::StorageUnavailable,
        ] {
            assert_eq!(RetCode::try_from(code.code()), Ok(code));
        }
        assert_eq!(RetCode::try_from(7), Err(UnknownRetCode(7)));
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(RetCode::from(&Error::InvalidAddress("x".into())), RetCode::InvalidAddress);
        assert_eq!(
            RetCode::from(&Error::InvalidMetricPoint { index: 0, reason: "x".into() }),
            RetCode::InvalidPayload
        );
        assert_eq!(
            RetCode::from(&Error::StorageUnavailable("x".into())),
            RetCode::StorageUnavailable
        );
    }

    #[test]
    fn test_envelope_wire_shape() {
        let empty: Envelope<Vec<u8>> = Envelope::ok(Vec::new());
        assert_eq!(
            serde_json::to_value(&empty).unwrap(),
            json!({"retcode": 0, "retmsg": "success", "data": []})
        );

        let done = serde_json::to_value(Envelope::done()).unwrap();
        assert_eq!(done, json!({"retcode": 0, "retmsg": "success"}));

        let failed: Envelope<()> = Envelope::error(&Error::InvalidPayload("bad".into()));
        assert!(!failed.is_success());
        assert_eq!(serde_json::to_value(&failed).unwrap()["retcode"], json!(102));
    }
}
