//! Transfer status
//!
//! Stored as upper-case strings.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Lifecycle of a Hedera -> EVM transfer record
///
/// ```text
/// INITIAL ─▶ SIGNATURE_SUBMITTED ─▶ SIGNATURE_MINED
///    │
///    ├─▶ SCHEDULED_SUBMITTED ─▶ COMPLETED
///    │            └───────────▶ FAILED
///    └─▶ INSUFFICIENT_FEE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    Initial,
    SignatureSubmitted,
    SignatureMined,
    ScheduledSubmitted,
    Completed,
    Failed,
    /// Amount too small to cover the bridge fee
    InsufficientFee,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown transfer status: {0}")]
pub struct UnknownStatus(pub String);

impl TransferStatus {
    /// No further updates are accepted in a terminal status
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Completed
                | TransferStatus::Failed
                | TransferStatus::InsufficientFee
                | TransferStatus::SignatureMined
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Initial => "INITIAL",
            TransferStatus::SignatureSubmitted => "SIGNATURE_SUBMITTED",
            TransferStatus::SignatureMined => "SIGNATURE_MINED",
            TransferStatus::ScheduledSubmitted => "SCHEDULED_SUBMITTED",
            TransferStatus::Completed => "COMPLETED",
            TransferStatus::Failed => "FAILED",
            TransferStatus::InsufficientFee => "INSUFFICIENT_FEE",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIAL" => Ok(TransferStatus::Initial),
            "SIGNATURE_SUBMITTED" => Ok(TransferStatus::SignatureSubmitted),
            "SIGNATURE_MINED" => Ok(TransferStatus::SignatureMined),
            "SCHEDULED_SUBMITTED" => Ok(TransferStatus::ScheduledSubmitted),
            "COMPLETED" => Ok(TransferStatus::Completed),
            "FAILED" => Ok(TransferStatus::Failed),
            "INSUFFICIENT_FEE" => Ok(TransferStatus::InsufficientFee),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());
        assert!(TransferStatus::InsufficientFee.is_terminal());
        assert!(TransferStatus::SignatureMined.is_terminal());

        assert!(!TransferStatus::Initial.is_terminal());
        assert!(!TransferStatus::SignatureSubmitted.is_terminal());
        assert!(!TransferStatus::ScheduledSubmitted.is_terminal());
    }

    #[test]
    fn test_parse_display() {
        for status in [
            TransferStatus::Initial,
            TransferStatus::SignatureSubmitted,
            TransferStatus::SignatureMined,
            TransferStatus::ScheduledSubmitted,
            TransferStatus::Completed,
            TransferStatus::Failed,
            TransferStatus::InsufficientFee,
        ] {
            assert_eq!(status.to_string().parse::<TransferStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_status() {
        assert_eq!(
            "DONE".parse::<TransferStatus>(),
            Err(UnknownStatus("DONE".into()))
        );
        assert!("completed".parse::<TransferStatus>().is_err());
    }
}
