//! Root error type for the SHURIUM consensus core.
//!
//! Mirrors the subsystem-wrapping shape used throughout this codebase:
//! each module owns a focused `thiserror::Error` enum, and `ShuriumError`
//! wraps the handful that cross module boundaries via `#[from]`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::consensus::pouw::PouwError;
use crate::ubi::claim::ClaimError;
use crate::ubi::distributor::PoolError;
use crate::verify::VerifyError;

/// Root error type for the consensus core.
#[derive(Debug, Error)]
pub enum ShuriumError {
    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Useful-work commitment/solution errors.
    #[error("pouw error: {0}")]
    Pouw(#[from] PouwError),

    /// Solution verification registry errors.
    #[error("verify error: {0}")]
    Verify(#[from] VerifyError),

    /// UBI claim structural errors.
    #[error("claim error: {0}")]
    Claim(#[from] ClaimError),

    /// UBI pool/distributor errors.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// Invariant breach: a condition the spec says must never happen in a
    /// well-behaved process. Fatal; callers must stop rather than proceed.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// IO errors (persistence load/save, etc).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShuriumError {
    /// Construct an invariant-violation error.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Stable error code for structured logging / API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            ShuriumError::Config(_) => "CONFIG_ERROR",
            ShuriumError::Pouw(_) => "POUW_ERROR",
            ShuriumError::Verify(_) => "VERIFY_ERROR",
            ShuriumError::Claim(_) => "CLAIM_ERROR",
            ShuriumError::Pool(_) => "POOL_ERROR",
            ShuriumError::Invariant(_) => "INVARIANT_VIOLATION",
            ShuriumError::Io(_) => "IO_ERROR",
        }
    }

    /// Invariant breaches are fatal; everything else is a structural or
    /// policy error that the caller can recover from (per spec.md §7).
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShuriumError::Invariant(_))
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ShuriumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_errors_are_fatal() {
        let err = ShuriumError::invariant("pool reappeared after pruning");
        assert!(err.is_fatal());
        assert_eq!(err.error_code(), "INVARIANT_VIOLATION");
    }

    #[test]
    fn other_errors_are_not_fatal() {
        let err = ShuriumError::Claim(ClaimError::TooShort);
        assert!(!err.is_fatal());
    }
}
