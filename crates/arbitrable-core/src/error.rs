//! # Validation Errors
//!
//! Structured errors for the domain primitives defined in this crate.
//! Each variant carries the rejected input so operators can diagnose
//! misconfiguration without guesswork.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Address is empty, too long, or contains characters outside
    /// `[A-Za-z0-9:_.-]`.
    #[error("invalid address: \"{0}\" (expected 1-128 characters from [A-Za-z0-9:_.-])")]
    InvalidAddress(String),

    /// Amount string is not a non-negative integer that fits in 128 bits.
    #[error("invalid amount: \"{0}\" (expected a non-negative integer)")]
    InvalidAmount(String),

    /// Duration is outside the accepted range.
    #[error("invalid duration for {field}: {seconds}s ({reason})")]
    InvalidDuration {
        /// The configuration field that carried the duration.
        field: String,
        /// The rejected value in seconds.
        seconds: u64,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_address_display() {
        let err = ValidationError::InvalidAddress("bad address".to_string());
        let msg = format!("{err}");
        assert!(msg.contains("bad address"));
        assert!(msg.contains("1-128"));
    }

    #[test]
    fn invalid_amount_display() {
        let err = ValidationError::InvalidAmount("-1".to_string());
        assert!(format!("{err}").contains("-1"));
    }

    #[test]
    fn invalid_duration_display() {
        let err = ValidationError::InvalidDuration {
            field: "challenge_period_secs".to_string(),
            seconds: 0,
            reason: "must be positive".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("challenge_period_secs"));
        assert!(msg.contains("must be positive"));
    }
}
