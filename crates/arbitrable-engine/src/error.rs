//! # Engine Error Types
//!
//! Structured error hierarchy for the arbitrable engine. Every variant
//! carries diagnostic context: the operation that failed, the identifiers
//! involved, and the amounts or deadlines that caused the rejection.
//!
//! ## Atomicity
//!
//! Returning any of these errors means the operation committed nothing:
//! no contribution, no status change, no vault movement, no event. Callers
//! may retry with corrected inputs; the engine never retries internally.

use arbitrable_core::{Address, Amount, Timestamp};
use thiserror::Error;

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::registry::PayloadError;

/// Errors arising from engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The value attached to the call is below the required minimum.
    #[error("insufficient funds for {operation}: {required} required, {provided} provided")]
    InsufficientFunds {
        /// The attempted operation.
        operation: String,
        /// The minimum amount the operation requires.
        required: Amount,
        /// The amount attached to the call.
        provided: Amount,
    },

    /// The target is in the wrong status or phase for the operation.
    #[error("invalid state for {operation}: {reason}")]
    InvalidState {
        /// The attempted operation.
        operation: String,
        /// Why the current state rejects it.
        reason: String,
    },

    /// The caller is not allowed to perform the operation.
    #[error("{caller} is not authorized to {operation}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// The attempted operation.
        operation: String,
    },

    /// The window for the operation closed.
    #[error("deadline for {operation} passed at {deadline}")]
    DeadlinePassed {
        /// The attempted operation.
        operation: String,
        /// When the window closed.
        deadline: Timestamp,
    },

    /// The operation may only run after a deadline that has not arrived.
    #[error("{operation} is not available before {deadline}")]
    DeadlineNotReached {
        /// The attempted operation.
        operation: String,
        /// When the operation becomes available.
        deadline: Timestamp,
    },

    /// The target has already reached a final outcome.
    #[error("{target} is already resolved")]
    AlreadyResolved {
        /// Display form of the resolved target.
        target: String,
    },

    /// The request already has a challenger.
    #[error("{request} has already been challenged")]
    AlreadyChallenged {
        /// Display form of the request identifier.
        request: String,
    },

    /// No record exists for the identifier.
    #[error("unknown {kind}: {id}")]
    UnknownId {
        /// The kind of identifier ("item", "request", "round", "dispute").
        kind: String,
        /// Display form of the identifier.
        id: String,
    },

    /// An arithmetic step overflowed or underflowed.
    #[error("arithmetic overflow while computing {0}")]
    Overflow(String),

    /// A payout would exceed the funds held in custody.
    #[error("vault cannot disburse {requested}: only {held} held")]
    Insolvent {
        /// The amount that was about to be disbursed.
        requested: Amount,
        /// The amount currently in custody.
        held: Amount,
    },

    /// The arbitrator rejected or failed an outbound call.
    #[error("arbitrator gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The item payload failed domain validation.
    #[error("invalid item payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    /// The engine configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub(crate) fn invalid_state(operation: &str, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown(kind: &str, id: impl std::fmt::Display) -> Self {
        Self::UnknownId {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn overflow(what: &str) -> Self {
        Self::Overflow(what.to_string())
    }
}
