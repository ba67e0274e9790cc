//! # Domain Error Types

use arbitrable_core::{Address, ItemId};
use arbitrable_engine::EngineError;
use thiserror::Error;

/// Errors raised by the domain facades.
#[derive(Error, Debug)]
pub enum DomainError {
    /// The underlying engine rejected the operation.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The caller does not hold the role the operation requires.
    #[error("{caller} is not the {role} of {target}")]
    WrongParty {
        /// The rejected caller.
        caller: Address,
        /// The role the operation requires ("sender", "receiver", ...).
        role: &'static str,
        /// Display form of the item or payload key.
        target: String,
    },

    /// The item has no unresolved request to act on.
    #[error("{0} has no active request")]
    NoActiveRequest(ItemId),

    /// The domain does not allow the operation.
    #[error("{domain} does not support {operation}")]
    Unsupported {
        /// The domain.
        domain: &'static str,
        /// The rejected operation.
        operation: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_party_display() {
        let err = DomainError::WrongParty {
            caller: Address::new("mallory").unwrap(),
            role: "receiver",
            target: "item:3".to_string(),
        };
        assert_eq!(err.to_string(), "mallory is not the receiver of item:3");
    }

    #[test]
    fn engine_error_is_transparent() {
        let inner = EngineError::UnknownId {
            kind: "item".to_string(),
            id: "item:9".to_string(),
        };
        let err: DomainError = inner.into();
        assert_eq!(err.to_string(), "unknown item: item:9");
    }
}
