//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the Arbitrable
//! Stack. Each identifier is a distinct type: you cannot pass a
//! [`RequestId`] where an [`ItemId`] is expected.
//!
//! ## Allocation
//!
//! Numeric identifiers are opaque, assigned in strictly increasing order by
//! an [`IdAllocator`], and never reused. [`DisputeId`]s are assigned by the
//! arbitrator rather than by the stack, so they are only unique per
//! arbitrator.
//!
//! [`Address`] validates its format at construction time; it names an
//! account on the host ledger (requester, challenger, contributor,
//! arbitrator, governor).

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifiers assigned from a monotonically increasing counter.
pub trait SequentialId: Copy + Ord {
    /// Wrap a raw counter value.
    fn from_raw(raw: u64) -> Self;
    /// The raw counter value.
    fn raw(&self) -> u64;
}

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw identifier value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw identifier value.
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl SequentialId for $name {
            fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            fn raw(&self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

sequential_id!(
    /// Identifier of an item (registry entry, escrowed payment, task).
    ItemId,
    "item"
);

sequential_id!(
    /// Identifier of a status-change request on an item.
    RequestId,
    "request"
);

sequential_id!(
    /// Identifier of a dispute, assigned by the arbitrator that hosts it.
    DisputeId,
    "dispute"
);

/// Identifier of one funding round: the owning request plus the round's
/// position in that request's round sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundId {
    /// The request the round belongs to.
    pub request: RequestId,
    /// Zero-based position of the round within the request.
    pub index: u32,
}

impl RoundId {
    /// Create a round identifier.
    pub const fn new(request: RequestId, index: u32) -> Self {
        Self { request, index }
    }
}

impl std::fmt::Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/round:{}", self.request, self.index)
    }
}

/// Hands out identifiers in strictly increasing order, starting at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator<K> {
    next: u64,
    #[serde(skip)]
    _kind: PhantomData<K>,
}

impl<K: SequentialId> IdAllocator<K> {
    /// Create an allocator whose first identifier is zero.
    pub fn new() -> Self {
        Self {
            next: 0,
            _kind: PhantomData,
        }
    }

    /// Assign the next identifier.
    pub fn allocate(&mut self) -> K {
        let id = K::from_raw(self.next);
        self.next += 1;
        id
    }

    /// The identifier the next call to [`allocate`](Self::allocate) returns.
    pub fn peek(&self) -> K {
        K::from_raw(self.next)
    }

    /// Number of identifiers handed out so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

impl<K: SequentialId> Default for IdAllocator<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// An account on the host ledger.
///
/// Accepts 1-128 characters from `[A-Za-z0-9:_.-]`, which covers hex
/// addresses (`0xab12…`), DIDs (`did:key:z6Mk…`) and plain handles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Create a validated address.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAddress`] if the string is empty,
    /// longer than 128 characters, or contains other characters.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let valid_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '.' | '-');
        if s.is_empty() || s.len() > 128 || !s.chars().all(valid_char) {
            return Err(ValidationError::InvalidAddress(s));
        }
        Ok(Self(s))
    }

    /// Access the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_monotonic_from_zero() {
        let mut ids = IdAllocator::<ItemId>::new();
        assert_eq!(ids.peek(), ItemId::new(0));
        let a = ids.allocate();
        let b = ids.allocate();
        assert_eq!(a, ItemId::new(0));
        assert_eq!(b, ItemId::new(1));
        assert!(b > a);
        assert_eq!(ids.issued(), 2);
    }

    #[test]
    fn id_display_carries_kind_prefix() {
        assert_eq!(ItemId::new(3).to_string(), "item:3");
        assert_eq!(DisputeId::new(9).to_string(), "dispute:9");
        assert_eq!(
            RoundId::new(RequestId::new(4), 2).to_string(),
            "request:4/round:2"
        );
    }

    #[test]
    fn address_accepts_hex_and_did_forms() {
        assert!(Address::new("0xAbC123").is_ok());
        assert!(Address::new("did:key:z6MkRequester").is_ok());
        assert!(Address::new("alice.eth").is_ok());
    }

    #[test]
    fn address_rejects_bad_input() {
        assert!(Address::new("").is_err());
        assert!(Address::new("has space").is_err());
        assert!(Address::new("a".repeat(129)).is_err());
    }

    #[test]
    fn address_deserialization_validates() {
        let ok: Address = serde_json::from_str("\"0xabc\"").unwrap();
        assert_eq!(ok.as_str(), "0xabc");
        assert!(serde_json::from_str::<Address>("\"not valid\"").is_err());
    }
}
