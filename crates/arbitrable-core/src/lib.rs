#![deny(missing_docs)]

//! # arbitrable-core — Foundational Types for the Arbitrable Stack
//!
//! This crate defines the types that every other crate in the workspace
//! depends on. It has no internal crate dependencies; from the external
//! ecosystem it uses `serde`, `thiserror`, `chrono`, `sha2` and
//! `parking_lot`.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a
//!    distinct type. You cannot pass a [`RequestId`] where an [`ItemId`] is
//!    expected.
//!
//! 2. **Money never touches floating point.** [`Amount`] is a `u128` with
//!    checked arithmetic only, serialized as a decimal string. Fixed-point
//!    scaling goes through [`Multiplier`] and [`MULTIPLIER_DIVISOR`].
//!
//! 3. **Time is supplied by the host.** Deadlines compare against a
//!    [`Clock`]; nothing in the stack sleeps or reads wall time implicitly.
//!
//! 4. **[`ValidationError`] hierarchy.** Structured errors with `thiserror`.
//!    No `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod amount;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use amount::{Amount, Multiplier, MULTIPLIER_DIVISOR};
pub use digest::{sha256_digest, ContentDigest, DigestAlgorithm};
pub use error::ValidationError;
pub use identity::{Address, DisputeId, IdAllocator, ItemId, RequestId, RoundId, SequentialId};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
