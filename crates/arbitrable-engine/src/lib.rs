#![deny(missing_docs)]

//! # arbitrable-engine — Dispute-Bound Decision Engine
//!
//! A generic engine for items whose status changes can be challenged,
//! escalated to an external arbitrator, appealed through crowdfunded
//! rounds, and resolved with funds paid to whoever backed the winning
//! outcome.
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`gateway`] | Typed boundary to the arbitrator |
//! | [`round`] | Per-round contribution ledger and the funding race |
//! | [`request`] | Request lifecycle, deposits, snapshotted terms |
//! | [`registry`] | Item identity, key index and status |
//! | [`distributor`] | Payout policies and pull withdrawals |
//! | [`clock`] | Challenge and appeal windows |
//! | [`vault`] | Custody accounting |
//! | [`events`] | Sequenced event log |
//! | [`engine`] | Orchestration with all-or-nothing operations |
//! | [`shared`] | Lock-serialized multi-thread handle |
//!
//! ## Flow
//!
//! ```text
//! submit ──▶ challenge window ──(no challenge)──▶ execute_request
//!               │
//!           challenge ──▶ create_dispute ──▶ rule ──▶ appeal funding
//!                                             ▲            │
//!                                             └─ appeal ◀──┤ both sides paid
//!                                                          │
//!                                                   execute_ruling
//!                                                          │
//!                                                      withdraw
//! ```
//!
//! The engine never blocks: rulings arrive as explicit calls, deadlines are
//! comparisons against a host-supplied [`Clock`](arbitrable_core::Clock),
//! and funds leave only as refunds to the immediate caller or as pull-based
//! withdrawals.

pub mod capability;
pub mod clock;
pub mod config;
pub mod distributor;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;
pub mod mock;
pub mod registry;
pub mod request;
pub mod round;
pub mod shared;
pub mod vault;

pub use capability::{Arbitrable, FundingReceipt, Resolution, Submission};
pub use clock::{AppealWindow, ChallengeWindow};
pub use config::{ConfigError, EngineConfig, GovernanceParams, StakeMultipliers};
pub use distributor::Payout;
pub use engine::{Engine, MetaEvidence};
pub use error::EngineError;
pub use events::{EngineEvent, EventLog, EventRecord, Evidence};
pub use gateway::{ArbitratorGateway, GatewayError, Ruling, RULING_OPTIONS};
pub use mock::{DisputeRecord, ManualArbitrator};
pub use registry::{Item, ItemPage, ItemPayload, ItemRegistry, ItemStatus, PayloadError};
pub use request::{Request, RequestKind, RequestTerms};
pub use round::{Party, PartyAmounts, PartyFlags, Round, RulingRecord, Standing};
pub use shared::SharedEngine;
pub use vault::{Vault, VaultTotals};
