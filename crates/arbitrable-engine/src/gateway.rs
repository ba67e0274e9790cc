//! # Arbitrator Gateway
//!
//! The typed boundary between the engine and an external arbitrator. The
//! arbitrator's ruling algorithm is out of scope; the engine only needs to
//! price disputes and appeals, open them, and pay for them.
//!
//! Rulings travel the other way as an explicit message: the host calls
//! [`Engine::rule`](crate::Engine::rule) with the arbitrator as caller and
//! the [`DisputeId`] as correlation id. The engine never blocks waiting for
//! one.

use arbitrable_core::{Address, Amount, DisputeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::round::Party;

/// Number of ruling options offered to the arbitrator (Accept, Refuse).
pub const RULING_OPTIONS: u8 = 2;

/// A ruling issued by the arbitrator.
///
/// Encoded on the wire as `0 = Other`, `1 = Accept`, `2 = Refuse`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ruling {
    /// No decision; the arbitrator refused to arbitrate.
    #[default]
    Other,
    /// The request is accepted; the requester wins.
    Accept,
    /// The request is refused; the challenger wins.
    Refuse,
}

impl Ruling {
    /// Decode an arbitrator ruling code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Other),
            1 => Some(Self::Accept),
            2 => Some(Self::Refuse),
            _ => None,
        }
    }

    /// The wire code of this ruling.
    pub fn code(&self) -> u8 {
        match self {
            Self::Other => 0,
            Self::Accept => 1,
            Self::Refuse => 2,
        }
    }

    /// The party this ruling favors, or [`Party::None`].
    pub fn favored(&self) -> Party {
        match self {
            Self::Other => Party::None,
            Self::Accept => Party::Requester,
            Self::Refuse => Party::Challenger,
        }
    }

    /// The ruling that favors `party`.
    pub fn favoring(party: Party) -> Self {
        match party {
            Party::None => Self::Other,
            Party::Requester => Self::Accept,
            Party::Challenger => Self::Refuse,
        }
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Other => "OTHER",
            Self::Accept => "ACCEPT",
            Self::Refuse => "REFUSE",
        }
    }
}

impl std::fmt::Display for Ruling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors reported by an arbitrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The arbitrator could not be reached or refused the call.
    #[error("arbitrator unavailable: {0}")]
    Unavailable(String),

    /// The fee attached to the call does not cover the arbitrator's price.
    #[error("arbitrator requires {required}, got {provided}")]
    InsufficientFee {
        /// The arbitrator's price.
        required: Amount,
        /// The fee the engine attached.
        provided: Amount,
    },

    /// The arbitrator has no record of the dispute.
    #[error("arbitrator does not know {0}")]
    UnknownDispute(DisputeId),

    /// The dispute cannot be appealed in its current state.
    #[error("{0} is not appealable")]
    NotAppealable(DisputeId),
}

/// Outbound calls the engine makes to an arbitrator.
///
/// Mutating calls carry the fee the engine pays out of pooled deposits. An
/// implementation must either accept the call with that fee or return an
/// error; the engine treats an error as "nothing happened" and aborts the
/// whole operation.
pub trait ArbitratorGateway: Send {
    /// The arbitrator's address. Only this address may deliver rulings.
    fn address(&self) -> &Address;

    /// Price of opening a dispute.
    fn dispute_cost(&self, extra_data: &[u8]) -> Result<Amount, GatewayError>;

    /// Open a dispute with `choices` ruling options, paying `fee`.
    fn create_dispute(
        &mut self,
        choices: u8,
        extra_data: &[u8],
        fee: Amount,
    ) -> Result<DisputeId, GatewayError>;

    /// Price of appealing the current ruling of `dispute_id`.
    fn appeal_cost(&self, dispute_id: DisputeId, extra_data: &[u8])
        -> Result<Amount, GatewayError>;

    /// Appeal the current ruling of `dispute_id`, paying `fee`.
    fn appeal(
        &mut self,
        dispute_id: DisputeId,
        extra_data: &[u8],
        fee: Amount,
    ) -> Result<(), GatewayError>;
}
