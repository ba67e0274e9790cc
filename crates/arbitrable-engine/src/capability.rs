//! # Arbitrable Capability
//!
//! The single interface every domain builds on. [`Engine`](crate::Engine)
//! implements it directly and [`SharedEngine`](crate::SharedEngine)
//! implements it behind a lock, so a domain facade written against
//! [`Arbitrable`] works with either.

use arbitrable_core::{Address, Amount, DisputeId, ItemId, RequestId, RoundId};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::gateway::Ruling;
use crate::registry::{ItemPayload, ItemStatus};
use crate::request::RequestKind;
use crate::round::Party;

/// Outcome of opening a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// The item the request targets.
    pub item: ItemId,
    /// The new request.
    pub request: RequestId,
    /// What the request asks for.
    pub kind: RequestKind,
    /// The deposit held in round 0.
    pub deposit: Amount,
}

/// Outcome of an appeal contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingReceipt {
    /// The round funded.
    pub round: RoundId,
    /// The side funded.
    pub party: Party,
    /// Amount kept by the round.
    pub accepted: Amount,
    /// Amount returned to the caller in the same call.
    pub refunded: Amount,
    /// Whether the side is now fully paid.
    pub fully_paid: bool,
    /// Whether this contribution raised the appeal.
    pub appeal_raised: bool,
}

/// Final outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// The resolved request.
    pub request: RequestId,
    /// The final ruling.
    pub ruling: Ruling,
    /// The item's status afterwards.
    pub status: ItemStatus,
}

/// Submit, challenge, fund, rule, execute and withdraw on arbitrable items.
pub trait Arbitrable {
    /// The domain payload.
    type Payload: ItemPayload;

    /// Open a request for `payload`, creating its item on first use.
    fn submit(
        &mut self,
        requester: &Address,
        payload: Self::Payload,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, EngineError>;

    /// Open a request on an existing item.
    fn request_change(
        &mut self,
        requester: &Address,
        item: ItemId,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, EngineError>;

    /// Challenge a request, opening a dispute.
    fn challenge(
        &mut self,
        challenger: &Address,
        request: RequestId,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<DisputeId, EngineError>;

    /// Contribute to one side of an appeal.
    fn fund_appeal(
        &mut self,
        contributor: &Address,
        round: RoundId,
        party: Party,
        amount: Amount,
    ) -> Result<FundingReceipt, EngineError>;

    /// Deliver an arbitrator ruling.
    fn rule(&mut self, caller: &Address, dispute: DisputeId, ruling: Ruling)
        -> Result<(), EngineError>;

    /// Resolve a request whose deadline passed.
    fn execute(&mut self, request: RequestId) -> Result<Resolution, EngineError>;

    /// Withdraw a beneficiary's entitlement from one round.
    fn withdraw(
        &mut self,
        beneficiary: &Address,
        item: ItemId,
        round: RoundId,
    ) -> Result<Amount, EngineError>;

    /// Current status of an item.
    fn status_of(&self, item: ItemId) -> Result<ItemStatus, EngineError>;

    /// A copy of an item's payload.
    fn payload_of(&self, item: ItemId) -> Result<Self::Payload, EngineError>;

    /// The unresolved request on an item, if any.
    fn active_request(&self, item: ItemId) -> Result<Option<RequestId>, EngineError>;

    /// The item whose payload has `key`, if one was ever submitted.
    fn item_for_key(&self, key: &str) -> Option<ItemId>;
}
