//! # Escrowed Payments
//!
//! A payment held for a receiver. The receiver claims release by opening a
//! registration request; the sender contests by challenging it. An accepted
//! claim releases the payment, a refused one reimburses the sender.
//!
//! Only one claim is ever made per payment: once settled, the outcome is
//! final and clearing requests are not offered.
//!
//! This module tracks the decision, not custody of the payment itself.

use arbitrable_core::{Address, Amount, ItemId, RequestId};
use arbitrable_engine::{Arbitrable, ItemPayload, ItemStatus, PayloadError, Submission};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DomainError;

const DOMAIN: &str = "escrow";

/// Terms of an escrowed payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowPayment {
    /// Who funded the payment.
    pub sender: Address,
    /// Who receives it on release.
    pub receiver: Address,
    /// Amount in escrow.
    pub amount: Amount,
    /// URI of the agreement both parties signed.
    pub terms_uri: String,
    /// Sender-chosen reference, unique per sender.
    pub reference: String,
}

fn escrow_key(sender: &Address, reference: &str) -> String {
    format!("escrow:{}:{reference}", sender.as_str().to_ascii_lowercase())
}

impl ItemPayload for EscrowPayment {
    fn key(&self) -> String {
        escrow_key(&self.sender, &self.reference)
    }

    fn validate(&self) -> Result<(), PayloadError> {
        if self.sender.as_str().eq_ignore_ascii_case(self.receiver.as_str()) {
            return Err(PayloadError::new("receiver", "must differ from sender"));
        }
        if self.amount.is_zero() {
            return Err(PayloadError::new("amount", "must be positive"));
        }
        if self.reference.trim().is_empty() {
            return Err(PayloadError::new("reference", "must not be empty"));
        }
        Ok(())
    }
}

/// How a payment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowOutcome {
    /// Paid out to the receiver.
    Released,
    /// Returned to the sender.
    Reimbursed,
}

/// Escrow claims over any [`Arbitrable`] engine.
#[derive(Debug)]
pub struct EscrowBook<R> {
    engine: R,
}

impl<R> EscrowBook<R>
where
    R: Arbitrable<Payload = EscrowPayment>,
{
    /// Wrap an engine.
    pub fn new(engine: R) -> Self {
        Self { engine }
    }

    /// The receiver claims release of `payment`.
    ///
    /// # Errors
    ///
    /// [`DomainError::WrongParty`] if `caller` is not the receiver and
    /// [`DomainError::Unsupported`] if a claim was already made.
    pub fn claim_release(
        &mut self,
        caller: &Address,
        payment: EscrowPayment,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, DomainError> {
        if caller != &payment.receiver {
            return Err(DomainError::WrongParty {
                caller: caller.clone(),
                role: "receiver",
                target: payment.key(),
            });
        }
        if self.engine.item_for_key(&payment.key()).is_some() {
            return Err(DomainError::Unsupported {
                domain: DOMAIN,
                operation: "a second release claim",
            });
        }
        let amount = payment.amount;
        let submission = self.engine.submit(caller, payment, deposit, evidence)?;
        info!(item = %submission.item, amount = %amount, "escrow release claimed");
        Ok(submission)
    }

    /// The sender contests a pending release claim.
    ///
    /// # Errors
    ///
    /// [`DomainError::WrongParty`] if `caller` is not the sender,
    /// [`DomainError::NoActiveRequest`] if the claim already settled, and
    /// [`DomainError::Engine`] for an unknown item, an underpaid deposit, a
    /// closed challenge window or an arbitrator failure.
    pub fn contest(
        &mut self,
        caller: &Address,
        item: ItemId,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<RequestId, DomainError> {
        let payment = self.engine.payload_of(item)?;
        if caller != &payment.sender {
            return Err(DomainError::WrongParty {
                caller: caller.clone(),
                role: "sender",
                target: item.to_string(),
            });
        }
        let request = self
            .engine
            .active_request(item)?
            .ok_or(DomainError::NoActiveRequest(item))?;
        self.engine.challenge(caller, request, deposit, evidence)?;
        Ok(request)
    }

    /// Resolve the pending claim and report the outcome.
    pub fn settle(&mut self, item: ItemId) -> Result<EscrowOutcome, DomainError> {
        let request = self
            .engine
            .active_request(item)?
            .ok_or(DomainError::NoActiveRequest(item))?;
        let resolution = self.engine.execute(request)?;
        let outcome = match resolution.status {
            ItemStatus::Registered => EscrowOutcome::Released,
            _ => EscrowOutcome::Reimbursed,
        };
        info!(item = %item, ruling = %resolution.ruling, outcome = ?outcome, "escrow settled");
        Ok(outcome)
    }

    /// The outcome of a settled payment; `None` while a claim is pending.
    pub fn outcome(&self, item: ItemId) -> Result<Option<EscrowOutcome>, DomainError> {
        Ok(match self.engine.status_of(item)? {
            ItemStatus::Registered => Some(EscrowOutcome::Released),
            ItemStatus::Absent => Some(EscrowOutcome::Reimbursed),
            ItemStatus::Requested(_) => None,
        })
    }

    /// Escrow payments are never reopened.
    pub fn request_clearing(&mut self, _item: ItemId) -> Result<Submission, DomainError> {
        Err(DomainError::Unsupported {
            domain: DOMAIN,
            operation: "clearing requests",
        })
    }

    /// Find a payment by sender and reference.
    pub fn find(&self, sender: &Address, reference: &str) -> Option<ItemId> {
        self.engine.item_for_key(&escrow_key(sender, reference))
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &R {
        &self.engine
    }

    /// Mutable access to the wrapped engine.
    pub fn engine_mut(&mut self) -> &mut R {
        &mut self.engine
    }
}
