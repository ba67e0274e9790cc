//! # Address List
//!
//! A curated allow-list of ledger addresses, each with an optional label.
//! One entry per address, case-insensitive.

use arbitrable_core::{Address, Amount, ItemId, RequestId};
use arbitrable_engine::{
    Arbitrable, EngineError, ItemPayload, ItemStatus, PayloadError, Submission,
};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const MAX_LABEL_LEN: usize = 80;

/// An address entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
    /// The listed address.
    pub address: Address,
    /// Optional display label.
    #[serde(default)]
    pub label: Option<String>,
}

fn address_key(address: &Address) -> String {
    format!("address:{}", address.as_str().to_ascii_lowercase())
}

impl ItemPayload for AddressEntry {
    fn key(&self) -> String {
        address_key(&self.address)
    }

    fn validate(&self) -> Result<(), PayloadError> {
        match &self.label {
            Some(label) if label.trim().is_empty() => {
                Err(PayloadError::new("label", "must not be blank when present"))
            }
            Some(label) if label.chars().count() > MAX_LABEL_LEN => Err(PayloadError::new(
                "label",
                format!("must not exceed {MAX_LABEL_LEN} characters"),
            )),
            _ => Ok(()),
        }
    }
}

/// An allow-list of addresses over any [`Arbitrable`] engine.
#[derive(Debug)]
pub struct AddressList<R> {
    engine: R,
}

impl<R> AddressList<R>
where
    R: Arbitrable<Payload = AddressEntry>,
{
    /// Wrap an engine.
    pub fn new(engine: R) -> Self {
        Self { engine }
    }

    /// Request that `entry` be added, or removed if it is already listed.
    pub fn submit(
        &mut self,
        requester: &Address,
        entry: AddressEntry,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, DomainError> {
        Ok(self.engine.submit(requester, entry, deposit, evidence)?)
    }

    /// Challenge the pending request on an address.
    pub fn challenge(
        &mut self,
        challenger: &Address,
        address: &Address,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<RequestId, DomainError> {
        let item = self.item_of(address)?;
        let request = self
            .engine
            .active_request(item)?
            .ok_or(DomainError::NoActiveRequest(item))?;
        self.engine
            .challenge(challenger, request, deposit, evidence)?;
        Ok(request)
    }

    /// Whether `address` is currently on the list.
    pub fn is_registered(&self, address: &Address) -> bool {
        self.engine
            .item_for_key(&address_key(address))
            .and_then(|item| self.engine.status_of(item).ok())
            == Some(ItemStatus::Registered)
    }

    /// The item tracking `address`.
    pub fn item_of(&self, address: &Address) -> Result<ItemId, DomainError> {
        self.engine
            .item_for_key(&address_key(address))
            .ok_or_else(|| {
                DomainError::from(EngineError::UnknownId {
                    kind: "address".to_string(),
                    id: address.to_string(),
                })
            })
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
