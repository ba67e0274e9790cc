//! # Shared Engine
//!
//! A cloneable handle that serializes operations from several host threads
//! through one `parking_lot` mutex. Each operation holds the lock for its
//! whole validate/call-out/commit sequence, so it stays atomic.

use std::sync::Arc;

use arbitrable_core::{Address, Amount, Clock, DisputeId, ItemId, RequestId, RoundId};
use parking_lot::{Mutex, MutexGuard};

use crate::capability::{Arbitrable, FundingReceipt, Resolution, Submission};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::gateway::{ArbitratorGateway, Ruling};
use crate::registry::{ItemPayload, ItemStatus};
use crate::round::Party;

/// Thread-safe handle to an [`Engine`].
pub struct SharedEngine<P, G, C> {
    inner: Arc<Mutex<Engine<P, G, C>>>,
}

impl<P, G, C> Clone for SharedEngine<P, G, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, G, C> std::fmt::Debug for SharedEngine<P, G, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedEngine").finish_non_exhaustive()
    }
}

impl<P, G, C> SharedEngine<P, G, C>
where
    P: ItemPayload,
    G: ArbitratorGateway,
    C: Clock,
{
    /// Wrap an engine.
    pub fn new(engine: Engine<P, G, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Lock the engine for a sequence of reads or operations.
    pub fn lock(&self) -> MutexGuard<'_, Engine<P, G, C>> {
        self.inner.lock()
    }

    /// Run `f` with the engine locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine<P, G, C>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<P, G, C> Arbitrable for SharedEngine<P, G, C>
where
    P: ItemPayload,
    G: ArbitratorGateway,
    C: Clock,
{
    type Payload = P;

    fn submit(
        &mut self,
        requester: &Address,
        payload: P,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, EngineError> {
        self.lock().submit_item(requester, payload, deposit, evidence)
    }

    fn request_change(
        &mut self,
        requester: &Address,
        item: ItemId,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, EngineError> {
        self.lock()
            .request_status_change(requester, item, deposit, evidence)
    }

    fn challenge(
        &mut self,
        challenger: &Address,
        request: RequestId,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<DisputeId, EngineError> {
        self.lock().challenge(challenger, request, deposit, evidence)
    }

    fn fund_appeal(
        &mut self,
        contributor: &Address,
        round: RoundId,
        party: Party,
        amount: Amount,
    ) -> Result<FundingReceipt, EngineError> {
        self.lock().fund_appeal(contributor, round, party, amount)
    }

    fn rule(
        &mut self,
        caller: &Address,
        dispute: DisputeId,
        ruling: Ruling,
    ) -> Result<(), EngineError> {
        self.lock().rule(caller, dispute, ruling)
    }

    fn execute(&mut self, request: RequestId) -> Result<Resolution, EngineError> {
        self.lock().execute(request)
    }

    fn withdraw(
        &mut self,
        beneficiary: &Address,
        item: ItemId,
        round: RoundId,
    ) -> Result<Amount, EngineError> {
        self.lock().withdraw(beneficiary, item, round)
    }

    fn status_of(&self, item: ItemId) -> Result<ItemStatus, EngineError> {
        self.lock().status_of(item)
    }

    fn payload_of(&self, item: ItemId) -> Result<P, EngineError> {
        self.lock().payload_of(item)
    }

    fn active_request(&self, item: ItemId) -> Result<Option<RequestId>, EngineError> {
        self.lock().active_request(item)
    }

    fn item_for_key(&self, key: &str) -> Option<ItemId> {
        self.lock().item_for_key(key)
    }
}
