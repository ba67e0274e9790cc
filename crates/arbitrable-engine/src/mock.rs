//! # Manual Arbitrator
//!
//! An in-process [`ArbitratorGateway`] with fixed, adjustable prices. It
//! records every dispute and appeal it is paid for and can be told to fail
//! its next call, which is how tests check that a rejected outbound call
//! leaves the engine untouched.
//!
//! It does not decide anything: tests deliver rulings by calling
//! [`Engine::rule`](crate::Engine::rule) with [`ManualArbitrator::address`]
//! as the caller.

use arbitrable_core::{Address, Amount, DisputeId, IdAllocator};

use crate::gateway::{ArbitratorGateway, GatewayError};

/// A dispute opened on the [`ManualArbitrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisputeRecord {
    /// The dispute identifier.
    pub id: DisputeId,
    /// Number of ruling options requested.
    pub choices: u8,
    /// Extra data sent with the dispute.
    pub extra_data: Vec<u8>,
    /// Fees received for this dispute, creation and appeals included.
    pub fees_received: Amount,
    /// Number of appeals raised.
    pub appeals: u32,
}

/// A fixed-price arbitrator driven by the test or host.
#[derive(Debug, Clone)]
pub struct ManualArbitrator {
    address: Address,
    arbitration_cost: Amount,
    appeal_cost: Amount,
    disputes: Vec<DisputeRecord>,
    ids: IdAllocator<DisputeId>,
    fail_next: Option<GatewayError>,
}

impl ManualArbitrator {
    /// Create an arbitrator with the given prices.
    pub fn new(address: Address, arbitration_cost: Amount, appeal_cost: Amount) -> Self {
        Self {
            address,
            arbitration_cost,
            appeal_cost,
            disputes: Vec::new(),
            ids: IdAllocator::new(),
            fail_next: None,
        }
    }

    /// Change the price of new disputes.
    pub fn set_arbitration_cost(&mut self, cost: Amount) {
        self.arbitration_cost = cost;
    }

    /// Change the price of appeals.
    pub fn set_appeal_cost(&mut self, cost: Amount) {
        self.appeal_cost = cost;
    }

    /// Make the next `create_dispute` or `appeal` call fail with `error`.
    pub fn fail_next_call(&mut self, error: GatewayError) {
        self.fail_next = Some(error);
    }

    /// All disputes opened so far.
    pub fn disputes(&self) -> &[DisputeRecord] {
        &self.disputes
    }

    /// A dispute by identifier.
    pub fn dispute(&self, id: DisputeId) -> Option<&DisputeRecord> {
        self.disputes.iter().find(|d| d.id == id)
    }

    /// Total fees received across all disputes.
    pub fn total_fees_received(&self) -> Amount {
        self.disputes
            .iter()
            .fold(Amount::ZERO, |acc, d| acc.saturating_add(d.fees_received))
    }

    fn take_failure(&mut self) -> Result<(), GatewayError> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl ArbitratorGateway for ManualArbitrator {
    fn address(&self) -> &Address {
        &self.address
    }

    fn dispute_cost(&self, _extra_data: &[u8]) -> Result<Amount, GatewayError> {
        Ok(self.arbitration_cost)
    }

    fn create_dispute(
        &mut self,
        choices: u8,
        extra_data: &[u8],
        fee: Amount,
    ) -> Result<DisputeId, GatewayError> {
        self.take_failure()?;
        if fee < self.arbitration_cost {
            return Err(GatewayError::InsufficientFee {
                required: self.arbitration_cost,
                provided: fee,
            });
        }
        let id = self.ids.allocate();
        self.disputes.push(DisputeRecord {
            id,
            choices,
            extra_data: extra_data.to_vec(),
            fees_received: fee,
            appeals: 0,
        });
        Ok(id)
    }

    fn appeal_cost(
        &self,
        dispute_id: DisputeId,
        _extra_data: &[u8],
    ) -> Result<Amount, GatewayError> {
        self.dispute(dispute_id)
            .map(|_| self.appeal_cost)
            .ok_or(GatewayError::UnknownDispute(dispute_id))
    }

    fn appeal(
        &mut self,
        dispute_id: DisputeId,
        _extra_data: &[u8],
        fee: Amount,
    ) -> Result<(), GatewayError> {
        self.take_failure()?;
        if fee < self.appeal_cost {
            return Err(GatewayError::InsufficientFee {
                required: self.appeal_cost,
                provided: fee,
            });
        }
        let record = self
            .disputes
            .iter_mut()
            .find(|d| d.id == dispute_id)
            .ok_or(GatewayError::UnknownDispute(dispute_id))?;
        record.fees_received = record.fees_received.saturating_add(fee);
        record.appeals += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arbitrator() -> ManualArbitrator {
        ManualArbitrator::new(
            Address::new("0xarbitrator").unwrap(),
            Amount::new(5),
            Amount::new(8),
        )
    }

    #[test]
    fn create_dispute_assigns_sequential_ids() {
        let mut arb = arbitrator();
        let a = arb.create_dispute(2, b"", Amount::new(5)).unwrap();
        let b = arb.create_dispute(2, b"", Amount::new(6)).unwrap();
        assert_eq!(a, DisputeId::new(0));
        assert_eq!(b, DisputeId::new(1));
        assert_eq!(arb.total_fees_received(), Amount::new(11));
    }

    #[test]
    fn underpaid_dispute_is_rejected() {
        let mut arb = arbitrator();
        let err = arb.create_dispute(2, b"", Amount::new(4)).unwrap_err();
        assert!(matches!(err, GatewayError::InsufficientFee { .. }));
        assert!(arb.disputes().is_empty());
    }

    #[test]
    fn appeal_requires_known_dispute() {
        let mut arb = arbitrator();
        let err = arb
            .appeal(DisputeId::new(3), b"", Amount::new(8))
            .unwrap_err();
        assert_eq!(err, GatewayError::UnknownDispute(DisputeId::new(3)));
    }

    #[test]
    fn scripted_failure_fires_once() {
        let mut arb = arbitrator();
        arb.fail_next_call(GatewayError::Unavailable("maintenance".to_string()));
        assert!(arb.create_dispute(2, b"", Amount::new(5)).is_err());
        assert!(arb.create_dispute(2, b"", Amount::new(5)).is_ok());
    }

    #[test]
    fn appeal_accumulates_fees() {
        let mut arb = arbitrator();
        let id = arb.create_dispute(2, b"", Amount::new(5)).unwrap();
        arb.appeal(id, b"", Amount::new(8)).unwrap();
        let record = arb.dispute(id).unwrap();
        assert_eq!(record.appeals, 1);
        assert_eq!(record.fees_received, Amount::new(13));
    }
}
