//! # Vault
//!
//! Custody accounting for every unit the engine holds. Deposits and
//! accepted contributions are received; arbitration fees leave to the
//! arbitrator; withdrawals are credited to beneficiaries in a payout ledger
//! that the host settles on its own ledger.
//!
//! `held = received - arbitration_paid - disbursed` is never negative: a
//! disbursement that would overdraw custody fails with
//! [`EngineError::Insolvent`].

use std::collections::BTreeMap;

use arbitrable_core::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Running custody totals.
///
/// Copyable so the engine can plan a whole operation's movements on a
/// scratch copy and commit by assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultTotals {
    /// Everything ever taken into custody.
    pub received: Amount,
    /// Everything paid to the arbitrator.
    pub arbitration_paid: Amount,
    /// Everything credited to beneficiaries.
    pub disbursed: Amount,
}

impl VaultTotals {
    /// Amount currently in custody.
    pub fn held(&self) -> Amount {
        self.received
            .saturating_sub(self.arbitration_paid)
            .saturating_sub(self.disbursed)
    }

    /// Take `amount` into custody.
    pub fn receive(self, amount: Amount) -> Result<Self, EngineError> {
        Ok(Self {
            received: self
                .received
                .checked_add(amount)
                .ok_or_else(|| EngineError::overflow("vault receipts"))?,
            ..self
        })
    }

    /// Pay `amount` to the arbitrator out of custody.
    pub fn pay_arbitrator(self, amount: Amount) -> Result<Self, EngineError> {
        self.ensure_covers(amount)?;
        Ok(Self {
            arbitration_paid: self
                .arbitration_paid
                .checked_add(amount)
                .ok_or_else(|| EngineError::overflow("arbitration payments"))?,
            ..self
        })
    }

    /// Release `amount` to a beneficiary out of custody.
    pub fn disburse(self, amount: Amount) -> Result<Self, EngineError> {
        self.ensure_covers(amount)?;
        Ok(Self {
            disbursed: self
                .disbursed
                .checked_add(amount)
                .ok_or_else(|| EngineError::overflow("vault disbursements"))?,
            ..self
        })
    }

    fn ensure_covers(&self, amount: Amount) -> Result<(), EngineError> {
        let held = self.held();
        if amount > held {
            return Err(EngineError::Insolvent {
                requested: amount,
                held,
            });
        }
        Ok(())
    }
}

/// Custody totals plus the per-beneficiary payout ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    totals: VaultTotals,
    credited: BTreeMap<Address, Amount>,
}

impl Vault {
    /// An empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current totals.
    pub fn totals(&self) -> VaultTotals {
        self.totals
    }

    /// Amount currently in custody.
    pub fn held(&self) -> Amount {
        self.totals.held()
    }

    /// Total credited to `beneficiary` so far.
    pub fn credited(&self, beneficiary: &Address) -> Amount {
        self.credited.get(beneficiary).copied().unwrap_or_default()
    }

    /// The full payout ledger.
    pub fn ledger(&self) -> &BTreeMap<Address, Amount> {
        &self.credited
    }

    /// Compute the beneficiary's ledger balance after a credit of `amount`.
    pub(crate) fn plan_credit(
        &self,
        beneficiary: &Address,
        amount: Amount,
    ) -> Result<Amount, EngineError> {
        self.credited(beneficiary)
            .checked_add(amount)
            .ok_or_else(|| EngineError::overflow("beneficiary credit"))
    }

    pub(crate) fn commit(&mut self, totals: VaultTotals) {
        self.totals = totals;
    }

    pub(crate) fn commit_credit(&mut self, beneficiary: &Address, balance: Amount) {
        self.credited.insert(beneficiary.clone(), balance);
    }
}
