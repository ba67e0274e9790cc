//! # Fee Distributor
//!
//! Decides, when a request resolves, how each round's funds are shared, and
//! computes individual withdrawals from that decision.
//!
//! ## Payout rules
//!
//! - A round that paid the arbitrator pays its `fee_rewards` pool to the
//!   contributors of the final winner, pro rata to their contribution.
//!   When the final ruling favors nobody, or the winner paid nothing into
//!   the round, the pool is split pro rata over both sides.
//! - A round that never paid the arbitrator (round 0 of an unchallenged
//!   request, or the last round when no appeal was raised) refunds every
//!   contribution exactly.
//!
//! ## Rounding
//!
//! Shares are taken from the *remaining* pool against the *remaining*
//! eligible contributions: `share = c * (pool - distributed) / (paid -
//! claimed)`. The last withdrawer of a round therefore receives the exact
//! remainder and no dust is left behind.

use arbitrable_core::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::gateway::Ruling;
use crate::round::{Party, PartyAmounts, Round};

/// How a resolved round pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payout {
    /// Every contributor gets their own contribution back.
    Refund,
    /// The pool goes to contributors of the given party.
    Winner(Party),
    /// The pool is split over contributors of both parties.
    Split,
}

/// The payout policy for `round` once the request resolved with `ruling`.
pub fn payout_for(round: &Round, ruling: Ruling) -> Payout {
    if !round.is_arbitrated() {
        return Payout::Refund;
    }
    match ruling.favored() {
        Party::None => Payout::Split,
        winner if round.paid().get(winner).is_zero() => Payout::Split,
        winner => Payout::Winner(winner),
    }
}

/// The validated effect of one withdrawal from one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalPlan {
    /// Who withdraws.
    pub beneficiary: Address,
    /// Amount owed to the beneficiary. May be zero.
    pub amount: Amount,
    /// The round's distributed total after the withdrawal.
    pub new_distributed: Amount,
    /// The round's retired contributions after the withdrawal.
    pub new_claimed: PartyAmounts,
}

impl WithdrawalPlan {
    /// Whether the withdrawal changes nothing.
    pub fn is_noop(&self) -> bool {
        self.amount.is_zero()
    }
}

/// Compute what `beneficiary` may withdraw from `round`.
///
/// # Errors
///
/// [`EngineError::InvalidState`] if the round has no payout policy yet;
/// [`EngineError::Overflow`] if the round's bookkeeping is inconsistent.
pub fn plan_withdrawal(round: &Round, beneficiary: &Address) -> Result<WithdrawalPlan, EngineError> {
    let payout = round
        .payout()
        .ok_or_else(|| EngineError::invalid_state("withdraw", "round is not settled"))?;
    let contribution = round.contribution(beneficiary);
    let mut claimed = round.claimed();

    let amount = match payout {
        Payout::Refund => contribution
            .total()
            .ok_or_else(|| EngineError::overflow("refund"))?,
        Payout::Winner(party) => {
            let stake = contribution.get(party);
            let eligible = round.paid().get(party).checked_sub(claimed.get(party));
            let share = pro_rata(round, stake, eligible)?;
            let retired = claimed
                .get(party)
                .checked_add(stake)
                .ok_or_else(|| EngineError::overflow("claimed contributions"))?;
            match party {
                Party::Requester => claimed.requester = retired,
                Party::Challenger => claimed.challenger = retired,
                Party::None => {}
            }
            share
        }
        Payout::Split => {
            let stake = contribution
                .total()
                .ok_or_else(|| EngineError::overflow("contribution"))?;
            let eligible = round
                .paid()
                .total()
                .and_then(|paid| paid.checked_sub(claimed.total()?));
            let share = pro_rata(round, stake, eligible)?;
            claimed = PartyAmounts {
                requester: claimed
                    .requester
                    .checked_add(contribution.requester)
                    .ok_or_else(|| EngineError::overflow("claimed contributions"))?,
                challenger: claimed
                    .challenger
                    .checked_add(contribution.challenger)
                    .ok_or_else(|| EngineError::overflow("claimed contributions"))?,
            };
            share
        }
    };

    let new_distributed = round
        .distributed()
        .checked_add(amount)
        .ok_or_else(|| EngineError::overflow("distributed total"))?;
    Ok(WithdrawalPlan {
        beneficiary: beneficiary.clone(),
        amount,
        new_distributed,
        new_claimed: claimed,
    })
}

fn pro_rata(round: &Round, stake: Amount, eligible: Option<Amount>) -> Result<Amount, EngineError> {
    if stake.is_zero() {
        return Ok(Amount::ZERO);
    }
    let eligible = eligible.ok_or_else(|| EngineError::overflow("eligible contributions"))?;
    let remaining = round
        .fee_rewards()
        .checked_sub(round.distributed())
        .ok_or_else(|| EngineError::overflow("remaining pool"))?;
    stake
        .mul_div(remaining, eligible)
        .ok_or_else(|| EngineError::overflow("reward share"))
}

/// Commit a withdrawal planned against `round`.
pub(crate) fn apply_withdrawal(round: &mut Round, plan: &WithdrawalPlan) {
    round.retire(&plan.beneficiary, plan.new_distributed, plan.new_claimed);
}
