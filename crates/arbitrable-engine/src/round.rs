//! # Round Ledger
//!
//! Per-round contribution accounting. A [`Round`] is one funding cycle of a
//! request: round 0 holds the requester's deposit (and the challenger's,
//! once challenged); every later round crowdfunds one appeal.
//!
//! All mutation goes through a plan/apply pair. `plan_*` methods validate
//! against current state and compute every resulting value with checked
//! arithmetic; the matching `apply_*` only assigns those values and cannot
//! fail. The engine makes its outbound gateway call between the two, so a
//! rejected call leaves the round untouched.
//!
//! ## Funding cap
//!
//! `paid(p)` never exceeds the fee required from `p`: whatever a
//! contribution offers above the remaining gap is reported as `refunded` and
//! never stored.

use std::collections::BTreeMap;

use arbitrable_core::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::clock::AppealWindow;
use crate::distributor::Payout;
use crate::error::EngineError;
use crate::gateway::Ruling;

/// A side of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Party {
    /// Neither side. Never a valid funding target.
    None,
    /// The party that opened the request.
    Requester,
    /// The party that challenged it.
    Challenger,
}

impl Party {
    /// The other side. `None` maps to itself.
    pub fn opposite(&self) -> Party {
        match self {
            Self::None => Self::None,
            Self::Requester => Self::Challenger,
            Self::Challenger => Self::Requester,
        }
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Requester => "REQUESTER",
            Self::Challenger => "CHALLENGER",
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the current ruling treats a party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Standing {
    /// The ruling favors this party.
    Winner,
    /// The ruling favors the other party.
    Loser,
    /// The ruling favors nobody.
    Undecided,
}

impl Standing {
    /// The standing of `party` under `ruling`.
    pub fn of(party: Party, ruling: Ruling) -> Self {
        match ruling.favored() {
            Party::None => Self::Undecided,
            favored if favored == party => Self::Winner,
            _ => Self::Loser,
        }
    }
}

/// An amount per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyAmounts {
    /// Amount attributed to the requester.
    pub requester: Amount,
    /// Amount attributed to the challenger.
    pub challenger: Amount,
}

impl PartyAmounts {
    /// The amount for `party`; zero for [`Party::None`].
    pub fn get(&self, party: Party) -> Amount {
        match party {
            Party::None => Amount::ZERO,
            Party::Requester => self.requester,
            Party::Challenger => self.challenger,
        }
    }

    /// Both sides added, or `None` on overflow.
    pub fn total(&self) -> Option<Amount> {
        self.requester.checked_add(self.challenger)
    }

    /// Whether both sides are zero.
    pub fn is_zero(&self) -> bool {
        self.requester.is_zero() && self.challenger.is_zero()
    }

    fn set(&mut self, party: Party, amount: Amount) {
        match party {
            Party::None => {}
            Party::Requester => self.requester = amount,
            Party::Challenger => self.challenger = amount,
        }
    }
}

/// A flag per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyFlags {
    /// Flag for the requester.
    pub requester: bool,
    /// Flag for the challenger.
    pub challenger: bool,
}

impl PartyFlags {
    /// The flag for `party`; `false` for [`Party::None`].
    pub fn get(&self, party: Party) -> bool {
        match party {
            Party::None => false,
            Party::Requester => self.requester,
            Party::Challenger => self.challenger,
        }
    }

    fn set(&mut self, party: Party) {
        match party {
            Party::None => {}
            Party::Requester => self.requester = true,
            Party::Challenger => self.challenger = true,
        }
    }
}

/// The ruling that opened a round's appeal window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulingRecord {
    /// The arbitrator's ruling.
    pub ruling: Ruling,
    /// When it was delivered.
    pub given_at: Timestamp,
    /// The appeal-funding window it opened.
    pub window: AppealWindow,
}

/// One funding cycle of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    contributions: BTreeMap<Address, PartyAmounts>,
    paid: PartyAmounts,
    fully_paid: PartyFlags,
    fee_rewards: Amount,
    arbitrator_fee: Amount,
    arbitrated: bool,
    ruling: Option<RulingRecord>,
    payout: Option<Payout>,
    distributed: Amount,
    claimed: PartyAmounts,
}

/// The validated effect of a contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionPlan {
    /// Who contributes.
    pub contributor: Address,
    /// The side funded.
    pub party: Party,
    /// Portion of the offer kept by the round.
    pub accepted: Amount,
    /// Portion of the offer returned to the contributor.
    pub refunded: Amount,
    /// The side's total after the contribution.
    pub new_paid: Amount,
    /// The contributor's total for the side after the contribution.
    pub new_contribution: Amount,
    /// Whether the contribution completes the side's required fee.
    pub completes: bool,
}

impl Round {
    /// Round 0 of a new request, holding the requester's deposit.
    pub fn opening(requester: &Address, deposit: Amount) -> Self {
        let mut round = Self::default();
        round.contributions.insert(
            requester.clone(),
            PartyAmounts {
                requester: deposit,
                challenger: Amount::ZERO,
            },
        );
        round.paid.requester = deposit;
        round.fully_paid.set(Party::Requester);
        round
    }

    /// A contributor's amounts in this round.
    pub fn contribution(&self, contributor: &Address) -> PartyAmounts {
        self.contributions
            .get(contributor)
            .copied()
            .unwrap_or_default()
    }

    /// All contributors with an unwithdrawn contribution.
    pub fn contributors(&self) -> impl Iterator<Item = (&Address, &PartyAmounts)> {
        self.contributions.iter()
    }

    /// Total paid per side.
    pub fn paid(&self) -> PartyAmounts {
        self.paid
    }

    /// Which sides reached their required fee.
    pub fn fully_paid(&self) -> PartyFlags {
        self.fully_paid
    }

    /// The pool distributed to the round's winners.
    pub fn fee_rewards(&self) -> Amount {
        self.fee_rewards
    }

    /// The fee this round paid to the arbitrator.
    pub fn arbitrator_fee(&self) -> Amount {
        self.arbitrator_fee
    }

    /// Whether this round paid for a dispute or an appeal.
    pub fn is_arbitrated(&self) -> bool {
        self.arbitrated
    }

    /// The ruling that opened this round's appeal window, if any.
    pub fn ruling(&self) -> Option<&RulingRecord> {
        self.ruling.as_ref()
    }

    /// The appeal window of this round, if a ruling opened one.
    pub fn appeal_window(&self) -> Option<AppealWindow> {
        self.ruling.map(|r| r.window)
    }

    /// The payout policy, set when the request resolves.
    pub fn payout(&self) -> Option<Payout> {
        self.payout
    }

    /// Total already paid out of this round.
    pub fn distributed(&self) -> Amount {
        self.distributed
    }

    /// Contributions already retired by withdrawals, per side.
    pub fn claimed(&self) -> PartyAmounts {
        self.claimed
    }

    /// Validate a contribution of `offered` toward `party`, whose fee is
    /// `required`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] for [`Party::None`], a zero offer, or a
    /// side that is already fully paid; [`EngineError::Overflow`] if a
    /// running total would overflow.
    pub fn plan_contribution(
        &self,
        contributor: &Address,
        party: Party,
        offered: Amount,
        required: Amount,
    ) -> Result<ContributionPlan, EngineError> {
        const OP: &str = "fund_appeal";
        if party == Party::None {
            return Err(EngineError::invalid_state(OP, "cannot fund party NONE"));
        }
        if offered.is_zero() {
            return Err(EngineError::invalid_state(OP, "contribution must be positive"));
        }
        if self.fully_paid.get(party) {
            return Err(EngineError::invalid_state(
                OP,
                format!("{party} is already fully paid"),
            ));
        }
        let paid = self.paid.get(party);
        let gap = required.saturating_sub(paid);
        let accepted = offered.min(gap);
        let refunded = offered.saturating_sub(accepted);
        let new_paid = paid
            .checked_add(accepted)
            .ok_or_else(|| EngineError::overflow("paid total"))?;
        let new_contribution = self
            .contribution(contributor)
            .get(party)
            .checked_add(accepted)
            .ok_or_else(|| EngineError::overflow("contribution"))?;
        Ok(ContributionPlan {
            contributor: contributor.clone(),
            party,
            accepted,
            refunded,
            new_paid,
            new_contribution,
            completes: new_paid >= required,
        })
    }

    /// Commit a contribution planned against this round.
    pub(crate) fn apply_contribution(&mut self, plan: &ContributionPlan) {
        if !plan.accepted.is_zero() {
            self.contributions
                .entry(plan.contributor.clone())
                .or_default()
                .set(plan.party, plan.new_contribution);
        }
        self.paid.set(plan.party, plan.new_paid);
        if plan.completes {
            self.fully_paid.set(plan.party);
        }
    }

    /// The pool left once `fee` is paid out of both sides' totals, with
    /// `pending` applied first.
    ///
    /// # Errors
    ///
    /// [`EngineError::Overflow`] when the totals overflow or do not cover
    /// the fee.
    pub fn rewards_after_fee(
        &self,
        pending: Option<&ContributionPlan>,
        fee: Amount,
    ) -> Result<Amount, EngineError> {
        let mut paid = self.paid;
        if let Some(plan) = pending {
            paid.set(plan.party, plan.new_paid);
        }
        paid.total()
            .and_then(|total| total.checked_sub(fee))
            .ok_or_else(|| EngineError::overflow("fee rewards"))
    }

    /// Record the challenger's deposit into round 0, with the dispute fee
    /// paid out of the pool.
    pub(crate) fn apply_challenge(
        &mut self,
        challenger: &Address,
        deposit: Amount,
        arbitration_cost: Amount,
        fee_rewards: Amount,
    ) {
        let entry = self.contributions.entry(challenger.clone()).or_default();
        entry.challenger = entry.challenger.saturating_add(deposit);
        self.paid.challenger = deposit;
        self.fully_paid.set(Party::Challenger);
        self.mark_arbitrated(arbitration_cost, fee_rewards);
    }

    /// Mark the round as having paid the arbitrator.
    pub(crate) fn mark_arbitrated(&mut self, fee: Amount, fee_rewards: Amount) {
        self.arbitrator_fee = fee;
        self.fee_rewards = fee_rewards;
        self.arbitrated = true;
    }

    pub(crate) fn record_ruling(&mut self, record: RulingRecord) {
        self.ruling = Some(record);
    }

    pub(crate) fn set_payout(&mut self, payout: Payout) {
        self.payout = Some(payout);
    }

    pub(crate) fn retire(
        &mut self,
        beneficiary: &Address,
        distributed: Amount,
        claimed: PartyAmounts,
    ) {
        self.contributions.remove(beneficiary);
        self.distributed = distributed;
        self.claimed = claimed;
    }

    /// Decide the funding race of this round.
    ///
    /// If exactly one side fully paid, that side wins, whatever the ruling
    /// said. Otherwise the ruling stands.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] if no ruling opened the round and
    /// [`EngineError::DeadlineNotReached`] while the outcome can still
    /// change: before the window ends, unless the disfavored side's half
    /// elapsed without it fully paying.
    pub fn settle_race(&self, now: Timestamp) -> Result<Ruling, EngineError> {
        const OP: &str = "execute_ruling";
        let record = self
            .ruling
            .ok_or_else(|| EngineError::invalid_state(OP, "awaiting a ruling"))?;
        let window = record.window;
        let loser = record.ruling.favored().opposite();
        let outcome_fixed = window.is_closed(now)
            || (loser != Party::None
                && window.loser_half_closed(now)
                && !self.fully_paid.get(loser));
        if !outcome_fixed {
            let deadline = if loser != Party::None && !self.fully_paid.get(loser) {
                window.loser_deadline
            } else {
                window.end
            };
            return Err(EngineError::DeadlineNotReached {
                operation: OP.to_string(),
                deadline,
            });
        }
        Ok(
            match (self.fully_paid.requester, self.fully_paid.challenger) {
                (true, false) => Ruling::Accept,
                (false, true) => Ruling::Refuse,
                _ => record.ruling,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_seconds(secs).unwrap()
    }

    fn ruled(ruling: Ruling) -> Round {
        let mut round = Round::default();
        round.record_ruling(RulingRecord {
            ruling,
            given_at: at(0),
            window: AppealWindow::open(at(0), 100),
        });
        round
    }

    #[test]
    fn standing_follows_ruling() {
        assert_eq!(Standing::of(Party::Requester, Ruling::Accept), Standing::Winner);
        assert_eq!(Standing::of(Party::Challenger, Ruling::Accept), Standing::Loser);
        assert_eq!(Standing::of(Party::Requester, Ruling::Other), Standing::Undecided);
    }

    #[test]
    fn opening_round_holds_deposit() {
        let alice = addr("alice");
        let round = Round::opening(&alice, Amount::new(15));
        assert_eq!(round.contribution(&alice).requester, Amount::new(15));
        assert!(round.fully_paid().requester);
        assert!(!round.fully_paid().challenger);
        assert!(!round.is_arbitrated());
    }

    #[test]
    fn contribution_is_capped_and_excess_refunded() {
        let round = ruled(Ruling::Accept);
        let plan = round
            .plan_contribution(&addr("bob"), Party::Challenger, Amount::new(50), Amount::new(30))
            .unwrap();
        assert_eq!(plan.accepted, Amount::new(30));
        assert_eq!(plan.refunded, Amount::new(20));
        assert!(plan.completes);
    }

    #[test]
    fn partial_contributions_accumulate() {
        let mut round = ruled(Ruling::Accept);
        let carol = addr("carol");
        let first = round
            .plan_contribution(&carol, Party::Requester, Amount::new(10), Amount::new(30))
            .unwrap();
        round.apply_contribution(&first);
        let second = round
            .plan_contribution(&carol, Party::Requester, Amount::new(10), Amount::new(30))
            .unwrap();
        round.apply_contribution(&second);
        assert_eq!(round.paid().requester, Amount::new(20));
        assert_eq!(round.contribution(&carol).requester, Amount::new(20));
        assert!(!round.fully_paid().requester);
    }

    #[test]
    fn rejects_party_none_zero_offer_and_fully_paid_side() {
        let mut round = ruled(Ruling::Other);
        let dave = addr("dave");
        assert!(round
            .plan_contribution(&dave, Party::None, Amount::new(1), Amount::new(1))
            .is_err());
        assert!(round
            .plan_contribution(&dave, Party::Requester, Amount::ZERO, Amount::new(1))
            .is_err());
        let plan = round
            .plan_contribution(&dave, Party::Requester, Amount::new(5), Amount::new(5))
            .unwrap();
        round.apply_contribution(&plan);
        assert!(matches!(
            round.plan_contribution(&dave, Party::Requester, Amount::new(1), Amount::new(5)),
            Err(EngineError::InvalidState { .. })
        ));
    }

    #[test]
    fn ruling_stands_when_nobody_funds() {
        let round = ruled(Ruling::Accept);
        assert!(matches!(
            round.settle_race(at(49)),
            Err(EngineError::DeadlineNotReached { .. })
        ));
        assert_eq!(round.settle_race(at(50)).unwrap(), Ruling::Accept);
    }

    #[test]
    fn sole_funded_loser_flips_ruling() {
        let mut round = ruled(Ruling::Accept);
        let plan = round
            .plan_contribution(&addr("erin"), Party::Challenger, Amount::new(20), Amount::new(20))
            .unwrap();
        round.apply_contribution(&plan);
        // the winner may still answer until the end of the window
        assert!(round.settle_race(at(99)).is_err());
        assert_eq!(round.settle_race(at(100)).unwrap(), Ruling::Refuse);
    }

    #[test]
    fn other_ruling_waits_for_full_window() {
        let round = ruled(Ruling::Other);
        assert!(round.settle_race(at(60)).is_err());
        assert_eq!(round.settle_race(at(100)).unwrap(), Ruling::Other);
    }

    #[test]
    fn settle_without_ruling_is_invalid() {
        let round = Round::default();
        assert!(matches!(
            round.settle_race(at(1_000)),
            Err(EngineError::InvalidState { .. })
        ));
    }

    #[test]
    fn rewards_after_fee_includes_pending_contribution() {
        let mut round = ruled(Ruling::Accept);
        let first = round
            .plan_contribution(&addr("a"), Party::Requester, Amount::new(12), Amount::new(12))
            .unwrap();
        round.apply_contribution(&first);
        let second = round
            .plan_contribution(&addr("b"), Party::Challenger, Amount::new(16), Amount::new(16))
            .unwrap();
        assert_eq!(
            round.rewards_after_fee(Some(&second), Amount::new(8)).unwrap(),
            Amount::new(20)
        );
        assert!(round.rewards_after_fee(None, Amount::new(13)).is_err());
    }
}
