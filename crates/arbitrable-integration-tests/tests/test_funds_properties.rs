//! Property tests over randomized funding races.
//!
//! Whatever mix of contributions arrives, a request always resolves with
//! funds conserved: everything the engine accepted is either paid to the
//! arbitrator or withdrawn, no side is funded past its fee, and a second
//! withdrawal never pays anything.

use arbitrable_core::{Address, Amount, ManualClock, Multiplier, RoundId};
use arbitrable_engine::{
    Engine, EngineConfig, GovernanceParams, ItemPayload, ItemStatus, ManualArbitrator, Party,
    PayloadError, RequestKind, Ruling, StakeMultipliers,
};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Slot(u8);

impl ItemPayload for Slot {
    fn key(&self) -> String {
        format!("slot-{}", self.0)
    }

    fn validate(&self) -> Result<(), PayloadError> {
        Ok(())
    }
}

type TestEngine = Engine<Slot, ManualArbitrator, ManualClock>;

const APPEAL_PERIOD: u64 = 1_000;
const BACKERS: [&str; 4] = ["b0", "b1", "b2", "b3"];

fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

fn setup(appeal_cost: u128) -> (TestEngine, ManualClock) {
    let config = EngineConfig {
        governor: addr("governor"),
        arbitrator: addr("arbitrator"),
        params: GovernanceParams {
            base_deposit: Amount::new(7),
            arbitrator_extra_data: Vec::new(),
            challenge_period_secs: 100,
            appeal_period_secs: APPEAL_PERIOD,
            multipliers: StakeMultipliers {
                shared: Multiplier::from_basis_points(5_000),
                winner: Multiplier::from_basis_points(3_333),
                loser: Multiplier::from_basis_points(12_500),
            },
        },
        registration_meta_evidence: "/ipfs/reg".to_string(),
        clearing_meta_evidence: "/ipfs/clear".to_string(),
    };
    let clock = ManualClock::at_unix_seconds(0);
    let arbitrator =
        ManualArbitrator::new(addr("arbitrator"), Amount::new(9), Amount::new(appeal_cost));
    (Engine::new(config, arbitrator, clock.clone()).unwrap(), clock)
}

fn ruling(code: u8) -> Ruling {
    Ruling::from_code(code).unwrap_or_default()
}

fn party(requester_side: bool) -> Party {
    if requester_side {
        Party::Requester
    } else {
        Party::Challenger
    }
}

fn contribution() -> impl Strategy<Value = (usize, bool, u128)> {
    (0..BACKERS.len(), any::<bool>(), 1u128..40)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Accepted funds equal arbitrator fees plus withdrawals, the vault ends
    /// empty, and withdrawals are idempotent.
    #[test]
    fn funds_are_conserved(
        appeal_cost in 1u128..30,
        first in 0u8..3,
        second in 0u8..3,
        contributions in prop::collection::vec(contribution(), 0..16),
    ) {
        let (mut engine, clock) = setup(appeal_cost);
        let deposit = engine.required_deposit(RequestKind::Registration).unwrap();
        let sub = engine
            .submit_item(&addr("requester"), Slot(1), deposit, None)
            .unwrap();
        let dispute = engine
            .challenge(&addr("challenger"), sub.request, deposit, None)
            .unwrap();
        engine.rule(&addr("arbitrator"), dispute, ruling(first)).unwrap();

        let round1 = RoundId::new(sub.request, 1);
        let fees = [
            engine.required_appeal_fee(sub.request, Party::Requester).unwrap(),
            engine.required_appeal_fee(sub.request, Party::Challenger).unwrap(),
        ];
        let mut accepted = Amount::ZERO;
        for (backer, requester_side, offered) in contributions {
            let offered = Amount::new(offered);
            if let Ok(receipt) =
                engine.fund_appeal(&addr(BACKERS[backer]), round1, party(requester_side), offered)
            {
                prop_assert_eq!(receipt.accepted.checked_add(receipt.refunded), Some(offered));
                accepted = accepted.checked_add(receipt.accepted).unwrap();
            }
        }

        let paid = engine.round(round1).unwrap().paid();
        prop_assert!(paid.requester <= fees[0]);
        prop_assert!(paid.challenger <= fees[1]);

        if engine.request(sub.request).unwrap().rounds().len() == 3 {
            engine.rule(&addr("arbitrator"), dispute, ruling(second)).unwrap();
        }
        clock.advance(APPEAL_PERIOD);
        let resolution = engine.execute(sub.request).unwrap();
        let expected_status = if resolution.ruling == Ruling::Accept {
            ItemStatus::Registered
        } else {
            ItemStatus::Absent
        };
        prop_assert_eq!(resolution.status, expected_status);

        let everyone = ["requester", "challenger"].into_iter().chain(BACKERS);
        let mut withdrawn = Amount::ZERO;
        for who in everyone {
            let amount = engine.withdraw_all(&addr(who), sub.item, sub.request).unwrap();
            withdrawn = withdrawn.checked_add(amount).unwrap();
            prop_assert_eq!(
                engine.withdraw_all(&addr(who), sub.item, sub.request).unwrap(),
                Amount::ZERO
            );
        }

        let received = deposit
            .checked_add(deposit)
            .and_then(|d| d.checked_add(accepted))
            .unwrap();
        let fees_paid = engine.gateway().total_fees_received();
        prop_assert_eq!(withdrawn.checked_add(fees_paid), Some(received));
        prop_assert_eq!(engine.vault().held(), Amount::ZERO);
    }

    /// A single side funded by many backers never exceeds its fee and
    /// becomes fully paid exactly when the offers cover it.
    #[test]
    fn funding_is_capped_at_the_fee(
        appeal_cost in 1u128..50,
        offers in prop::collection::vec(1u128..25, 1..10),
    ) {
        let (mut engine, _) = setup(appeal_cost);
        let deposit = engine.required_deposit(RequestKind::Registration).unwrap();
        let sub = engine
            .submit_item(&addr("requester"), Slot(2), deposit, None)
            .unwrap();
        let dispute = engine
            .challenge(&addr("challenger"), sub.request, deposit, None)
            .unwrap();
        engine.rule(&addr("arbitrator"), dispute, Ruling::Accept).unwrap();

        let round1 = RoundId::new(sub.request, 1);
        let fee = engine.required_appeal_fee(sub.request, Party::Challenger).unwrap();
        let mut offered_total = 0u128;
        for (i, offer) in offers.iter().enumerate() {
            let backer = addr(BACKERS[i % BACKERS.len()]);
            let result = engine.fund_appeal(&backer, round1, Party::Challenger, Amount::new(*offer));
            if offered_total >= fee.units() {
                prop_assert!(result.is_err());
            } else {
                let receipt = result.unwrap();
                offered_total += offer;
                prop_assert_eq!(receipt.fully_paid, offered_total >= fee.units());
            }
        }
        let round = engine.round(round1).unwrap();
        prop_assert_eq!(round.paid().challenger.units(), offered_total.min(fee.units()));
        prop_assert_eq!(round.fully_paid().challenger, offered_total >= fee.units());
    }
}
