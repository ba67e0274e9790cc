//! Domain facades driven end to end over real engines, both owned and
//! shared across threads.

use arbitrable_core::{Address, Amount, ManualClock, Multiplier, RoundId};
use arbitrable_domains::{
    AddressEntry, AddressList, DomainError, EscrowBook, EscrowOutcome, EscrowPayment, TokenEntry,
    TokenList, TranslationMarket, TranslationSubmission,
};
use arbitrable_engine::{
    Arbitrable, Engine, EngineConfig, GovernanceParams, ItemPayload, ManualArbitrator, Party,
    Ruling, SharedEngine, StakeMultipliers,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DEPOSIT: Amount = Amount::new(15);

fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

fn engine<P: ItemPayload>() -> (Engine<P, ManualArbitrator, ManualClock>, ManualClock) {
    let config = EngineConfig {
        governor: addr("governor"),
        arbitrator: addr("arbitrator"),
        params: GovernanceParams {
            base_deposit: Amount::new(10),
            arbitrator_extra_data: Vec::new(),
            challenge_period_secs: 100,
            appeal_period_secs: 100,
            multipliers: StakeMultipliers {
                shared: Multiplier::ZERO,
                winner: Multiplier::ZERO,
                loser: Multiplier::ZERO,
            },
        },
        registration_meta_evidence: "/ipfs/reg".to_string(),
        clearing_meta_evidence: "/ipfs/clear".to_string(),
    };
    let clock = ManualClock::at_unix_seconds(0);
    let arbitrator = ManualArbitrator::new(addr("arbitrator"), Amount::new(5), Amount::new(10));
    (Engine::new(config, arbitrator, clock.clone()).unwrap(), clock)
}

fn pnk() -> TokenEntry {
    TokenEntry {
        name: "Pinakion".to_string(),
        ticker: "PNK".to_string(),
        contract: addr("0x93ed3fbe21207ec2e8f2d3c3de6e058cb73bc04d"),
        symbol_uri: "/ipfs/QmPnkLogo".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Token list
// ---------------------------------------------------------------------------

#[test]
fn token_listing_and_removal() {
    let (engine, clock) = engine::<TokenEntry>();
    let mut list = TokenList::new(engine);

    let sub = list.propose(&addr("alice"), pnk(), DEPOSIT, None).unwrap();
    assert!(!list.is_listed(sub.item).unwrap());
    clock.advance(100);
    list.engine_mut().execute(sub.request).unwrap();
    assert!(list.is_listed(sub.item).unwrap());
    assert_eq!(list.find(&pnk().contract, "PNK"), Some(sub.item));

    // a removal challenged and upheld keeps the token listed
    let removal = list
        .request_removal(&addr("bob"), sub.item, DEPOSIT, Some("/ipfs/scam-report"))
        .unwrap();
    list.challenge(&addr("alice"), sub.item, DEPOSIT, None).unwrap();
    let dispute = list
        .engine()
        .request(removal.request)
        .and_then(|r| r.dispute_id())
        .unwrap();
    list.engine_mut()
        .rule(&addr("arbitrator"), dispute, Ruling::Refuse)
        .unwrap();
    clock.advance(100);
    list.engine_mut().execute(removal.request).unwrap();
    assert!(list.is_listed(sub.item).unwrap());
}

#[test]
fn challenging_a_settled_token_reports_no_active_request() {
    let (engine, clock) = engine::<TokenEntry>();
    let mut list = TokenList::new(engine);
    let sub = list.propose(&addr("alice"), pnk(), DEPOSIT, None).unwrap();
    clock.advance(100);
    list.engine_mut().execute(sub.request).unwrap();
    assert!(matches!(
        list.challenge(&addr("bob"), sub.item, DEPOSIT, None),
        Err(DomainError::NoActiveRequest(_))
    ));
}

// ---------------------------------------------------------------------------
// Address list over a shared engine
// ---------------------------------------------------------------------------

#[test]
fn address_list_over_shared_engine() {
    let (engine, clock) = engine::<AddressEntry>();
    let shared = SharedEngine::new(engine);
    let mut list = AddressList::new(shared.clone());

    let exchange = addr("0xExchange");
    let entry = AddressEntry {
        address: exchange.clone(),
        label: Some("hot wallet".to_string()),
    };
    let sub = list.submit(&addr("alice"), entry, DEPOSIT, None).unwrap();
    list.challenge(&addr("bob"), &addr("0xexchange"), DEPOSIT, None)
        .unwrap();

    let dispute = shared
        .with(|e| e.request(sub.request).and_then(|r| r.dispute_id()))
        .unwrap();
    let mut arbitrator_view = shared.clone();
    arbitrator_view
        .rule(&addr("arbitrator"), dispute, Ruling::Accept)
        .unwrap();

    // the challenger appeals alone and flips the outcome
    let round1 = RoundId::new(sub.request, 1);
    arbitrator_view
        .fund_appeal(&addr("bob"), round1, Party::Challenger, Amount::new(10))
        .unwrap();
    clock.advance(100);
    let resolution = arbitrator_view.execute(sub.request).unwrap();
    assert_eq!(resolution.ruling, Ruling::Refuse);
    assert!(!list.is_registered(&exchange));

    let bob = arbitrator_view
        .withdraw(&addr("bob"), sub.item, RoundId::new(sub.request, 0))
        .unwrap();
    assert_eq!(bob, Amount::new(25));
    assert_eq!(shared.with(|e| e.amount_withdrawable(&addr("bob"), round1)), Amount::new(10));
}

// ---------------------------------------------------------------------------
// Escrow
// ---------------------------------------------------------------------------

#[test]
fn contested_escrow_overturned_on_appeal() {
    let (engine, clock) = engine::<EscrowPayment>();
    let mut book = EscrowBook::new(engine);
    let payment = EscrowPayment {
        sender: addr("buyer"),
        receiver: addr("seller"),
        amount: Amount::new(5_000),
        terms_uri: "/ipfs/purchase-agreement".to_string(),
        reference: "order-1138".to_string(),
    };

    let claim = book
        .claim_release(&addr("seller"), payment, DEPOSIT, Some("/ipfs/delivery-proof"))
        .unwrap();
    book.contest(&addr("buyer"), claim.item, DEPOSIT, Some("/ipfs/damaged-goods"))
        .unwrap();
    let dispute = book
        .engine()
        .request(claim.request)
        .and_then(|r| r.dispute_id())
        .unwrap();
    book.engine_mut()
        .rule(&addr("arbitrator"), dispute, Ruling::Refuse)
        .unwrap();

    // both sides fund, the appeal is raised, and the second ruling releases
    let round1 = RoundId::new(claim.request, 1);
    book.engine_mut()
        .fund_appeal(&addr("seller"), round1, Party::Requester, Amount::new(10))
        .unwrap();
    let raised = book
        .engine_mut()
        .fund_appeal(&addr("buyer"), round1, Party::Challenger, Amount::new(10))
        .unwrap();
    assert!(raised.appeal_raised);
    book.engine_mut()
        .rule(&addr("arbitrator"), dispute, Ruling::Accept)
        .unwrap();
    assert_eq!(book.outcome(claim.item).unwrap(), None);

    clock.advance(50);
    assert_eq!(book.settle(claim.item).unwrap(), EscrowOutcome::Released);
    let seller = book
        .engine_mut()
        .withdraw_all(&addr("seller"), claim.item, claim.request)
        .unwrap();
    // round 0 pool 25 plus round 1 pool 10
    assert_eq!(seller, Amount::new(35));
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

#[test]
fn translation_delivery_accepted_without_challenge() {
    let (engine, clock) = engine::<TranslationSubmission>();
    let mut market = TranslationMarket::new(engine);
    let work = TranslationSubmission {
        task_ref: "task-7".to_string(),
        translator: addr("translator"),
        source_language: "en".to_string(),
        target_language: "fr".to_string(),
        translation_uri: "/ipfs/QmTraduction".to_string(),
    };

    assert!(matches!(
        market.deliver(&addr("impostor"), work.clone(), DEPOSIT, None),
        Err(DomainError::WrongParty { role: "translator", .. })
    ));
    assert!(matches!(
        market.dispute_quality(&addr("client"), "task-7", DEPOSIT, None),
        Err(DomainError::Unsupported { .. })
    ));

    let sub = market
        .deliver(&addr("translator"), work, DEPOSIT, None)
        .unwrap();
    assert!(!market.is_accepted("task-7"));
    clock.advance(100);
    market.engine_mut().execute(sub.request).unwrap();
    assert!(market.is_accepted("task-7"));
}

#[test]
fn disputed_translation_is_rejected() {
    let (engine, clock) = engine::<TranslationSubmission>();
    let mut market = TranslationMarket::new(engine);
    let work = TranslationSubmission {
        task_ref: "task-8".to_string(),
        translator: addr("translator"),
        source_language: "de".to_string(),
        target_language: "en".to_string(),
        translation_uri: "/ipfs/QmMachineOutput".to_string(),
    };
    let sub = market
        .deliver(&addr("translator"), work, DEPOSIT, None)
        .unwrap();
    market
        .dispute_quality(&addr("client"), "task-8", DEPOSIT, Some("/ipfs/review"))
        .unwrap();
    let dispute = market
        .engine()
        .request(sub.request)
        .and_then(|r| r.dispute_id())
        .unwrap();
    market
        .engine_mut()
        .rule(&addr("arbitrator"), dispute, Ruling::Refuse)
        .unwrap();
    clock.advance(100);
    market.engine_mut().execute(sub.request).unwrap();
    assert!(!market.is_accepted("task-8"));
}
