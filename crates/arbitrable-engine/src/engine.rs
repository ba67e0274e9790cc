//! # Engine
//!
//! The generic arbitrable-item engine. One [`Engine`] owns an item
//! registry for a single payload type, every request and round on those
//! items, the custody vault and the event log. It is bound to exactly one
//! arbitrator, reached through an [`ArbitratorGateway`].
//!
//! ## Atomicity
//!
//! Every operation runs in three phases:
//!
//! 1. **Validate** preconditions against current state and plan every
//!    state change, including vault movements, with checked arithmetic.
//! 2. **Call out** to the gateway, if the operation needs it. A gateway
//!    error aborts here.
//! 3. **Commit** the plan. Nothing in this phase can fail.
//!
//! An `Err` therefore always means nothing changed.

use std::collections::BTreeMap;

use arbitrable_core::{
    Address, Amount, Clock, DisputeId, IdAllocator, ItemId, RequestId, RoundId, Timestamp,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capability::{Arbitrable, FundingReceipt, Resolution, Submission};
use crate::clock::AppealWindow;
use crate::config::{ConfigError, EngineConfig, GovernanceParams};
use crate::distributor::{apply_withdrawal, payout_for, plan_withdrawal, WithdrawalPlan};
use crate::error::EngineError;
use crate::events::{EngineEvent, EventLog, Evidence};
use crate::gateway::{ArbitratorGateway, Ruling, RULING_OPTIONS};
use crate::registry::{Item, ItemPage, ItemPayload, ItemRegistry, ItemStatus};
use crate::request::{Request, RequestKind, RequestTerms};
use crate::round::{Party, Round, RulingRecord, Standing};
use crate::vault::Vault;

/// The meta-evidence currently attached to new requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaEvidence {
    /// Incremented on every update, starting at zero.
    pub revision: u64,
    /// URI describing registration requests.
    pub registration: String,
    /// URI describing clearing requests.
    pub clearing: String,
}

impl MetaEvidence {
    fn for_kind(&self, kind: RequestKind) -> &str {
        match kind {
            RequestKind::Registration => &self.registration,
            RequestKind::Clearing => &self.clearing,
        }
    }
}

enum Target<P> {
    Existing(ItemId),
    New { key: String, payload: P },
}

/// The arbitrable-item engine.
pub struct Engine<P, G, C> {
    governor: Address,
    params: GovernanceParams,
    meta_evidence: MetaEvidence,
    registry: ItemRegistry<P>,
    requests: BTreeMap<RequestId, Request>,
    request_ids: IdAllocator<RequestId>,
    disputes: BTreeMap<DisputeId, RequestId>,
    vault: Vault,
    events: EventLog,
    gateway: G,
    clock: C,
}

impl<P, G, C> std::fmt::Debug for Engine<P, G, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("governor", &self.governor)
            .field("items", &self.registry.len())
            .field("requests", &self.requests.len())
            .field("held", &self.vault.held())
            .finish_non_exhaustive()
    }
}

impl<P, G, C> Engine<P, G, C>
where
    P: ItemPayload,
    G: ArbitratorGateway,
    C: Clock,
{
    /// Build an engine from a validated configuration.
    ///
    /// # Errors
    ///
    /// [`EngineError::Config`] if the configuration is invalid or the
    /// gateway is not the configured arbitrator.
    pub fn new(config: EngineConfig, gateway: G, clock: C) -> Result<Self, EngineError> {
        config.validate()?;
        if gateway.address() != &config.arbitrator {
            return Err(ConfigError::ArbitratorMismatch {
                configured: config.arbitrator,
                gateway: gateway.address().clone(),
            }
            .into());
        }
        info!(
            governor = %config.governor,
            arbitrator = %config.arbitrator,
            "arbitrable engine initialised"
        );
        Ok(Self {
            governor: config.governor,
            params: config.params,
            meta_evidence: MetaEvidence {
                revision: 0,
                registration: config.registration_meta_evidence,
                clearing: config.clearing_meta_evidence,
            },
            registry: ItemRegistry::new(),
            requests: BTreeMap::new(),
            request_ids: IdAllocator::new(),
            disputes: BTreeMap::new(),
            vault: Vault::new(),
            events: EventLog::new(),
            gateway,
            clock,
        })
    }

    // ── Requests ───────────────────────────────────────────────────────

    /// Open a request for `payload`, creating its item on first use.
    ///
    /// The payload is located by its key: a payload seen before targets
    /// the existing item, whose status decides whether this is a
    /// registration or a clearing request.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidPayload`], [`EngineError::InvalidState`] if
    /// the item already has an active request, and
    /// [`EngineError::InsufficientFunds`] if `deposit` is below
    /// `base_deposit + cost + shared stake`.
    pub fn submit_item(
        &mut self,
        requester: &Address,
        payload: P,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, EngineError> {
        payload.validate()?;
        let key = payload.key();
        let target = match self.registry.by_key(&key) {
            Some(item) => Target::Existing(item.id()),
            None => Target::New { key, payload },
        };
        self.open_request(requester, target, deposit, evidence)
    }

    /// Open a request on an existing item.
    ///
    /// # Errors
    ///
    /// As [`submit_item`](Self::submit_item), plus
    /// [`EngineError::UnknownId`] for an unknown item.
    pub fn request_status_change(
        &mut self,
        requester: &Address,
        item: ItemId,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, EngineError> {
        self.open_request(requester, Target::Existing(item), deposit, evidence)
    }

    fn open_request(
        &mut self,
        requester: &Address,
        target: Target<P>,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, EngineError> {
        let kind = match &target {
            Target::Existing(id) => self.registry.admit_request(*id)?,
            Target::New { .. } => RequestKind::Registration,
        };
        let terms = self.terms_for(kind);
        let cost = self
            .gateway
            .dispute_cost(&terms.params.arbitrator_extra_data)?;
        let required = terms.required_deposit(cost)?;
        if deposit < required {
            return Err(EngineError::InsufficientFunds {
                operation: "request_status_change".to_string(),
                required,
                provided: deposit,
            });
        }
        let totals = self.vault.totals().receive(deposit)?;
        let now = self.clock.now();

        // commit
        let item_id = match target {
            Target::Existing(id) => id,
            Target::New { key, payload } => self.registry.insert(key, payload),
        };
        let request_id = self.request_ids.allocate();
        let revision = terms.meta_evidence_revision;
        self.requests.insert(
            request_id,
            Request::open(
                request_id,
                item_id,
                kind,
                requester.clone(),
                deposit,
                now,
                terms,
            ),
        );
        self.registry.begin_request(item_id, request_id, kind);
        self.vault.commit(totals);
        self.events.append(
            now,
            EngineEvent::RequestSubmitted {
                item: item_id,
                request: request_id,
                kind,
                requester: requester.clone(),
                deposit,
                meta_evidence_revision: revision,
            },
        );
        self.events.append(
            now,
            EngineEvent::StatusChanged {
                item: item_id,
                from: kind.previous_status(),
                to: ItemStatus::Requested(kind),
            },
        );
        if let Some(uri) = evidence {
            self.events.append(
                now,
                EngineEvent::EvidenceSubmitted {
                    request: request_id,
                    evidence: Evidence::new(requester, uri),
                },
            );
        }
        info!(
            item = %item_id,
            request = %request_id,
            kind = %kind,
            requester = %requester,
            deposit = %deposit,
            "request submitted"
        );
        Ok(Submission {
            item: item_id,
            request: request_id,
            kind,
            deposit,
        })
    }

    /// Challenge a request within its challenge window, opening a dispute
    /// with the arbitrator.
    ///
    /// Both deposits pool into round 0; the arbitration cost is paid out of
    /// the pool and the rest becomes round 0's reward. Round 1 is opened for
    /// appeal funding.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownId`], [`EngineError::AlreadyResolved`],
    /// [`EngineError::AlreadyChallenged`], [`EngineError::DeadlinePassed`],
    /// [`EngineError::InsufficientFunds`] and [`EngineError::Gateway`].
    pub fn challenge(
        &mut self,
        challenger: &Address,
        request_id: RequestId,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<DisputeId, EngineError> {
        const OP: &str = "challenge";
        let now = self.clock.now();
        let request = self
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| EngineError::unknown("request", request_id))?;
        request.admit_challenge(now)?;
        let extra = request.terms.params.arbitrator_extra_data.clone();
        let cost = self.gateway.dispute_cost(&extra)?;
        let required = request.terms.required_deposit(cost)?;
        if deposit < required {
            return Err(EngineError::InsufficientFunds {
                operation: OP.to_string(),
                required,
                provided: deposit,
            });
        }
        let opening = request
            .rounds
            .first()
            .ok_or_else(|| EngineError::invalid_state(OP, "request has no opening round"))?;
        let fee_rewards = opening
            .paid()
            .requester
            .checked_add(deposit)
            .and_then(|pool| pool.checked_sub(cost))
            .ok_or_else(|| EngineError::overflow("round 0 fee rewards"))?;
        let totals = self
            .vault
            .totals()
            .receive(deposit)?
            .pay_arbitrator(cost)?;

        let dispute = self.gateway.create_dispute(RULING_OPTIONS, &extra, cost)?;

        // commit
        if let Some(opening) = request.rounds.first_mut() {
            opening.apply_challenge(challenger, deposit, cost, fee_rewards);
        }
        request.rounds.push(Round::default());
        request.disputed = true;
        request.dispute_id = Some(dispute);
        request.challenger = Some(challenger.clone());
        self.disputes.insert(dispute, request_id);
        self.vault.commit(totals);
        self.events.append(
            now,
            EngineEvent::DisputeCreated {
                request: request_id,
                dispute,
                challenger: challenger.clone(),
                arbitration_cost: cost,
            },
        );
        if let Some(uri) = evidence {
            self.events.append(
                now,
                EngineEvent::EvidenceSubmitted {
                    request: request_id,
                    evidence: Evidence::new(challenger, uri),
                },
            );
        }
        info!(
            request = %request_id,
            dispute = %dispute,
            challenger = %challenger,
            cost = %cost,
            "request challenged"
        );
        Ok(dispute)
    }

    /// Attach evidence to an unresolved request.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownId`] and [`EngineError::AlreadyResolved`].
    pub fn submit_evidence(
        &mut self,
        submitter: &Address,
        request_id: RequestId,
        uri: &str,
    ) -> Result<(), EngineError> {
        let request = self.request_or_err(request_id)?;
        request.ensure_unresolved()?;
        self.events.append(
            self.clock.now(),
            EngineEvent::EvidenceSubmitted {
                request: request_id,
                evidence: Evidence::new(submitter, uri),
            },
        );
        debug!(request = %request_id, submitter = %submitter, "evidence submitted");
        Ok(())
    }

    // ── Arbitration ────────────────────────────────────────────────────

    /// Deliver the arbitrator's ruling for `dispute`, opening the current
    /// round's appeal window.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`] unless `caller` is the arbitrator,
    /// [`EngineError::UnknownId`] for a dispute this engine never opened,
    /// and [`EngineError::AlreadyResolved`] once the request resolved or
    /// the current round already has a ruling.
    pub fn rule(
        &mut self,
        caller: &Address,
        dispute: DisputeId,
        ruling: Ruling,
    ) -> Result<(), EngineError> {
        if caller != self.gateway.address() {
            warn!(caller = %caller, dispute = %dispute, "ruling rejected: caller is not the arbitrator");
            return Err(EngineError::Unauthorized {
                caller: caller.clone(),
                operation: "rule".to_string(),
            });
        }
        let request_id = *self.disputes.get(&dispute).ok_or_else(|| {
            warn!(dispute = %dispute, "ruling rejected: unknown dispute");
            EngineError::unknown("dispute", dispute)
        })?;
        let now = self.clock.now();
        let request = self
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| EngineError::unknown("request", request_id))?;
        let round_id = request.current_round_id();
        let awaiting = !request.resolved
            && request
                .current_round()
                .is_some_and(|round| round.ruling().is_none());
        if !awaiting {
            warn!(dispute = %dispute, "ruling rejected: nothing awaits a ruling");
            return Err(EngineError::AlreadyResolved {
                target: dispute.to_string(),
            });
        }
        let window = AppealWindow::open(now, request.terms.params.appeal_period_secs);

        // commit
        if let Some(round) = request.current_round_mut() {
            round.record_ruling(RulingRecord {
                ruling,
                given_at: now,
                window,
            });
        }
        request.ruling = ruling;
        self.events.append(
            now,
            EngineEvent::RulingGiven {
                request: request_id,
                dispute,
                round: round_id,
                ruling,
            },
        );
        info!(
            request = %request_id,
            dispute = %dispute,
            ruling = %ruling,
            appeal_deadline = %window.end,
            "ruling received"
        );
        Ok(())
    }

    /// Contribute `amount` toward `party`'s appeal fee in the current round.
    ///
    /// Any part of `amount` above the remaining gap is returned in the
    /// receipt. The contribution that completes the second side raises the
    /// appeal and opens a new round.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] for a stale round, party `None`, a
    /// fully paid side, or a round still awaiting its ruling;
    /// [`EngineError::DeadlinePassed`] outside the party's funding window;
    /// [`EngineError::Gateway`] if the appeal is rejected.
    pub fn fund_appeal(
        &mut self,
        contributor: &Address,
        round_id: RoundId,
        party: Party,
        amount: Amount,
    ) -> Result<FundingReceipt, EngineError> {
        const OP: &str = "fund_appeal";
        let now = self.clock.now();
        let request = self
            .requests
            .get_mut(&round_id.request)
            .ok_or_else(|| EngineError::unknown("request", round_id.request))?;
        request.ensure_unresolved()?;
        if request.round(round_id.index).is_none() {
            return Err(EngineError::unknown("round", round_id));
        }
        if round_id != request.current_round_id() {
            return Err(EngineError::invalid_state(
                OP,
                format!("{round_id} is not the current round"),
            ));
        }
        let dispute = request
            .dispute_id
            .ok_or_else(|| EngineError::invalid_state(OP, "request is not disputed"))?;
        if party == Party::None {
            return Err(EngineError::invalid_state(OP, "cannot fund party NONE"));
        }
        let round = request
            .current_round()
            .ok_or_else(|| EngineError::unknown("round", round_id))?;
        let record = *round
            .ruling()
            .ok_or_else(|| EngineError::invalid_state(OP, "round is awaiting a ruling"))?;
        let standing = Standing::of(party, record.ruling);
        record.window.ensure_fundable(now, standing, OP)?;

        let extra = request.terms.params.arbitrator_extra_data.clone();
        let appeal_cost = self.gateway.appeal_cost(dispute, &extra)?;
        let required = request.terms.appeal_fee(appeal_cost, standing)?;
        let plan = round.plan_contribution(contributor, party, amount, required)?;
        let mut totals = self.vault.totals().receive(plan.accepted)?;
        let raises_appeal = plan.completes && round.fully_paid().get(party.opposite());
        let fee_rewards = if raises_appeal {
            totals = totals.pay_arbitrator(appeal_cost)?;
            Some(round.rewards_after_fee(Some(&plan), appeal_cost)?)
        } else {
            None
        };

        if raises_appeal {
            self.gateway.appeal(dispute, &extra, appeal_cost)?;
        }

        // commit
        if let Some(round) = request.current_round_mut() {
            round.apply_contribution(&plan);
            if let Some(rewards) = fee_rewards {
                round.mark_arbitrated(appeal_cost, rewards);
            }
        }
        if raises_appeal {
            request.rounds.push(Round::default());
        }
        self.vault.commit(totals);
        self.events.append(
            now,
            EngineEvent::Contribution {
                round: round_id,
                party,
                contributor: contributor.clone(),
                accepted: plan.accepted,
                refunded: plan.refunded,
            },
        );
        if plan.completes {
            self.events
                .append(now, EngineEvent::SideFullyPaid { round: round_id, party });
        }
        if raises_appeal {
            self.events.append(
                now,
                EngineEvent::AppealRaised {
                    request: round_id.request,
                    dispute,
                    round: round_id,
                    appeal_cost,
                },
            );
            info!(
                request = %round_id.request,
                dispute = %dispute,
                cost = %appeal_cost,
                "appeal raised"
            );
        }
        debug!(
            round = %round_id,
            party = %party,
            contributor = %contributor,
            accepted = %plan.accepted,
            refunded = %plan.refunded,
            "appeal contribution"
        );
        Ok(FundingReceipt {
            round: round_id,
            party,
            accepted: plan.accepted,
            refunded: plan.refunded,
            fully_paid: plan.completes,
            appeal_raised: raises_appeal,
        })
    }

    // ── Resolution ─────────────────────────────────────────────────────

    /// Grant an unchallenged request once its challenge window elapsed.
    ///
    /// The request resolves as [`Ruling::Accept`] and the requester's
    /// deposit becomes withdrawable in full.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownId`], [`EngineError::AlreadyResolved`],
    /// [`EngineError::InvalidState`] for a disputed request and
    /// [`EngineError::DeadlineNotReached`] inside the challenge window.
    pub fn execute_request(&mut self, request_id: RequestId) -> Result<Resolution, EngineError> {
        const OP: &str = "execute_request";
        let now = self.clock.now();
        let request = self
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| EngineError::unknown("request", request_id))?;
        request.ensure_unresolved()?;
        if request.disputed {
            return Err(EngineError::invalid_state(
                OP,
                "request is disputed; resolve it with execute_ruling",
            ));
        }
        request.challenge_window.ensure_elapsed(now, OP)?;
        Ok(self.resolve(request_id, Ruling::Accept, now))
    }

    /// Finalize a disputed request once its funding race is decided.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownId`], [`EngineError::AlreadyResolved`],
    /// [`EngineError::InvalidState`] for an undisputed request or one still
    /// awaiting a ruling, and [`EngineError::DeadlineNotReached`] while the
    /// outcome can still change.
    pub fn execute_ruling(&mut self, request_id: RequestId) -> Result<Resolution, EngineError> {
        const OP: &str = "execute_ruling";
        let now = self.clock.now();
        let request = self.request_or_err(request_id)?;
        request.ensure_unresolved()?;
        if !request.disputed {
            return Err(EngineError::invalid_state(OP, "request is not disputed"));
        }
        let round = request
            .current_round()
            .ok_or_else(|| EngineError::invalid_state(OP, "request has no rounds"))?;
        let ruling = round.settle_race(now)?;
        if ruling != request.ruling {
            info!(
                request = %request_id,
                stated = %request.ruling,
                final_ruling = %ruling,
                "ruling flipped by sole funded side"
            );
        }
        Ok(self.resolve(request_id, ruling, now))
    }

    /// Resolve with whichever of [`execute_request`](Self::execute_request)
    /// or [`execute_ruling`](Self::execute_ruling) applies.
    pub fn execute(&mut self, request_id: RequestId) -> Result<Resolution, EngineError> {
        if self.request_or_err(request_id)?.disputed {
            self.execute_ruling(request_id)
        } else {
            self.execute_request(request_id)
        }
    }

    /// Commit a validated resolution. Infallible: callers check the request
    /// exists and is unresolved.
    fn resolve(&mut self, request_id: RequestId, ruling: Ruling, now: Timestamp) -> Resolution {
        let mut item = None;
        let mut status = ItemStatus::Absent;
        if let Some(request) = self.requests.get_mut(&request_id) {
            request.resolved = true;
            request.ruling = ruling;
            for round in request.rounds.iter_mut() {
                let payout = payout_for(round, ruling);
                round.set_payout(payout);
            }
            status = request.resulting_status(ruling);
            item = Some(request.item);
        }
        self.events.append(
            now,
            EngineEvent::RequestResolved {
                request: request_id,
                ruling,
            },
        );
        if let Some(item) = item {
            if let Some(from) = self.registry.finish_request(item, status) {
                self.events.append(
                    now,
                    EngineEvent::StatusChanged {
                        item,
                        from,
                        to: status,
                    },
                );
            }
        }
        info!(request = %request_id, ruling = %ruling, status = %status, "request resolved");
        Resolution {
            request: request_id,
            ruling,
            status,
        }
    }

    // ── Withdrawals ────────────────────────────────────────────────────

    /// Credit `beneficiary` with their entitlement from one round of a
    /// resolved request. A second call for the same round yields zero.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownId`] for an unknown request or round or an
    /// item that does not own the request, and
    /// [`EngineError::InvalidState`] while the request is unresolved.
    pub fn withdraw(
        &mut self,
        beneficiary: &Address,
        item: ItemId,
        round_id: RoundId,
    ) -> Result<Amount, EngineError> {
        let request = self.resolved_request(item, round_id.request)?;
        let round = request
            .round(round_id.index)
            .ok_or_else(|| EngineError::unknown("round", round_id))?;
        let plan = plan_withdrawal(round, beneficiary)?;
        self.commit_withdrawals(beneficiary, round_id.request, vec![(round_id.index, plan)])
    }

    /// Withdraw from every round of a resolved request at once.
    ///
    /// # Errors
    ///
    /// As [`withdraw`](Self::withdraw).
    pub fn withdraw_all(
        &mut self,
        beneficiary: &Address,
        item: ItemId,
        request_id: RequestId,
    ) -> Result<Amount, EngineError> {
        let request = self.resolved_request(item, request_id)?;
        let plans = request
            .rounds
            .iter()
            .enumerate()
            .map(|(index, round)| {
                let index = u32::try_from(index).map_err(|_| EngineError::overflow("round index"))?;
                Ok((index, plan_withdrawal(round, beneficiary)?))
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        self.commit_withdrawals(beneficiary, request_id, plans)
    }

    fn resolved_request(&self, item: ItemId, request_id: RequestId) -> Result<&Request, EngineError> {
        let request = self.request_or_err(request_id)?;
        if request.item != item {
            return Err(EngineError::unknown("item", item));
        }
        if !request.resolved {
            return Err(EngineError::invalid_state(
                "withdraw",
                format!("{request_id} is not resolved"),
            ));
        }
        Ok(request)
    }

    fn commit_withdrawals(
        &mut self,
        beneficiary: &Address,
        request_id: RequestId,
        plans: Vec<(u32, WithdrawalPlan)>,
    ) -> Result<Amount, EngineError> {
        let mut totals = self.vault.totals();
        let mut total = Amount::ZERO;
        for (_, plan) in &plans {
            totals = totals.disburse(plan.amount)?;
            total = total
                .checked_add(plan.amount)
                .ok_or_else(|| EngineError::overflow("withdrawal total"))?;
        }
        let balance = self.vault.plan_credit(beneficiary, total)?;
        let now = self.clock.now();

        // commit
        if let Some(request) = self.requests.get_mut(&request_id) {
            for (index, plan) in &plans {
                if let Some(round) = request.rounds.get_mut(*index as usize) {
                    apply_withdrawal(round, plan);
                }
            }
        }
        self.vault.commit(totals);
        self.vault.commit_credit(beneficiary, balance);
        for (index, plan) in plans.iter().filter(|(_, plan)| !plan.is_noop()) {
            self.events.append(
                now,
                EngineEvent::Withdrawal {
                    round: RoundId::new(request_id, *index),
                    beneficiary: beneficiary.clone(),
                    amount: plan.amount,
                },
            );
        }
        debug!(
            request = %request_id,
            beneficiary = %beneficiary,
            amount = %total,
            "withdrawal credited"
        );
        Ok(total)
    }

    // ── Governance ─────────────────────────────────────────────────────

    /// Replace the governance parameters. Open requests keep the terms
    /// they were created with.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`] unless `caller` is the governor and
    /// [`EngineError::Config`] for invalid parameters.
    pub fn update_governance(
        &mut self,
        caller: &Address,
        params: GovernanceParams,
    ) -> Result<(), EngineError> {
        self.ensure_governor(caller, "update_governance")?;
        params.validate()?;
        self.events.append(
            self.clock.now(),
            EngineEvent::GovernanceUpdated {
                params: params.clone(),
            },
        );
        self.params = params;
        info!(governor = %caller, "governance parameters updated");
        Ok(())
    }

    /// Replace both meta-evidence URIs and bump the revision. Returns the
    /// new revision.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`] unless `caller` is the governor.
    pub fn update_meta_evidence(
        &mut self,
        caller: &Address,
        registration: &str,
        clearing: &str,
    ) -> Result<u64, EngineError> {
        self.ensure_governor(caller, "update_meta_evidence")?;
        let revision = self
            .meta_evidence
            .revision
            .checked_add(1)
            .ok_or_else(|| EngineError::overflow("meta-evidence revision"))?;
        self.meta_evidence = MetaEvidence {
            revision,
            registration: registration.to_string(),
            clearing: clearing.to_string(),
        };
        self.events.append(
            self.clock.now(),
            EngineEvent::MetaEvidenceUpdated {
                revision,
                registration: registration.to_string(),
                clearing: clearing.to_string(),
            },
        );
        info!(revision, "meta-evidence updated");
        Ok(revision)
    }

    fn ensure_governor(&self, caller: &Address, operation: &str) -> Result<(), EngineError> {
        if caller != &self.governor {
            warn!(caller = %caller, operation, "governance call rejected");
            return Err(EngineError::Unauthorized {
                caller: caller.clone(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn terms_for(&self, kind: RequestKind) -> RequestTerms {
        RequestTerms {
            arbitrator: self.gateway.address().clone(),
            params: self.params.clone(),
            meta_evidence_revision: self.meta_evidence.revision,
            meta_evidence: self.meta_evidence.for_kind(kind).to_string(),
        }
    }

    // ── Views ──────────────────────────────────────────────────────────

    fn request_or_err(&self, id: RequestId) -> Result<&Request, EngineError> {
        self.requests
            .get(&id)
            .ok_or_else(|| EngineError::unknown("request", id))
    }

    /// The governor.
    pub fn governor(&self) -> &Address {
        &self.governor
    }

    /// Governance parameters applied to new requests.
    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    /// Meta-evidence applied to new requests.
    pub fn meta_evidence(&self) -> &MetaEvidence {
        &self.meta_evidence
    }

    /// An item by identifier.
    pub fn item(&self, id: ItemId) -> Option<&Item<P>> {
        self.registry.get(id)
    }

    /// An item by payload key.
    pub fn item_by_key(&self, key: &str) -> Option<&Item<P>> {
        self.registry.by_key(key)
    }

    /// One page of items; see [`ItemRegistry::list`].
    pub fn items(
        &self,
        status: Option<ItemStatus>,
        after: Option<ItemId>,
        limit: usize,
    ) -> ItemPage<'_, P> {
        self.registry.list(status, after, limit)
    }

    /// A request by identifier.
    pub fn request(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(&id)
    }

    /// Every request on an item, oldest first.
    pub fn requests_of(&self, item: ItemId) -> Vec<&Request> {
        self.registry
            .get(item)
            .map(|item| {
                item.requests()
                    .iter()
                    .filter_map(|id| self.requests.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A round by identifier.
    pub fn round(&self, id: RoundId) -> Option<&Round> {
        self.requests.get(&id.request)?.round(id.index)
    }

    /// The request a dispute belongs to.
    pub fn request_for_dispute(&self, dispute: DisputeId) -> Option<RequestId> {
        self.disputes.get(&dispute).copied()
    }

    /// What `beneficiary` would receive from [`withdraw`](Self::withdraw)
    /// right now. Zero for unresolved requests and unknown rounds.
    pub fn amount_withdrawable(&self, beneficiary: &Address, round: RoundId) -> Amount {
        self.requests
            .get(&round.request)
            .filter(|request| request.resolved)
            .and_then(|request| request.round(round.index))
            .and_then(|round| plan_withdrawal(round, beneficiary).ok())
            .map_or(Amount::ZERO, |plan| plan.amount)
    }

    /// The deposit a new request of `kind` requires at current prices.
    ///
    /// # Errors
    ///
    /// [`EngineError::Gateway`] if the arbitrator cannot price a dispute.
    pub fn required_deposit(&self, kind: RequestKind) -> Result<Amount, EngineError> {
        let terms = self.terms_for(kind);
        let cost = self
            .gateway
            .dispute_cost(&terms.params.arbitrator_extra_data)?;
        terms.required_deposit(cost)
    }

    /// The total appeal fee `party` must raise in the current round.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidState`] unless the request is disputed,
    /// unresolved and its current round has a ruling.
    pub fn required_appeal_fee(
        &self,
        request_id: RequestId,
        party: Party,
    ) -> Result<Amount, EngineError> {
        const OP: &str = "required_appeal_fee";
        let request = self.request_or_err(request_id)?;
        request.ensure_unresolved()?;
        if party == Party::None {
            return Err(EngineError::invalid_state(OP, "party NONE has no fee"));
        }
        let dispute = request
            .dispute_id
            .ok_or_else(|| EngineError::invalid_state(OP, "request is not disputed"))?;
        let record = request
            .current_round()
            .and_then(Round::ruling)
            .ok_or_else(|| EngineError::invalid_state(OP, "round is awaiting a ruling"))?;
        let cost = self
            .gateway
            .appeal_cost(dispute, &request.terms.params.arbitrator_extra_data)?;
        request
            .terms
            .appeal_fee(cost, Standing::of(party, record.ruling))
    }

    /// The appeal window of the request's current round, if open.
    pub fn appeal_window(&self, request_id: RequestId) -> Option<AppealWindow> {
        self.requests
            .get(&request_id)
            .filter(|request| !request.resolved)
            .and_then(Request::current_round)
            .and_then(Round::appeal_window)
    }

    /// Custody accounting.
    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    /// The event log.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// The arbitrator gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Mutable access to the arbitrator gateway, for adjusting prices in
    /// tests and demos.
    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// The time source.
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<P, G, C> Arbitrable for Engine<P, G, C>
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
        self.submit_item(requester, payload, deposit, evidence)
    }

    fn request_change(
        &mut self,
        requester: &Address,
        item: ItemId,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<Submission, EngineError> {
        self.request_status_change(requester, item, deposit, evidence)
    }

    fn challenge(
        &mut self,
        challenger: &Address,
        request: RequestId,
        deposit: Amount,
        evidence: Option<&str>,
    ) -> Result<DisputeId, EngineError> {
        Engine::challenge(self, challenger, request, deposit, evidence)
    }

    fn fund_appeal(
        &mut self,
        contributor: &Address,
        round: RoundId,
        party: Party,
        amount: Amount,
    ) -> Result<FundingReceipt, EngineError> {
        Engine::fund_appeal(self, contributor, round, party, amount)
    }

    fn rule(
        &mut self,
        caller: &Address,
        dispute: DisputeId,
        ruling: Ruling,
    ) -> Result<(), EngineError> {
        Engine::rule(self, caller, dispute, ruling)
    }

    fn execute(&mut self, request: RequestId) -> Result<Resolution, EngineError> {
        Engine::execute(self, request)
    }

    fn withdraw(
        &mut self,
        beneficiary: &Address,
        item: ItemId,
        round: RoundId,
    ) -> Result<Amount, EngineError> {
        Engine::withdraw(self, beneficiary, item, round)
    }

    fn status_of(&self, item: ItemId) -> Result<ItemStatus, EngineError> {
        self.registry
            .get(item)
            .map(Item::status)
            .ok_or_else(|| EngineError::unknown("item", item))
    }

    fn payload_of(&self, item: ItemId) -> Result<P, EngineError> {
        self.registry
            .get(item)
            .map(|item| item.payload().clone())
            .ok_or_else(|| EngineError::unknown("item", item))
    }

    fn active_request(&self, item: ItemId) -> Result<Option<RequestId>, EngineError> {
        self.registry
            .get(item)
            .map(Item::active_request)
            .ok_or_else(|| EngineError::unknown("item", item))
    }

    fn item_for_key(&self, key: &str) -> Option<ItemId> {
        self.registry.by_key(key).map(Item::id)
    }
}
