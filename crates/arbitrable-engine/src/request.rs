//! # Request Ledger
//!
//! A [`Request`] asks for an item's status to change. It owns the deposit
//! rules, the challenge window, the dispute correlation and the sequence of
//! funding [`Round`]s.
//!
//! Each request snapshots its [`RequestTerms`] at creation: governance
//! parameters, the arbitrator and the meta-evidence revision. Later
//! governance changes never reach an open request.

use arbitrable_core::{Address, Amount, DisputeId, ItemId, RequestId, RoundId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::clock::ChallengeWindow;
use crate::config::GovernanceParams;
use crate::error::EngineError;
use crate::gateway::Ruling;
use crate::registry::ItemStatus;
use crate::round::{Round, Standing};

/// What a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Add the item to the registry.
    Registration,
    /// Remove the item from the registry.
    Clearing,
}

impl RequestKind {
    /// The status the item reaches if the request is granted.
    pub fn target_status(&self) -> ItemStatus {
        match self {
            Self::Registration => ItemStatus::Registered,
            Self::Clearing => ItemStatus::Absent,
        }
    }

    /// The status the item returns to if the request is refused.
    pub fn previous_status(&self) -> ItemStatus {
        match self {
            Self::Registration => ItemStatus::Absent,
            Self::Clearing => ItemStatus::Registered,
        }
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "REGISTRATION",
            Self::Clearing => "CLEARING",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters frozen into a request when it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTerms {
    /// The arbitrator disputes of this request go to.
    pub arbitrator: Address,
    /// Governance parameters in force at creation.
    pub params: GovernanceParams,
    /// Meta-evidence revision in force at creation.
    pub meta_evidence_revision: u64,
    /// The meta-evidence URI for this request's kind.
    pub meta_evidence: String,
}

impl RequestTerms {
    /// Minimum deposit for requesting or challenging:
    /// `base_deposit + cost + cost * shared / DIVISOR`.
    pub fn required_deposit(&self, arbitration_cost: Amount) -> Result<Amount, EngineError> {
        arbitration_cost
            .with_stake(self.params.multipliers.shared)
            .and_then(|fee| fee.checked_add(self.params.base_deposit))
            .ok_or_else(|| EngineError::overflow("required deposit"))
    }

    /// Appeal fee owed by a party with the given standing:
    /// `cost + cost * multiplier / DIVISOR`.
    pub fn appeal_fee(&self, appeal_cost: Amount, standing: Standing) -> Result<Amount, EngineError> {
        appeal_cost
            .with_stake(self.params.multipliers.for_standing(standing))
            .ok_or_else(|| EngineError::overflow("appeal fee"))
    }
}

/// A request to change an item's status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub(crate) id: RequestId,
    pub(crate) item: ItemId,
    pub(crate) kind: RequestKind,
    pub(crate) submitted_at: Timestamp,
    pub(crate) challenge_window: ChallengeWindow,
    pub(crate) disputed: bool,
    pub(crate) dispute_id: Option<DisputeId>,
    pub(crate) resolved: bool,
    pub(crate) ruling: Ruling,
    pub(crate) requester: Address,
    pub(crate) challenger: Option<Address>,
    pub(crate) rounds: Vec<Round>,
    pub(crate) terms: RequestTerms,
}

impl Request {
    pub(crate) fn open(
        id: RequestId,
        item: ItemId,
        kind: RequestKind,
        requester: Address,
        deposit: Amount,
        now: Timestamp,
        terms: RequestTerms,
    ) -> Self {
        let challenge_window = ChallengeWindow::open(now, terms.params.challenge_period_secs);
        Self {
            id,
            item,
            kind,
            submitted_at: now,
            challenge_window,
            disputed: false,
            dispute_id: None,
            resolved: false,
            ruling: Ruling::Other,
            rounds: vec![Round::opening(&requester, deposit)],
            requester,
            challenger: None,
            terms,
        }
    }

    /// The request identifier.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// The item this request targets.
    pub fn item(&self) -> ItemId {
        self.item
    }

    /// What the request asks for.
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// When the request was submitted.
    pub fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }

    /// The challenge window.
    pub fn challenge_window(&self) -> ChallengeWindow {
        self.challenge_window
    }

    /// Whether the request was challenged.
    pub fn disputed(&self) -> bool {
        self.disputed
    }

    /// The arbitrator's dispute, once challenged.
    pub fn dispute_id(&self) -> Option<DisputeId> {
        self.dispute_id
    }

    /// Whether the request reached its final outcome.
    pub fn resolved(&self) -> bool {
        self.resolved
    }

    /// The latest ruling, or the final one once resolved.
    pub fn ruling(&self) -> Ruling {
        self.ruling
    }

    /// Who opened the request.
    pub fn requester(&self) -> &Address {
        &self.requester
    }

    /// Who challenged it.
    pub fn challenger(&self) -> Option<&Address> {
        self.challenger.as_ref()
    }

    /// All rounds, oldest first.
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// The snapshotted terms.
    pub fn terms(&self) -> &RequestTerms {
        &self.terms
    }

    /// A round by index.
    pub fn round(&self, index: u32) -> Option<&Round> {
        self.rounds.get(index as usize)
    }

    /// Identifier of the latest round.
    pub fn current_round_id(&self) -> RoundId {
        let last = self.rounds.len().saturating_sub(1);
        RoundId::new(self.id, u32::try_from(last).unwrap_or(u32::MAX))
    }

    /// The latest round.
    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub(crate) fn current_round_mut(&mut self) -> Option<&mut Round> {
        self.rounds.last_mut()
    }

    /// Fail with [`EngineError::AlreadyResolved`] once resolved.
    pub fn ensure_unresolved(&self) -> Result<(), EngineError> {
        if self.resolved {
            return Err(EngineError::AlreadyResolved {
                target: self.id.to_string(),
            });
        }
        Ok(())
    }

    /// Check that a challenge is admissible at `now`.
    ///
    /// # Errors
    ///
    /// [`EngineError::AlreadyResolved`], [`EngineError::AlreadyChallenged`]
    /// or [`EngineError::DeadlinePassed`].
    pub fn admit_challenge(&self, now: Timestamp) -> Result<(), EngineError> {
        self.ensure_unresolved()?;
        if self.disputed {
            return Err(EngineError::AlreadyChallenged {
                request: self.id.to_string(),
            });
        }
        self.challenge_window.ensure_open(now, "challenge")
    }

    /// The item status this request leaves behind under `ruling`.
    pub fn resulting_status(&self, ruling: Ruling) -> ItemStatus {
        match ruling {
            Ruling::Accept => self.kind.target_status(),
            Ruling::Refuse | Ruling::Other => self.kind.previous_status(),
        }
    }
}
