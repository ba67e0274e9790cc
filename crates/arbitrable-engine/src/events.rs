//! # Event Log
//!
//! Append-only, sequenced record of everything the engine committed. An
//! event is appended only after its operation succeeded, so the log never
//! mentions a rolled-back call.
//!
//! Evidence and meta-evidence URIs are carried verbatim together with their
//! SHA-256 digest; the engine never dereferences them.

use arbitrable_core::{
    sha256_digest, Address, Amount, ContentDigest, DisputeId, ItemId, RequestId, RoundId,
    Timestamp,
};
use serde::{Deserialize, Serialize};

use crate::config::GovernanceParams;
use crate::gateway::Ruling;
use crate::registry::ItemStatus;
use crate::request::RequestKind;
use crate::round::Party;

/// An opaque evidence reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// The URI as submitted.
    pub uri: String,
    /// SHA-256 of the URI bytes.
    pub digest: ContentDigest,
    /// Who submitted it.
    pub submitter: Address,
}

impl Evidence {
    /// Wrap a URI submitted by `submitter`.
    pub fn new(submitter: &Address, uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            digest: sha256_digest(uri.as_bytes()),
            submitter: submitter.clone(),
        }
    }
}

/// Something the engine did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A request was opened.
    RequestSubmitted {
        /// The item.
        item: ItemId,
        /// The new request.
        request: RequestId,
        /// What it asks for.
        kind: RequestKind,
        /// Who opened it.
        requester: Address,
        /// The deposit held in round 0.
        deposit: Amount,
        /// Meta-evidence revision snapshotted.
        meta_evidence_revision: u64,
    },
    /// Evidence was attached to a request.
    EvidenceSubmitted {
        /// The request.
        request: RequestId,
        /// The evidence.
        evidence: Evidence,
    },
    /// A challenge opened a dispute.
    DisputeCreated {
        /// The challenged request.
        request: RequestId,
        /// The arbitrator's dispute.
        dispute: DisputeId,
        /// Who challenged.
        challenger: Address,
        /// Fee paid to the arbitrator.
        arbitration_cost: Amount,
    },
    /// The arbitrator ruled.
    RulingGiven {
        /// The request.
        request: RequestId,
        /// The dispute.
        dispute: DisputeId,
        /// The round whose appeal window the ruling opened.
        round: RoundId,
        /// The ruling.
        ruling: Ruling,
    },
    /// An appeal contribution was accepted.
    Contribution {
        /// The round funded.
        round: RoundId,
        /// The side funded.
        party: Party,
        /// The contributor.
        contributor: Address,
        /// Amount kept by the round.
        accepted: Amount,
        /// Amount returned to the contributor.
        refunded: Amount,
    },
    /// A side reached its required appeal fee.
    SideFullyPaid {
        /// The round.
        round: RoundId,
        /// The side.
        party: Party,
    },
    /// Both sides funded and the appeal was raised.
    AppealRaised {
        /// The request.
        request: RequestId,
        /// The dispute.
        dispute: DisputeId,
        /// The round that paid for the appeal.
        round: RoundId,
        /// Fee paid to the arbitrator.
        appeal_cost: Amount,
    },
    /// A request reached its final outcome.
    RequestResolved {
        /// The request.
        request: RequestId,
        /// The final ruling.
        ruling: Ruling,
    },
    /// An item changed status.
    StatusChanged {
        /// The item.
        item: ItemId,
        /// Status before.
        from: ItemStatus,
        /// Status after.
        to: ItemStatus,
    },
    /// A beneficiary was credited from a round.
    Withdrawal {
        /// The round.
        round: RoundId,
        /// The beneficiary.
        beneficiary: Address,
        /// Amount credited.
        amount: Amount,
    },
    /// Governance parameters were replaced.
    GovernanceUpdated {
        /// The new parameters.
        params: GovernanceParams,
    },
    /// Meta-evidence was replaced.
    MetaEvidenceUpdated {
        /// The new revision number.
        revision: u64,
        /// Registration meta-evidence URI.
        registration: String,
        /// Clearing meta-evidence URI.
        clearing: String,
    },
}

/// A sequenced event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, from zero.
    pub sequence: u64,
    /// When the event was committed.
    pub at: Timestamp,
    /// The event.
    pub event: EngineEvent,
}

/// Append-only event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, at: Timestamp, event: EngineEvent) {
        let sequence = self.records.len() as u64;
        self.records.push(EventRecord {
            sequence,
            at,
            event,
        });
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records from `sequence` onward.
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_carries_digest_of_uri() {
        let who = Address::new("alice").unwrap();
        let ev = Evidence::new(&who, "/ipfs/QmEvidence");
        assert_eq!(ev.digest, sha256_digest(b"/ipfs/QmEvidence"));
        assert_eq!(ev.uri, "/ipfs/QmEvidence");
    }

    #[test]
    fn log_sequences_from_zero() {
        let mut log = EventLog::new();
        let at = Timestamp::from_unix_seconds(5).unwrap();
        for i in 0..3 {
            log.append(
                at,
                EngineEvent::RequestResolved {
                    request: RequestId::new(i),
                    ruling: Ruling::Accept,
                },
            );
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.records()[2].sequence, 2);
        assert_eq!(log.since(1).len(), 2);
        assert!(log.since(10).is_empty());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = EngineEvent::SideFullyPaid {
            round: RoundId::new(RequestId::new(1), 1),
            party: Party::Challenger,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "side_fully_paid");
    }
}
