//! # Timeout Clock
//!
//! Deadline bookkeeping for the two windows a request goes through:
//!
//! - the **challenge window**, opened at submission, during which an
//!   opposing party may challenge; once it elapses unchallenged, anyone may
//!   execute the request;
//! - the **appeal window**, opened by each ruling, during which the engine
//!   waits for appeal fees. It is split at its midpoint: the side the ruling
//!   disfavors may only fund until `loser_deadline`, the favored side until
//!   `end`.
//!
//! Windows are half-open: an operation "inside" a window requires
//! `now < deadline`; an operation "after" it requires `now >= deadline`.

use arbitrable_core::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::round::Standing;

/// The period during which a request may be challenged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeWindow {
    /// When the request was submitted.
    pub opened_at: Timestamp,
    /// First instant at which challenges are rejected.
    pub closes_at: Timestamp,
}

impl ChallengeWindow {
    /// Open a window of `period_secs` starting at `opened_at`.
    pub fn open(opened_at: Timestamp, period_secs: u64) -> Self {
        Self {
            opened_at,
            closes_at: opened_at.plus_seconds(period_secs),
        }
    }

    /// Fail with [`EngineError::DeadlinePassed`] once the window closed.
    pub fn ensure_open(&self, now: Timestamp, operation: &str) -> Result<(), EngineError> {
        if now >= self.closes_at {
            return Err(EngineError::DeadlinePassed {
                operation: operation.to_string(),
                deadline: self.closes_at,
            });
        }
        Ok(())
    }

    /// Fail with [`EngineError::DeadlineNotReached`] while the window is open.
    pub fn ensure_elapsed(&self, now: Timestamp, operation: &str) -> Result<(), EngineError> {
        if now < self.closes_at {
            return Err(EngineError::DeadlineNotReached {
                operation: operation.to_string(),
                deadline: self.closes_at,
            });
        }
        Ok(())
    }
}

/// The appeal-funding period opened by a ruling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppealWindow {
    /// When the ruling was delivered.
    pub start: Timestamp,
    /// Last-exclusive instant for contributions to the disfavored side.
    pub loser_deadline: Timestamp,
    /// Last-exclusive instant for all other contributions.
    pub end: Timestamp,
}

impl AppealWindow {
    /// Open a window of `period_secs` starting at `start`, split at the
    /// midpoint (rounded down).
    pub fn open(start: Timestamp, period_secs: u64) -> Self {
        Self {
            start,
            loser_deadline: start.plus_seconds(period_secs / 2),
            end: start.plus_seconds(period_secs),
        }
    }

    /// The funding deadline for a party with the given standing.
    pub fn deadline_for(&self, standing: Standing) -> Timestamp {
        match standing {
            Standing::Loser => self.loser_deadline,
            Standing::Winner | Standing::Undecided => self.end,
        }
    }

    /// Fail with [`EngineError::DeadlinePassed`] once funding closed for a
    /// party with the given standing.
    pub fn ensure_fundable(
        &self,
        now: Timestamp,
        standing: Standing,
        operation: &str,
    ) -> Result<(), EngineError> {
        let deadline = self.deadline_for(standing);
        if now >= deadline {
            return Err(EngineError::DeadlinePassed {
                operation: operation.to_string(),
                deadline,
            });
        }
        Ok(())
    }

    /// Whether the whole window has elapsed.
    pub fn is_closed(&self, now: Timestamp) -> bool {
        now >= self.end
    }

    /// Whether the disfavored side's half has elapsed.
    pub fn loser_half_closed(&self, now: Timestamp) -> bool {
        now >= self.loser_deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_seconds(secs).unwrap()
    }

    #[test]
    fn challenge_window_is_half_open() {
        let w = ChallengeWindow::open(at(100), 50);
        assert!(w.ensure_open(at(149), "challenge").is_ok());
        assert!(matches!(
            w.ensure_open(at(150), "challenge"),
            Err(EngineError::DeadlinePassed { .. })
        ));
        assert!(matches!(
            w.ensure_elapsed(at(149), "execute_request"),
            Err(EngineError::DeadlineNotReached { .. })
        ));
        assert!(w.ensure_elapsed(at(150), "execute_request").is_ok());
    }

    #[test]
    fn appeal_window_splits_at_midpoint() {
        let w = AppealWindow::open(at(1_000), 101);
        assert_eq!(w.loser_deadline, at(1_050));
        assert_eq!(w.end, at(1_101));
        assert_eq!(w.deadline_for(Standing::Loser), at(1_050));
        assert_eq!(w.deadline_for(Standing::Winner), at(1_101));
        assert_eq!(w.deadline_for(Standing::Undecided), at(1_101));
    }

    #[test]
    fn loser_rejected_after_half_but_winner_accepted() {
        let w = AppealWindow::open(at(0), 100);
        assert!(w.ensure_fundable(at(49), Standing::Loser, "fund").is_ok());
        assert!(w.ensure_fundable(at(50), Standing::Loser, "fund").is_err());
        assert!(w.ensure_fundable(at(99), Standing::Winner, "fund").is_ok());
        assert!(w.ensure_fundable(at(100), Standing::Winner, "fund").is_err());
        assert!(w.loser_half_closed(at(50)));
        assert!(!w.is_closed(at(99)));
        assert!(w.is_closed(at(100)));
    }
}
