//! # Temporal Types
//!
//! UTC-only timestamps and the host-supplied [`Clock`].
//!
//! ## Design Decision
//!
//! The engine never sleeps and never reads wall time on its own. Every
//! deadline (challenge period, appeal period) is a comparison between a
//! stored [`Timestamp`] and `clock.now()`. Production hosts plug in
//! [`SystemClock`] or their ledger's block time; tests use [`ManualClock`]
//! and advance it explicitly.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A UTC timestamp.
///
/// Serializes to ISO 8601 format with `Z` suffix (e.g., `2026-01-15T12:00:00Z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Create a timestamp from whole seconds since the Unix epoch.
    ///
    /// Returns `None` if the value is out of chrono's representable range.
    pub fn from_unix_seconds(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    /// Access the underlying `chrono::DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Whole seconds since the Unix epoch.
    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// This timestamp shifted forward by `seconds`, saturating at the
    /// largest representable instant.
    pub fn plus_seconds(&self, seconds: u64) -> Self {
        let shift = i64::try_from(seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|d| self.0.checked_add_signed(d));
        Self(shift.unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Return the timestamp as an ISO 8601 string with Z suffix,
    /// truncated to seconds.
    pub fn to_canonical_string(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

/// A monotonic time source supplied by the host.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying instant, so a test can hand one clone
/// to an engine and advance another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Create a clock frozen at the given Unix time.
    ///
    /// Out-of-range values fall back to the Unix epoch.
    pub fn at_unix_seconds(secs: i64) -> Self {
        let start = Timestamp::from_unix_seconds(secs)
            .unwrap_or_else(|| Timestamp::from_datetime(DateTime::<Utc>::default()));
        Self::new(start)
    }

    /// Move the clock forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        let mut current = self.current.lock();
        *current = current.plus_seconds(seconds);
    }

    /// Jump the clock to `instant`. Moving backwards is ignored, keeping the
    /// clock monotonic.
    pub fn set(&self, instant: Timestamp) {
        let mut current = self.current.lock();
        if instant > *current {
            *current = instant;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.lock()
    }
}
