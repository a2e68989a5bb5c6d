//! Timestamp type used throughout the bot.
//!
//! Timestamps are Unix epoch seconds (UTC). Leaderboards bucket polls by the
//! calendar year of their expiry, computed in UTC.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        Self(Utc::now().timestamp().max(0) as u64)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// This timestamp shifted forward by `secs`, saturating at the far future.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Calendar year (UTC) this timestamp falls in.
    pub fn year(&self) -> i32 {
        self.to_datetime().map(|dt| dt.year()).unwrap_or(i32::MAX)
    }

    /// RFC 3339 rendering, as shown on poll messages.
    pub fn to_rfc3339(&self) -> String {
        self.to_datetime()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| self.0.to_string())
    }

    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.0).ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}

/// Source of the current time.
///
/// Production code uses [`SystemClock`]; tests swap in a controllable clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
