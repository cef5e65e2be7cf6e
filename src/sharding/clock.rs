//! Injectable date source

use chrono::{NaiveDate, Utc};

/// Source of "today" for date-keyed routing.
///
/// Date-entity defaults and shard enumeration are functions of the current
/// date, so the clock is a trait: production code uses [`SystemClock`], tests
/// pin a date with [`FixedClock`].
pub trait Clock: Send + Sync {
    /// Current date in UTC
    fn today(&self) -> NaiveDate;
}

/// Wall-clock dates in UTC
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to one date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
