//! Source of "today" for window computations.

use chrono::{NaiveDate, Utc};

pub trait Clock: Send + Sync + 'static {
    /// The current calendar day, in UTC.
    fn today(&self) -> NaiveDate;
}

/// Reads the system clock on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Always reports the same day. Used by tests and backfills.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
