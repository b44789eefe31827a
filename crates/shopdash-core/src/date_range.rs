//! Time windows and the shared `[start, end)` match fragment.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::pipeline::{Filter, Stage};

/// Timestamp field every collection carries.
pub const CREATED_AT: &str = "createdAt";

/// Restrict `createdAt` to `[start, end)`. No date arithmetic happens here;
/// callers pick the boundaries.
pub fn date_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Stage> {
    vec![Stage::Match(Filter::DateRange {
        field: CREATED_AT.to_string(),
        start,
        end,
    })]
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// A window of whole calendar days, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// The `days`-day window ending on (and including) `end`.
    pub fn ending_on(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start: end - Duration::days(span),
            end,
        }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Half-open instant bounds covering every day of the window.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            start_of_day(self.start),
            start_of_day(self.end + Duration::days(1)),
        )
    }

    pub fn to_stages(&self) -> Vec<Stage> {
        let (start, end) = self.bounds();
        date_range(start, end)
    }
}

/// The two back-to-back windows of a period-over-period comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComparisonWindows {
    pub previous: DateWindow,
    pub current: DateWindow,
}

impl ComparisonWindows {
    /// current = `[today - (days-1), today]`,
    /// previous = `[today - (2*days-1), today - days]`.
    ///
    /// For 30 days: currentStart = today-29, previousEnd = today-30,
    /// previousStart = today-59.
    pub fn ending_on(today: NaiveDate, days: u32) -> Self {
        let current = DateWindow::ending_on(today, days);
        let previous = DateWindow::ending_on(current.start - Duration::days(1), days);
        Self { previous, current }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn thirty_day_comparison_boundaries() {
        let windows = ComparisonWindows::ending_on(date(2024, 3, 31), 30);
        assert_eq!(windows.current.start, date(2024, 3, 2));
        assert_eq!(windows.current.end, date(2024, 3, 31));
        assert_eq!(windows.previous.end, date(2024, 3, 1));
        // 2024 is a leap year: 59 days before March 31 is February 1.
        assert_eq!(windows.previous.start, date(2024, 2, 1));
        assert_eq!(windows.current.days(), 30);
        assert_eq!(windows.previous.days(), 30);
    }

    #[test]
    fn windows_do_not_overlap() {
        let windows = ComparisonWindows::ending_on(date(2025, 1, 15), 30);
        let (_, previous_end) = windows.previous.bounds();
        let (current_start, _) = windows.current.bounds();
        assert_eq!(previous_end, current_start);
    }

    #[test]
    fn window_bounds_are_half_open_midnights() {
        let window = DateWindow::ending_on(date(2024, 12, 31), 1);
        let (start, end) = window.bounds();
        assert_eq!(start.to_rfc3339(), "2024-12-31T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn date_range_builds_single_match() {
        let window = DateWindow::ending_on(date(2024, 3, 31), 30);
        let stages = window.to_stages();
        assert_eq!(stages.len(), 1);
        match &stages[0] {
            Stage::Match(Filter::DateRange { field, start, end }) => {
                assert_eq!(field, CREATED_AT);
                assert_eq!(start.date_naive(), date(2024, 3, 2));
                assert_eq!(end.date_naive(), date(2024, 4, 1));
            }
            other => panic!("unexpected stage {other:?}"),
        }
    }
}
