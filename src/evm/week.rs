//! Monday-aligned week buckets.

use chrono::{Datelike, Duration, NaiveDate};

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Week starts covering `[week_start(start), week_start(end)]`.
///
/// Empty when either bound is missing or `end < start`.
pub fn weeks_between(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<NaiveDate> {
    let (Some(start), Some(end)) = (start, end) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }

    let last = week_start(end);
    let mut weeks = Vec::new();
    let mut current = week_start(start);
    while current <= last {
        weeks.push(current);
        current += Duration::days(7);
    }
    weeks
}
