//! Next-backup date calculation.

use chrono::{Days, Months, NaiveDate};

use crate::clock::{Clock, format_date};
use crate::settings::Interval;

/// Returns the date one interval after `from`.
///
/// Months use calendar arithmetic, clamping to the last day of shorter months.
/// Returns `None` for [`Interval::Off`] or if the result is out of range.
#[must_use]
pub fn next_backup_date_from(interval: Interval, from: NaiveDate) -> Option<NaiveDate> {
    match interval {
        Interval::Day => from.checked_add_days(Days::new(1)),
        Interval::Week => from.checked_add_days(Days::new(7)),
        Interval::Month => from.checked_add_months(Months::new(1)),
        Interval::Custom(days) => from.checked_add_days(Days::new(u64::from(days.max(1)))),
        Interval::Off => None,
    }
}

/// Returns the next backup date after today as `YYYY-MM-DD`.
#[must_use]
pub fn next_backup_date(interval: Interval, clock: &dyn Clock) -> Option<String> {
    next_backup_date_from(interval, clock.today()).map(format_date)
}
