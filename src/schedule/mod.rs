//! Backup scheduling: next-date calculation and the recurring export timer.
//!
//! - [`next_backup_date_from`] - pure calendar arithmetic per [`Interval`](crate::settings::Interval)
//! - [`Timer`] - host timer contract; [`TokioTimer`] is the in-process implementation
//! - [`ScheduleManager`] - re-arms the single named timer whenever settings change

mod calendar;
mod manager;
mod timer;

pub use calendar::{next_backup_date, next_backup_date_from};
pub use manager::{EXPORT_ALARM_NAME, ScheduleError, ScheduleManager, ScheduleOutcome};
pub use timer::{Timer, TimerError, TimerFire, TokioTimer};
