//! Schedule (re)arming on startup, install, and settings changes.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::calendar::next_backup_date;
use super::timer::{Timer, TimerError, TimerFire};
use crate::clock::Clock;
use crate::notify::{Notifier, notify};
use crate::settings::{
    Interval, NOT_SET, SettingKey, Settings, SettingsError, SettingsPatch, SettingsStore,
};

/// Name of the single recurring export alarm.
pub const EXPORT_ALARM_NAME: &str = "cookieExport";

/// Result of a schedule setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Interval is off; no alarm is armed.
    Disabled,
    /// The export alarm is armed.
    Armed {
        interval: Interval,
        period_minutes: u32,
        next_backup: String,
    },
}

/// Errors raised while setting up the schedule.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Timer(#[from] TimerError),
    /// Next backup date overflowed the calendar.
    #[error("next backup date is out of range")]
    DateOutOfRange,
}

/// Keeps exactly one export alarm in line with the configured interval.
pub struct ScheduleManager {
    store: Arc<dyn SettingsStore>,
    timer: Arc<dyn Timer>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl ScheduleManager {
    #[must_use]
    pub fn new(
        store: Arc<dyn SettingsStore>,
        timer: Arc<dyn Timer>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            timer,
            notifier,
            clock,
        }
    }

    /// Clears pending alarms and arms a new one for the current interval.
    ///
    /// With the interval off, persists `nextBackup = "—"` and arms nothing.
    /// Otherwise arms [`EXPORT_ALARM_NAME`], persists the next backup date, and
    /// sends a confirmation notification.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] if the store or timer fails. An interval whose
    /// next date overflows the calendar leaves no alarm armed and `nextBackup`
    /// unset.
    #[instrument(level = "debug", skip(self))]
    pub async fn setup_schedule(&self) -> Result<ScheduleOutcome, ScheduleError> {
        self.timer.clear_all().await?;

        let values = self
            .store
            .get(&[SettingKey::Interval, SettingKey::CustomDays])
            .await?;
        let interval = Settings::from_values(&values).interval;

        let Some(period_minutes) = interval.period_minutes() else {
            self.store
                .set(SettingsPatch::new().with(SettingKey::NextBackup, NOT_SET))
                .await?;
            info!("Scheduled exports disabled");
            return Ok(ScheduleOutcome::Disabled);
        };

        let Some(next_backup) = next_backup_date(interval, self.clock.as_ref()) else {
            self.store
                .set(SettingsPatch::new().with(SettingKey::NextBackup, NOT_SET))
                .await?;
            warn!(%interval, "Next backup date out of range; schedule not armed");
            return Err(ScheduleError::DateOutOfRange);
        };

        self.timer.create(EXPORT_ALARM_NAME, period_minutes).await?;
        self.store
            .set(SettingsPatch::new().with(SettingKey::NextBackup, next_backup.clone()))
            .await?;

        notify(
            self.notifier.as_ref(),
            "Schedule Set",
            &format!("Exports will run every {interval}."),
        )
        .await;
        info!(period_minutes, next_backup = %next_backup, "Export scheduled");

        Ok(ScheduleOutcome::Armed {
            interval,
            period_minutes,
            next_backup,
        })
    }

    /// Returns true if `fire` belongs to the export alarm.
    #[must_use]
    pub fn is_export_alarm(fire: &TimerFire) -> bool {
        fire.name == EXPORT_ALARM_NAME
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::clock::FixedClock;
    use crate::notify::LogNotifier;
    use crate::schedule::TokioTimer;
    use crate::settings::{BackupStatus, MemorySettingsStore};

    fn manager(store: Arc<MemorySettingsStore>, timer: Arc<TokioTimer>) -> ScheduleManager {
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        ScheduleManager::new(store, timer, Arc::new(LogNotifier), Arc::new(clock))
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_defaults_to_daily_when_unset() {
        let store = Arc::new(MemorySettingsStore::new());
        let (timer, _fires) = TokioTimer::new();
        let timer = Arc::new(timer);

        let outcome = manager(store.clone(), timer.clone())
            .setup_schedule()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ScheduleOutcome::Armed {
                interval: Interval::Day,
                period_minutes: 1440,
                next_backup: "2024-03-02".to_string(),
            }
        );
        assert_eq!(timer.active_alarms(), vec![EXPORT_ALARM_NAME.to_string()]);
        let status = BackupStatus::from_values(&store.snapshot());
        assert_eq!(status.next_backup, "2024-03-02");
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_off_clears_alarm_and_persists_sentinel() {
        let store = Arc::new(MemorySettingsStore::new());
        let (timer, _fires) = TokioTimer::new();
        let timer = Arc::new(timer);
        timer.create(EXPORT_ALARM_NAME, 1440).await.unwrap();
        store
            .set(SettingsPatch::new().with(SettingKey::Interval, "off"))
            .await
            .unwrap();

        let outcome = manager(store.clone(), timer.clone())
            .setup_schedule()
            .await
            .unwrap();

        assert_eq!(outcome, ScheduleOutcome::Disabled);
        assert!(timer.active_alarms().is_empty());
        assert_eq!(BackupStatus::from_values(&store.snapshot()).next_backup, NOT_SET);
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_custom_interval_period() {
        let store = Arc::new(MemorySettingsStore::with_values(
            SettingsPatch::new()
                .with(SettingKey::Interval, "custom")
                .with(SettingKey::CustomDays, 3),
        ));
        let (timer, _fires) = TokioTimer::new();

        let outcome = manager(store, Arc::new(timer)).setup_schedule().await.unwrap();
        assert!(matches!(
            outcome,
            ScheduleOutcome::Armed { period_minutes: 4320, ref next_backup, .. } if next_backup == "2024-03-04"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_out_of_range_custom_days_arms_nothing() {
        let store = Arc::new(MemorySettingsStore::with_values(
            SettingsPatch::new()
                .with(SettingKey::Interval, "custom")
                .with(SettingKey::CustomDays, 1_000_000_000)
                .with(SettingKey::NextBackup, "2024-03-02"),
        ));
        let (timer, _fires) = TokioTimer::new();
        let timer = Arc::new(timer);
        timer.create(EXPORT_ALARM_NAME, 1440).await.unwrap();

        let result = manager(store.clone(), timer.clone()).setup_schedule().await;

        assert!(matches!(result, Err(ScheduleError::DateOutOfRange)));
        assert!(timer.active_alarms().is_empty());
        assert_eq!(BackupStatus::from_values(&store.snapshot()).next_backup, NOT_SET);
    }

    #[test]
    fn test_is_export_alarm_matches_name_only() {
        assert!(ScheduleManager::is_export_alarm(&TimerFire {
            name: EXPORT_ALARM_NAME.to_string()
        }));
        assert!(!ScheduleManager::is_export_alarm(&TimerFire {
            name: "other".to_string()
        }));
    }
}
