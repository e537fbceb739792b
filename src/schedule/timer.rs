//! Recurring named timers.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// A timer firing, identified by the name it was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFire {
    pub name: String,
}

/// Errors raised by timer operations.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    /// A zero-minute period was requested.
    #[error("timer period must be at least one minute")]
    InvalidPeriod,
}

/// Host timer contract: a namespace of named recurring alarms.
#[async_trait]
pub trait Timer: Send + Sync {
    /// Cancels every pending alarm.
    async fn clear_all(&self) -> Result<(), TimerError>;

    /// Arms (or re-arms) an alarm that fires every `period_minutes`.
    async fn create(&self, name: &str, period_minutes: u32) -> Result<(), TimerError>;
}

/// In-process timer backed by tokio tasks.
///
/// Each alarm is one task that sends a [`TimerFire`] on the channel returned by
/// [`TokioTimer::new`] once per period. The first fire happens one full period
/// after creation.
#[derive(Debug)]
pub struct TokioTimer {
    alarms: Mutex<HashMap<String, JoinHandle<()>>>,
    fires: mpsc::UnboundedSender<TimerFire>,
}

impl TokioTimer {
    /// Creates a timer and the receiver its alarms fire into.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerFire>) {
        let (fires, receiver) = mpsc::unbounded_channel();
        (
            Self {
                alarms: Mutex::new(HashMap::new()),
                fires,
            },
            receiver,
        )
    }

    /// Returns the names of armed alarms, sorted.
    #[must_use]
    pub fn active_alarms(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .alarms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl Timer for TokioTimer {
    async fn clear_all(&self) -> Result<(), TimerError> {
        let mut alarms = self.alarms.lock().unwrap_or_else(PoisonError::into_inner);
        for (name, handle) in alarms.drain() {
            handle.abort();
            debug!(alarm = %name, "Alarm cleared");
        }
        Ok(())
    }

    async fn create(&self, name: &str, period_minutes: u32) -> Result<(), TimerError> {
        if period_minutes == 0 {
            return Err(TimerError::InvalidPeriod);
        }

        let period = Duration::from_secs(u64::from(period_minutes) * 60);
        let sender = self.fires.clone();
        let alarm_name = name.to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let fire = TimerFire {
                    name: alarm_name.clone(),
                };
                if sender.send(fire).is_err() {
                    break;
                }
            }
        });

        let previous = self
            .alarms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        debug!(alarm = %name, period_minutes, "Alarm armed");
        Ok(())
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        let alarms = self.alarms.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in alarms.drain() {
            handle.abort();
        }
    }
}
