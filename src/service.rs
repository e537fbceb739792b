//! Background service: the typed inbound message protocol and lifecycle hooks.
//!
//! Messages arrive as JSON objects tagged by `type`:
//! - `{"type":"updateSchedule"}`
//! - `{"type":"instantExport","sites":[...],"password":"...","encrypt":true}`

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::cookies::{CookieCollector, CookieStore};
use crate::delivery::{BlobRegistry, DeliveryManager, DownloadChannel};
use crate::export::{ExportOrchestrator, ExportOutcome, ExportRequest};
use crate::notify::Notifier;
use crate::schedule::{ScheduleError, ScheduleManager, ScheduleOutcome, Timer, TimerFire};
use crate::settings::SettingsStore;

/// Inbound request from the settings or export UI.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackgroundMessage {
    /// Settings changed; re-arm the export timer.
    UpdateSchedule,
    /// Export the given sites now.
    InstantExport {
        sites: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        encrypt: Option<bool>,
    },
}

impl fmt::Debug for BackgroundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateSchedule => f.write_str("UpdateSchedule"),
            Self::InstantExport {
                sites,
                password,
                encrypt,
            } => f
                .debug_struct("InstantExport")
                .field("sites", sites)
                .field("password", &password.as_ref().map(|_| "[REDACTED]"))
                .field("encrypt", encrypt)
                .finish(),
        }
    }
}

/// Result of dispatching one [`BackgroundMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Scheduled(ScheduleOutcome),
    Exported(ExportOutcome),
}

/// Host collaborators the service runs against.
pub struct HostServices {
    pub settings: Arc<dyn SettingsStore>,
    pub cookies: Arc<dyn CookieStore>,
    pub downloads: Arc<dyn DownloadChannel>,
    pub blobs: Arc<BlobRegistry>,
    pub timer: Arc<dyn Timer>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

/// The wired-up export pipeline.
pub struct BackupService {
    schedule: ScheduleManager,
    orchestrator: ExportOrchestrator,
}

impl BackupService {
    #[must_use]
    pub fn new(host: HostServices) -> Self {
        let schedule = ScheduleManager::new(
            Arc::clone(&host.settings),
            host.timer,
            Arc::clone(&host.notifier),
            Arc::clone(&host.clock),
        );
        let delivery = DeliveryManager::new(
            Arc::clone(&host.settings),
            host.downloads,
            host.blobs,
            host.clock,
        );
        let orchestrator = ExportOrchestrator::new(
            host.settings,
            CookieCollector::new(host.cookies),
            delivery,
            host.notifier,
        );
        Self {
            schedule,
            orchestrator,
        }
    }

    #[must_use]
    pub fn schedule(&self) -> &ScheduleManager {
        &self.schedule
    }

    #[must_use]
    pub fn orchestrator(&self) -> &ExportOrchestrator {
        &self.orchestrator
    }

    /// Handles one inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] if re-arming the schedule fails. Export faults
    /// are reported through [`ExportOutcome::Failed`] instead.
    #[instrument(level = "debug", skip(self))]
    pub async fn dispatch(&self, message: BackgroundMessage) -> Result<DispatchResult, ScheduleError> {
        match message {
            BackgroundMessage::UpdateSchedule => Ok(DispatchResult::Scheduled(
                self.schedule.setup_schedule().await?,
            )),
            BackgroundMessage::InstantExport {
                sites,
                password,
                encrypt,
            } => {
                let request = ExportRequest {
                    sites,
                    is_instant: true,
                    encrypt,
                    password,
                };
                Ok(DispatchResult::Exported(
                    self.orchestrator.run_export(request).await,
                ))
            }
        }
    }

    /// Host process start.
    ///
    /// # Errors
    ///
    /// See [`ScheduleManager::setup_schedule`].
    pub async fn on_startup(&self) -> Result<ScheduleOutcome, ScheduleError> {
        info!("Service starting; arming schedule");
        self.schedule.setup_schedule().await
    }

    /// First install.
    ///
    /// # Errors
    ///
    /// See [`ScheduleManager::setup_schedule`].
    pub async fn on_installed(&self) -> Result<ScheduleOutcome, ScheduleError> {
        info!("Installed; arming schedule");
        self.schedule.setup_schedule().await
    }

    /// Runs a scheduled export for the export alarm; other alarms are ignored.
    pub async fn handle_alarm(&self, fire: &TimerFire) -> Option<ExportOutcome> {
        if !ScheduleManager::is_export_alarm(fire) {
            debug!(alarm = %fire.name, "Ignoring unrelated alarm");
            return None;
        }
        Some(self.orchestrator.run_export(ExportRequest::scheduled()).await)
    }

    /// Serves timer fires and inbound messages until `shutdown` completes or
    /// both sources close.
    pub async fn run_until<F>(
        &self,
        mut fires: UnboundedReceiver<TimerFire>,
        mut messages: UnboundedReceiver<BackgroundMessage>,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut fires_open = true;
        let mut messages_open = true;

        while fires_open || messages_open {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                fire = fires.recv(), if fires_open => match fire {
                    Some(fire) => {
                        self.handle_alarm(&fire).await;
                    }
                    None => fires_open = false,
                },
                message = messages.recv(), if messages_open => match message {
                    Some(message) => {
                        if let Err(error) = self.dispatch(message).await {
                            warn!(error = %error, "Failed to update schedule");
                        }
                    }
                    None => messages_open = false,
                },
            }
        }
    }
}
