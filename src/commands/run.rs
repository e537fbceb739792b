//! Lifecycle commands: the scheduling daemon and first-run install.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use cookie_backup::settings::load_settings;
use cookie_backup::{BackgroundMessage, ScheduleOutcome, Settings, SettingsStore};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::app::context::AppContext;

/// How often the daemon checks the settings file for schedule changes.
const SETTINGS_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub async fn run_install_command(ctx: &AppContext) -> Result<()> {
    let (service, _fires) = ctx.build_service();
    let outcome = service.on_installed().await?;
    print_schedule(&outcome);
    Ok(())
}

pub async fn run_daemon_command(ctx: &AppContext) -> Result<()> {
    let (service, fires) = ctx.build_service();
    let outcome = service.on_startup().await?;
    print_schedule(&outcome);

    let (messages_tx, messages_rx) = mpsc::unbounded_channel();
    let watcher = tokio::spawn(watch_schedule_settings(
        ctx.settings_store(),
        messages_tx,
        SETTINGS_POLL_INTERVAL,
    ));

    info!("Waiting for scheduled exports (Ctrl-C to stop)");
    service
        .run_until(fires, messages_rx, async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!(error = %error, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    watcher.abort();
    info!("Stopped");
    Ok(())
}

/// Sends `updateSchedule` whenever the stored export configuration changes.
///
/// Any config edit (`config set` from another process) also rewrites
/// `nextBackup`, so the daemon re-arms to keep its alarm in phase with it.
/// Status writes (`lastBackup`/`nextBackup` after an export) are ignored.
async fn watch_schedule_settings(
    store: Arc<dyn SettingsStore>,
    messages: mpsc::UnboundedSender<BackgroundMessage>,
    period: Duration,
) {
    let mut last = read_settings(store.as_ref()).await;
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(current) = read_settings(store.as_ref()).await else {
            continue;
        };
        if last.as_ref() != Some(&current) {
            debug!(interval = %current.interval, "Export settings changed");
            last = Some(current);
            if messages.send(BackgroundMessage::UpdateSchedule).is_err() {
                break;
            }
        }
    }
}

async fn read_settings(store: &dyn SettingsStore) -> Option<Settings> {
    match load_settings(store).await {
        Ok(settings) => Some(settings),
        Err(error) => {
            warn!(error = %error, "Failed to read settings");
            None
        }
    }
}

fn print_schedule(outcome: &ScheduleOutcome) {
    match outcome {
        ScheduleOutcome::Armed {
            interval,
            next_backup,
            ..
        } => println!("Exports run every {interval}; next backup {next_backup}."),
        ScheduleOutcome::Disabled => println!("Scheduled exports are off."),
    }
}
