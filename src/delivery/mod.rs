//! Export delivery: naming, handing the payload to the download channel, and
//! backup status bookkeeping for scheduled runs.

mod blob;
mod channel;
mod filename;

pub use blob::{Blob, BlobRegistry};
pub use channel::{DownloadChannel, DownloadError, DownloadId, DownloadRequest, FsDownloadChannel};
pub use filename::{BACKUP_TAG, INSTANT_EXPORT_TAG, domain_tag, export_filename};

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::clock::{Clock, format_date};
use crate::export::{ExportKind, ResolvedExport};
use crate::schedule::next_backup_date;
use crate::settings::{NOT_SET, SettingKey, SettingsError, SettingsPatch, SettingsStore};

/// Errors raised while delivering an export.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Download(#[from] DownloadError),
    /// Backup status could not be persisted after a successful download.
    #[error("export saved but backup status could not be updated: {0}")]
    Status(#[from] SettingsError),
}

/// A delivered export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub filename: String,
    pub download_id: DownloadId,
}

/// Hands export payloads to the download channel.
pub struct DeliveryManager {
    store: Arc<dyn SettingsStore>,
    channel: Arc<dyn DownloadChannel>,
    blobs: Arc<BlobRegistry>,
    clock: Arc<dyn Clock>,
}

impl DeliveryManager {
    #[must_use]
    pub fn new(
        store: Arc<dyn SettingsStore>,
        channel: Arc<dyn DownloadChannel>,
        blobs: Arc<BlobRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            channel,
            blobs,
            clock,
        }
    }

    /// Saves `payload` for `export` and, for scheduled runs, records the backup.
    ///
    /// Instant exports ask the user where to save; scheduled exports save
    /// silently. The blob URL is released as soon as the download is issued.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] if the download request or the status update
    /// fails. Status is only written after the download was issued.
    #[instrument(level = "debug", skip(self, payload, export), fields(kind = ?export.kind))]
    pub async fn deliver(
        &self,
        payload: String,
        export: &ResolvedExport,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let today = self.clock.today();
        let tag = domain_tag(&export.kind, &export.sites);
        let filename = export_filename(&export.location, &tag, today);

        let url = self.blobs.create_object_url(Blob::json(payload));
        let request = DownloadRequest {
            url: url.clone(),
            filename: filename.clone(),
            save_as: matches!(export.kind, ExportKind::Instant),
        };
        let result = self.channel.download(request).await;
        self.blobs.revoke_object_url(&url);
        let download_id = result?;
        debug!(filename = %filename, ?download_id, "Download issued");

        if let ExportKind::Scheduled { interval } = export.kind {
            let next_backup =
                next_backup_date(interval, self.clock.as_ref()).unwrap_or_else(|| NOT_SET.to_string());
            self.store
                .set(
                    SettingsPatch::new()
                        .with(SettingKey::LastBackup, format_date(today))
                        .with(SettingKey::NextBackup, next_backup.clone()),
                )
                .await?;
            info!(last_backup = %today, next_backup = %next_backup, "Backup status updated");
        }

        Ok(DeliveryReceipt {
            filename,
            download_id,
        })
    }
}
