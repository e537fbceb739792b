//! Export orchestration: resolve settings, collect cookies, optionally encrypt,
//! deliver, and report the result through the notifier.
//!
//! [`ExportOrchestrator::run_export`] never returns an error. Every fault is
//! turned into one "Export Failed" notification and an [`ExportOutcome`].

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{debug, error, info, instrument};

use crate::cookies::{CookieCollector, CookieStoreError, SiteSelection};
use crate::crypto::{CryptoError, encrypt_data};
use crate::delivery::{DeliveryError, DeliveryManager};
use crate::notify::{Notifier, notify};
use crate::settings::{Interval, SettingsError, SettingsStore, load_settings};

/// Fallback failure text when an error renders as an empty message.
pub const UNKNOWN_FAILURE_MESSAGE: &str = "An unknown error occurred during cookie export.";

/// What triggered an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// User-requested export.
    Instant,
    /// Timer-triggered export using persisted settings.
    Scheduled { interval: Interval },
}

/// One export invocation.
///
/// Instant requests carry their own sites and encryption options; scheduled
/// requests are empty and read everything from settings.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ExportRequest {
    /// Sites to export; may contain the `<all>` wildcard.
    pub sites: Vec<String>,
    pub is_instant: bool,
    pub encrypt: Option<bool>,
    pub password: Option<String>,
}

impl ExportRequest {
    /// A timer-triggered request.
    #[must_use]
    pub fn scheduled() -> Self {
        Self::default()
    }

    /// An on-demand request for `sites`.
    #[must_use]
    pub fn instant(sites: Vec<String>) -> Self {
        Self {
            sites,
            is_instant: true,
            ..Self::default()
        }
    }

    /// Requests encryption with `password`.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.encrypt = Some(true);
        self.password = Some(password.into());
        self
    }
}

impl fmt::Debug for ExportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportRequest")
            .field("sites", &self.sites)
            .field("is_instant", &self.is_instant)
            .field("encrypt", &self.encrypt)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Export parameters after settings resolution.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedExport {
    pub kind: ExportKind,
    pub sites: SiteSelection,
    /// Normalized sub-path; always empty for instant exports.
    pub location: String,
    pub encrypt: bool,
    pub password: String,
}

impl fmt::Debug for ResolvedExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedExport")
            .field("kind", &self.kind)
            .field("sites", &self.sites)
            .field("location", &self.location)
            .field("encrypt", &self.encrypt)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Why an export ended without delivering anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The resolved site list was empty.
    NoSites,
    /// Encryption was requested without a password.
    MissingPassword,
    /// No selected site had any cookies.
    NoCookies,
}

/// Terminal state of one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Delivered { filename: String, encrypted: bool },
    Skipped(SkipReason),
    Failed { message: String },
}

impl ExportOutcome {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Faults caught at the orchestrator boundary.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Cookies(#[from] CookieStoreError),
    #[error("failed to serialize cookies: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("export task failed: {0}")]
    Task(#[from] JoinError),
}

/// Runs exports end to end.
pub struct ExportOrchestrator {
    store: Arc<dyn SettingsStore>,
    collector: CookieCollector,
    delivery: DeliveryManager,
    notifier: Arc<dyn Notifier>,
}

impl ExportOrchestrator {
    #[must_use]
    pub fn new(
        store: Arc<dyn SettingsStore>,
        collector: CookieCollector,
        delivery: DeliveryManager,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            collector,
            delivery,
            notifier,
        }
    }

    /// Runs one export to completion.
    ///
    /// Failures are reported with a single "Export Failed" notification and
    /// leave the backup status untouched.
    #[instrument(level = "debug", skip(self))]
    pub async fn run_export(&self, request: ExportRequest) -> ExportOutcome {
        match self.try_export(request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let mut message = err.to_string();
                if message.trim().is_empty() {
                    message = UNKNOWN_FAILURE_MESSAGE.to_string();
                }
                error!(error = %message, "Cookie export failed");
                notify(self.notifier.as_ref(), "Export Failed", &message).await;
                ExportOutcome::Failed { message }
            }
        }
    }

    async fn try_export(&self, request: ExportRequest) -> Result<ExportOutcome, ExportError> {
        let export = self.resolve(request).await?;
        debug!(?export, "Export resolved");

        if export.sites.is_empty() {
            notify(
                self.notifier.as_ref(),
                "No Sites Specified",
                "Please add sites to export in the extension settings.",
            )
            .await;
            return Ok(ExportOutcome::Skipped(SkipReason::NoSites));
        }
        if export.encrypt && export.password.is_empty() {
            notify(
                self.notifier.as_ref(),
                "Password Required",
                "Please provide a password for encryption.",
            )
            .await;
            return Ok(ExportOutcome::Skipped(SkipReason::MissingPassword));
        }

        let groups = self.collector.collect(&export.sites).await?;
        if groups.is_empty() {
            notify(
                self.notifier.as_ref(),
                "No Cookies Found",
                &format!("No cookies were found for {}.", export.sites.describe()),
            )
            .await;
            return Ok(ExportOutcome::Skipped(SkipReason::NoCookies));
        }

        let mut payload = serde_json::to_string_pretty(&groups)?;
        if export.encrypt {
            let password = export.password.clone();
            payload = tokio::task::spawn_blocking(move || encrypt_data(&payload, &password))
                .await??;
            debug!("Export payload encrypted");
        }

        let receipt = self.delivery.deliver(payload, &export).await?;

        let target = match export.kind {
            ExportKind::Instant => export.sites.describe(),
            ExportKind::Scheduled { .. } if export.location.is_empty() => {
                "default location".to_string()
            }
            ExportKind::Scheduled { .. } => export.location.clone(),
        };
        notify(
            self.notifier.as_ref(),
            "Backup Complete",
            &format!("Cookies exported successfully to {target}"),
        )
        .await;
        info!(filename = %receipt.filename, groups = groups.len(), "Cookie export complete");

        Ok(ExportOutcome::Delivered {
            filename: receipt.filename,
            encrypted: export.encrypt,
        })
    }

    async fn resolve(&self, request: ExportRequest) -> Result<ResolvedExport, ExportError> {
        if request.is_instant {
            return Ok(ResolvedExport {
                kind: ExportKind::Instant,
                sites: SiteSelection::from_sites(&request.sites),
                location: String::new(),
                encrypt: request.encrypt.unwrap_or(false),
                password: request.password.unwrap_or_default(),
            });
        }

        let settings = load_settings(self.store.as_ref()).await?;
        Ok(ResolvedExport {
            kind: ExportKind::Scheduled {
                interval: settings.interval,
            },
            sites: SiteSelection::from_sites(&settings.sites),
            location: settings.location,
            encrypt: settings.encrypt,
            password: settings.password,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_debug_redacts_password() {
        let request = ExportRequest::instant(vec!["a.com".to_string()]).with_password("s3cret");
        let debug = format!("{request:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_scheduled_request_is_empty() {
        let request = ExportRequest::scheduled();
        assert!(!request.is_instant);
        assert!(request.sites.is_empty());
        assert!(request.encrypt.is_none());
    }

    #[test]
    fn test_outcome_failure_flag() {
        assert!(
            ExportOutcome::Failed {
                message: "x".to_string()
            }
            .is_failure()
        );
        assert!(!ExportOutcome::Skipped(SkipReason::NoSites).is_failure());
    }
}
