//! Cookie Backup Library
//!
//! Scheduled and on-demand cookie exports: collect cookies for a configured
//! set of sites, optionally encrypt them with a password, save them as a JSON
//! file, and keep track of when the last and next backups happen.
//!
//! # Architecture
//!
//! - [`settings`] - persisted configuration and backup status
//! - [`schedule`] - next-backup calendar and the recurring export timer
//! - [`cookies`] - cookie records, host cookie store, per-domain collection
//! - [`crypto`] - PBKDF2 + AES-256-GCM export envelope
//! - [`delivery`] - file naming, download channel, status bookkeeping
//! - [`export`] - the export run from settings to notification
//! - [`service`] - inbound messages and lifecycle hooks
//!
//! Host collaborators (cookie store, download channel, timer, notifier,
//! clock) are traits so the pipeline runs the same under tests and the CLI.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod cookies;
pub mod crypto;
pub mod delivery;
pub mod export;
pub mod notify;
pub mod schedule;
pub mod service;
pub mod settings;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use cookies::{
    Cookie, CookieCollector, CookieGroup, CookieStore, CookieStoreError, FileCookieStore,
    SiteSelection, WILDCARD_SITE,
};
pub use crypto::{CryptoError, EncryptionEnvelope, decrypt_data, encrypt_data};
pub use delivery::{
    BlobRegistry, DeliveryError, DeliveryManager, DownloadChannel, DownloadError,
    DownloadRequest, FsDownloadChannel,
};
pub use export::{ExportOrchestrator, ExportOutcome, ExportRequest, SkipReason};
pub use notify::{LogNotifier, Notifier, NotifyError};
pub use schedule::{ScheduleManager, ScheduleOutcome, Timer, TimerFire, TokioTimer};
pub use service::{BackgroundMessage, BackupService, DispatchResult, HostServices};
pub use settings::{
    BackupStatus, FileSettingsStore, Interval, MemorySettingsStore, NOT_SET, SettingKey,
    Settings, SettingsError, SettingsPatch, SettingsStore,
};
