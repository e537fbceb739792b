//! Per-invocation context: resolved directories and the wired host services.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cookie_backup::settings::default_config_dir;
use cookie_backup::{
    BackupService, BlobRegistry, Cookie, CookieStore, CookieStoreError, FileCookieStore,
    FileSettingsStore, FsDownloadChannel, HostServices, LogNotifier, SystemClock, TimerFire,
    TokioTimer,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::cli::Cli;

pub(crate) const DOWNLOADS_DIR_ENV: &str = "COOKIE_BACKUP_DOWNLOADS_DIR";
pub(crate) const COOKIES_FILE_ENV: &str = "COOKIE_BACKUP_COOKIES_FILE";
pub(crate) const PASSWORD_ENV: &str = "COOKIE_BACKUP_PASSWORD";

/// Directories and sources shared by every command.
#[derive(Debug, Clone)]
pub(crate) struct AppContext {
    pub config_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub cookies_file: Option<PathBuf>,
}

impl AppContext {
    /// Resolves flags first, then environment, then platform defaults.
    pub(crate) fn resolve(cli: &Cli) -> Result<Self> {
        // default_config_dir() also honours COOKIE_BACKUP_CONFIG_DIR.
        let config_dir = match cli.config_dir.clone() {
            Some(dir) => dir,
            None => default_config_dir()?,
        };
        let downloads_dir = resolve_downloads_dir(
            cli.downloads_dir.clone().or_else(|| env_path(DOWNLOADS_DIR_ENV)),
            env_path("HOME"),
            env::current_dir().ok(),
        );
        let cookies_file = cli.cookies.clone().or_else(|| env_path(COOKIES_FILE_ENV));

        let ctx = Self {
            config_dir,
            downloads_dir,
            cookies_file,
        };
        debug!(?ctx, "Context resolved");
        Ok(ctx)
    }

    pub(crate) fn settings_store(&self) -> Arc<FileSettingsStore> {
        Arc::new(FileSettingsStore::in_dir(&self.config_dir))
    }

    /// Wires the service against the filesystem and returns the timer's fire
    /// receiver.
    pub(crate) fn build_service(&self) -> (BackupService, UnboundedReceiver<TimerFire>) {
        let cookies: Arc<dyn CookieStore> = match &self.cookies_file {
            Some(path) => Arc::new(FileCookieStore::new(path)),
            None => Arc::new(UnconfiguredCookieStore),
        };
        let blobs = Arc::new(BlobRegistry::new());
        let downloads = Arc::new(FsDownloadChannel::new(
            self.downloads_dir.clone(),
            Arc::clone(&blobs),
        ));
        let (timer, fires) = TokioTimer::new();

        let service = BackupService::new(HostServices {
            settings: self.settings_store(),
            cookies,
            downloads,
            blobs,
            timer: Arc::new(timer),
            notifier: Arc::new(LogNotifier),
            clock: Arc::new(SystemClock),
        });
        (service, fires)
    }

    pub(crate) fn settings_path(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Cookie store used when no cookie source was configured.
struct UnconfiguredCookieStore;

#[async_trait]
impl CookieStore for UnconfiguredCookieStore {
    async fn get_all(&self, _domain: Option<&str>) -> Result<Vec<Cookie>, CookieStoreError> {
        Err(CookieStoreError::Unavailable(format!(
            "no cookie source configured (pass --cookies or set {COOKIES_FILE_ENV})"
        )))
    }
}

pub(crate) fn env_path(name: &str) -> Option<PathBuf> {
    let value = env::var_os(name)?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(value))
}

pub(crate) fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

/// Download root: explicit, else `~/Downloads`, else the working directory.
pub(crate) fn resolve_downloads_dir(
    explicit: Option<PathBuf>,
    home: Option<PathBuf>,
    cwd: Option<PathBuf>,
) -> PathBuf {
    explicit
        .or_else(|| home.map(|home| home.join("Downloads")))
        .or(cwd)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub(crate) fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
