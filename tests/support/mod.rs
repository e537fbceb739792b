//! Shared fakes for pipeline integration tests.
//!
//! Each fake records what the pipeline asked of it so tests can assert on
//! notifications, downloads, cookie queries, and armed alarms.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use cookie_backup::delivery::DownloadId;
use cookie_backup::schedule::TimerError;
use cookie_backup::{
    BackupService, BlobRegistry, Cookie, CookieStore, CookieStoreError, DownloadChannel,
    DownloadError, DownloadRequest, FixedClock, HostServices, MemorySettingsStore, Notifier,
    NotifyError, Timer,
};

/// Notifier that records `(title, message)` pairs.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(title, _)| title.clone())
            .collect()
    }

    pub fn last(&self) -> Option<(String, String)> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
        Ok(())
    }
}

/// A download the pipeline issued, with the blob contents at request time.
#[derive(Debug, Clone)]
pub struct RecordedDownload {
    pub filename: String,
    pub save_as: bool,
    pub body: String,
}

/// Download channel that resolves blobs and records requests.
pub struct RecordingDownloadChannel {
    blobs: Arc<BlobRegistry>,
    pub downloads: Mutex<Vec<RecordedDownload>>,
    pub fail_with: Mutex<Option<String>>,
}

impl RecordingDownloadChannel {
    pub fn new(blobs: Arc<BlobRegistry>) -> Self {
        Self {
            blobs,
            downloads: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
        }
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn recorded(&self) -> Vec<RecordedDownload> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadChannel for RecordingDownloadChannel {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadId, DownloadError> {
        if let Some(message) = self.fail_with.lock().unwrap().take() {
            return Err(DownloadError::Unavailable(message));
        }
        let blob = self
            .blobs
            .resolve(&request.url)
            .ok_or_else(|| DownloadError::UnknownSource(request.url.clone()))?;
        let mut downloads = self.downloads.lock().unwrap();
        downloads.push(RecordedDownload {
            filename: request.filename,
            save_as: request.save_as,
            body: String::from_utf8(blob.bytes.clone()).unwrap(),
        });
        Ok(DownloadId(downloads.len() as u64))
    }
}

/// Cookie store serving a fixed cookie list, with per-domain failures.
#[derive(Default)]
pub struct ScriptedCookieStore {
    pub cookies: Vec<Cookie>,
    pub failing_domains: Vec<String>,
    pub fail_all: bool,
    pub queries: Mutex<Vec<Option<String>>>,
}

impl ScriptedCookieStore {
    pub fn with_cookies(cookies: Vec<Cookie>) -> Self {
        Self {
            cookies,
            ..Self::default()
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl CookieStore for ScriptedCookieStore {
    async fn get_all(&self, domain: Option<&str>) -> Result<Vec<Cookie>, CookieStoreError> {
        self.queries
            .lock()
            .unwrap()
            .push(domain.map(ToString::to_string));
        if self.fail_all {
            return Err(CookieStoreError::Unavailable(
                "cookie permission revoked".to_string(),
            ));
        }
        match domain {
            Some(domain) if self.failing_domains.iter().any(|d| d == domain) => Err(
                CookieStoreError::Unavailable(format!("query for {domain} failed")),
            ),
            Some(domain) => Ok(self
                .cookies
                .iter()
                .filter(|cookie| cookie_backup::cookies::domain_matches(&cookie.domain, domain))
                .cloned()
                .collect()),
            None => Ok(self.cookies.clone()),
        }
    }
}

/// Timer that only records alarms; tests fire them by hand.
#[derive(Default)]
pub struct ManualTimer {
    pub alarms: Mutex<BTreeMap<String, u32>>,
    pub clear_calls: Mutex<usize>,
}

impl ManualTimer {
    pub fn armed(&self) -> Vec<(String, u32)> {
        self.alarms
            .lock()
            .unwrap()
            .iter()
            .map(|(name, period)| (name.clone(), *period))
            .collect()
    }
}

#[async_trait]
impl Timer for ManualTimer {
    async fn clear_all(&self) -> Result<(), TimerError> {
        self.alarms.lock().unwrap().clear();
        *self.clear_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn create(&self, name: &str, period_minutes: u32) -> Result<(), TimerError> {
        if period_minutes == 0 {
            return Err(TimerError::InvalidPeriod);
        }
        self.alarms
            .lock()
            .unwrap()
            .insert(name.to_string(), period_minutes);
        Ok(())
    }
}

/// Reference date used by the harness clock.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// A fully wired service over fakes.
pub struct Harness {
    pub settings: Arc<MemorySettingsStore>,
    pub cookies: Arc<ScriptedCookieStore>,
    pub downloads: Arc<RecordingDownloadChannel>,
    pub blobs: Arc<BlobRegistry>,
    pub timer: Arc<ManualTimer>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: BackupService,
}

impl Harness {
    pub fn new(settings: MemorySettingsStore, cookies: ScriptedCookieStore) -> Self {
        let settings = Arc::new(settings);
        let cookies = Arc::new(cookies);
        let blobs = Arc::new(BlobRegistry::new());
        let downloads = Arc::new(RecordingDownloadChannel::new(Arc::clone(&blobs)));
        let timer = Arc::new(ManualTimer::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let service = BackupService::new(HostServices {
            settings: settings.clone(),
            cookies: cookies.clone(),
            downloads: downloads.clone(),
            blobs: Arc::clone(&blobs),
            timer: timer.clone(),
            notifier: notifier.clone(),
            clock: Arc::new(FixedClock::new(today())),
        });

        Self {
            settings,
            cookies,
            downloads,
            blobs,
            timer,
            notifier,
            service,
        }
    }
}

pub fn sample_cookies() -> Vec<Cookie> {
    vec![
        Cookie::new("a.com", "sid", "1"),
        Cookie::new("shop.example.com", "cart", "2"),
        Cookie::new("a.com", "pref", "3"),
        Cookie::new("b.com", "id", "4"),
    ]
}
