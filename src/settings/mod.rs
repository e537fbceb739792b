//! Persisted export configuration and backup status.
//!
//! All state lives behind the [`SettingsStore`] key/value contract
//! (`get(keys)` / `set(patch)`), so components never touch ambient globals.
//! Values are stored as a flat JSON object keyed by [`SettingKey::as_str`].

mod store;

pub use store::{FileSettingsStore, MemorySettingsStore, default_config_dir, resolve_config_dir};

use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::warn;

/// Sentinel shown for a backup date that is unset or disabled.
pub const NOT_SET: &str = "—";

/// Errors for settings persistence and validation.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// No suitable user config directory is available.
    #[error(
        "unable to determine config directory (set COOKIE_BACKUP_CONFIG_DIR, XDG_CONFIG_HOME or HOME)"
    )]
    ConfigDirUnavailable,
    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// The settings file exists but is not a JSON object.
    #[error("settings file {path} does not contain a JSON object")]
    NotAnObject {
        /// Offending file.
        path: std::path::PathBuf,
    },
    /// Interval selector is not one of the supported values.
    #[error("unknown interval `{0}` (expected day, week, month, custom or off)")]
    UnknownInterval(String),
    /// Encryption was enabled without a password.
    #[error("a password is required when encryption is enabled")]
    MissingPassword,
}

/// Persisted keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Interval,
    CustomDays,
    Sites,
    Location,
    Encrypt,
    Password,
    LastBackup,
    NextBackup,
}

impl SettingKey {
    /// Every persisted key, in display order.
    pub const ALL: [SettingKey; 8] = [
        SettingKey::Interval,
        SettingKey::CustomDays,
        SettingKey::Sites,
        SettingKey::Location,
        SettingKey::Encrypt,
        SettingKey::Password,
        SettingKey::LastBackup,
        SettingKey::NextBackup,
    ];

    /// Keys that make up [`Settings`].
    pub const CONFIG: [SettingKey; 6] = [
        SettingKey::Interval,
        SettingKey::CustomDays,
        SettingKey::Sites,
        SettingKey::Location,
        SettingKey::Encrypt,
        SettingKey::Password,
    ];

    /// Returns the storage key name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::CustomDays => "customDays",
            Self::Sites => "sites",
            Self::Location => "location",
            Self::Encrypt => "encrypt",
            Self::Password => "password",
            Self::LastBackup => "lastBackup",
            Self::NextBackup => "nextBackup",
        }
    }
}

/// A partial update applied with [`SettingsStore::set`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch(Map<String, Value>);

impl SettingsPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one key.
    #[must_use]
    pub fn with(mut self, key: SettingKey, value: impl Into<Value>) -> Self {
        self.0.insert(key.as_str().to_string(), value.into());
        self
    }

    /// Returns true when the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw key/value pairs.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Persistent key/value store for configuration and backup status.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns the stored values for `keys`; absent keys are omitted.
    async fn get(&self, keys: &[SettingKey]) -> Result<Map<String, Value>, SettingsError>;

    /// Merges `patch` into the stored values.
    async fn set(&self, patch: SettingsPatch) -> Result<(), SettingsError>;
}

/// How often scheduled exports run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    #[default]
    Day,
    Week,
    Month,
    /// Every `n` days; always at least 1.
    Custom(u32),
    Off,
}

impl Interval {
    /// Builds an interval from its stored selector and optional day count.
    ///
    /// A custom day count that is absent, zero, or negative behaves as 1.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::UnknownInterval`] for an unsupported selector.
    pub fn parse(selector: &str, custom_days: Option<i64>) -> Result<Self, SettingsError> {
        match selector.trim() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "custom" => Ok(Self::custom(custom_days.unwrap_or(1))),
            "off" => Ok(Self::Off),
            other => Err(SettingsError::UnknownInterval(other.to_string())),
        }
    }

    /// Builds a custom interval, clamping the day count to at least 1.
    #[must_use]
    pub fn custom(days: i64) -> Self {
        Self::Custom(u32::try_from(days.max(1)).unwrap_or(u32::MAX))
    }

    /// Returns the stored selector string.
    #[must_use]
    pub fn selector(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Custom(_) => "custom",
            Self::Off => "off",
        }
    }

    /// Returns the custom day count, if any.
    #[must_use]
    pub fn custom_days(self) -> Option<u32> {
        match self {
            Self::Custom(days) => Some(days.max(1)),
            _ => None,
        }
    }

    /// Timer period in whole minutes, or `None` when scheduling is off.
    #[must_use]
    pub fn period_minutes(self) -> Option<u32> {
        match self {
            Self::Day => Some(1440),
            Self::Week => Some(10_080),
            Self::Month => Some(43_200),
            Self::Custom(days) => Some(days.max(1).saturating_mul(1440)),
            Self::Off => None,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(days) => write!(f, "{days} days"),
            other => f.write_str(other.selector()),
        }
    }
}

/// Export configuration.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub interval: Interval,
    /// Sites to export, in configured order.
    pub sites: Vec<String>,
    /// Sub-path under the download root, without leading/trailing slashes.
    pub location: String,
    pub encrypt: bool,
    /// Export password (sensitive — never log).
    pub password: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("interval", &self.interval)
            .field("sites", &self.sites)
            .field("location", &self.location)
            .field("encrypt", &self.encrypt)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Settings {
    /// Reads settings from stored values, applying defaults for absent keys.
    ///
    /// An unrecognized interval falls back to daily.
    #[must_use]
    pub fn from_values(values: &Map<String, Value>) -> Self {
        let custom_days = integer_value(values, SettingKey::CustomDays);
        let interval = match string_value(values, SettingKey::Interval) {
            Some(selector) if !selector.trim().is_empty() => {
                Interval::parse(&selector, custom_days).unwrap_or_else(|error| {
                    warn!(error = %error, "Falling back to daily interval");
                    Interval::Day
                })
            }
            _ => Interval::Day,
        };

        Self {
            interval,
            sites: parse_site_list(&string_value(values, SettingKey::Sites).unwrap_or_default()),
            location: normalize_location(
                &string_value(values, SettingKey::Location).unwrap_or_default(),
            ),
            encrypt: bool_value(values, SettingKey::Encrypt),
            password: string_value(values, SettingKey::Password).unwrap_or_default(),
        }
    }

    /// Converts the settings into a full patch (sites comma-joined).
    #[must_use]
    pub fn to_patch(&self) -> SettingsPatch {
        let mut patch = SettingsPatch::new()
            .with(SettingKey::Interval, self.interval.selector())
            .with(SettingKey::Sites, self.sites.join(","))
            .with(SettingKey::Location, self.location.clone())
            .with(SettingKey::Encrypt, self.encrypt)
            .with(SettingKey::Password, self.password.clone());
        if let Some(days) = self.interval.custom_days() {
            patch = patch.with(SettingKey::CustomDays, days);
        }
        patch
    }

    /// Checks that an enabled encryption has a password.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingPassword`] when `encrypt` is set and the
    /// password is empty.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.encrypt && self.password.is_empty() {
            return Err(SettingsError::MissingPassword);
        }
        Ok(())
    }
}

/// Last and next backup dates, or [`NOT_SET`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupStatus {
    pub last_backup: String,
    pub next_backup: String,
}

impl BackupStatus {
    /// Reads status from stored values.
    #[must_use]
    pub fn from_values(values: &Map<String, Value>) -> Self {
        let read = |key| {
            string_value(values, key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| NOT_SET.to_string())
        };
        Self {
            last_backup: read(SettingKey::LastBackup),
            next_backup: read(SettingKey::NextBackup),
        }
    }
}

/// Loads the export configuration.
///
/// # Errors
///
/// Propagates store failures.
pub async fn load_settings(store: &dyn SettingsStore) -> Result<Settings, SettingsError> {
    let values = store.get(&SettingKey::CONFIG).await?;
    Ok(Settings::from_values(&values))
}

/// Loads the backup status.
///
/// # Errors
///
/// Propagates store failures.
pub async fn load_status(store: &dyn SettingsStore) -> Result<BackupStatus, SettingsError> {
    let values = store
        .get(&[SettingKey::LastBackup, SettingKey::NextBackup])
        .await?;
    Ok(BackupStatus::from_values(&values))
}

/// Splits comma-separated site input, trimming entries and dropping blanks.
#[must_use]
pub fn parse_site_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|site| !site.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Trims a location and strips leading/trailing slashes.
#[must_use]
pub fn normalize_location(raw: &str) -> String {
    raw.trim().trim_matches('/').to_string()
}

fn string_value(values: &Map<String, Value>, key: SettingKey) -> Option<String> {
    match values.get(key.as_str())? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

// Form inputs may persist numbers as strings.
fn integer_value(values: &Map<String, Value>, key: SettingKey) -> Option<i64> {
    match values.get(key.as_str())? {
        Value::Number(value) => value.as_i64(),
        Value::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}

fn bool_value(values: &Map<String, Value>, key: SettingKey) -> bool {
    match values.get(key.as_str()) {
        Some(Value::Bool(value)) => *value,
        Some(Value::String(value)) => value.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
