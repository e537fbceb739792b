//! Settings store implementations.
//!
//! [`FileSettingsStore`] persists to `settings.json` in the user config dir:
//! `$COOKIE_BACKUP_CONFIG_DIR`, else `$XDG_CONFIG_HOME/cookie-backup`,
//! else `~/.config/cookie-backup`, else `%APPDATA%/cookie-backup`.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, instrument};

use super::{SettingKey, SettingsError, SettingsPatch, SettingsStore};

const APP_DIR_NAME: &str = "cookie-backup";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// JSON-file backed settings store.
///
/// Writes go through a temp file and rename, and the file is owner-only on
/// Unix since it may hold the export password.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: tokio::sync::Mutex<()>,
}

impl FileSettingsStore {
    /// Creates a store backed by `dir/settings.json`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self::at_path(dir.join(SETTINGS_FILE_NAME))
    }

    /// Creates a store backed by an explicit file path.
    #[must_use]
    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Creates a store in the default config directory.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ConfigDirUnavailable`] if no config dir can be found.
    pub fn open_default() -> Result<Self, SettingsError> {
        Ok(Self::in_dir(&default_config_dir()?))
    }

    /// Returns the settings file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>, SettingsError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(error) => return Err(error.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(SettingsError::NotAnObject {
                path: self.path.clone(),
            }),
        }
    }

    async fn write_all(&self, values: &Map<String, Value>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let payload = serde_json::to_vec_pretty(values)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, payload).await?;
        set_owner_only_permissions(&temp_path).await?;
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    async fn get(&self, keys: &[SettingKey]) -> Result<Map<String, Value>, SettingsError> {
        let all = self.read_all().await?;
        Ok(select_keys(&all, keys))
    }

    #[instrument(level = "debug", skip(self, patch), fields(path = %self.path.display()))]
    async fn set(&self, patch: SettingsPatch) -> Result<(), SettingsError> {
        if patch.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let mut values = self.read_all().await?;
        let patch = patch.into_inner();
        let keys: Vec<String> = patch.keys().cloned().collect();
        values.extend(patch);
        self.write_all(&values).await?;
        debug!(?keys, "Settings updated");
        Ok(())
    }
}

/// In-memory settings store.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<Map<String, Value>>,
}

impl MemorySettingsStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `patch`.
    #[must_use]
    pub fn with_values(patch: SettingsPatch) -> Self {
        Self {
            values: Mutex::new(patch.into_inner()),
        }
    }

    /// Returns a copy of every stored value.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, keys: &[SettingKey]) -> Result<Map<String, Value>, SettingsError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(select_keys(&values, keys))
    }

    async fn set(&self, patch: SettingsPatch) -> Result<(), SettingsError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(patch.into_inner());
        Ok(())
    }
}

fn select_keys(values: &Map<String, Value>, keys: &[SettingKey]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|key| {
            values
                .get(key.as_str())
                .map(|value| (key.as_str().to_string(), value.clone()))
        })
        .collect()
}

#[cfg(unix)]
async fn set_owner_only_permissions(path: &Path) -> Result<(), SettingsError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_owner_only_permissions(_path: &Path) -> Result<(), SettingsError> {
    Ok(())
}

/// Returns the default config directory from the environment.
///
/// # Errors
///
/// Returns [`SettingsError::ConfigDirUnavailable`] if no usable directory is found.
pub fn default_config_dir() -> Result<PathBuf, SettingsError> {
    resolve_config_dir(
        sanitize_env_path(env::var_os("COOKIE_BACKUP_CONFIG_DIR")),
        sanitize_env_path(env::var_os("XDG_CONFIG_HOME")),
        sanitize_env_path(env::var_os("HOME")),
        sanitize_env_path(env::var_os("APPDATA")),
    )
}

/// Picks the config directory from explicit candidates, in priority order.
///
/// # Errors
///
/// Returns [`SettingsError::ConfigDirUnavailable`] when every candidate is missing.
pub fn resolve_config_dir(
    explicit: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, SettingsError> {
    if let Some(explicit) = explicit {
        return Ok(explicit);
    }
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(APP_DIR_NAME));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(APP_DIR_NAME));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(APP_DIR_NAME));
    }

    Err(SettingsError::ConfigDirUnavailable)
}

pub(crate) fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }

    Some(PathBuf::from(value))
}
