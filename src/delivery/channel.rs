//! Download channel contract and the filesystem implementation.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::blob::BlobRegistry;

/// A request to save an object URL under a relative filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    /// Relative path under the download root, `/`-separated.
    pub filename: String,
    /// Let the user pick another location before saving.
    pub save_as: bool,
}

/// Identifier of an issued download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DownloadId(pub u64);

/// Errors raised by a download channel.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The object URL is not registered (or was already revoked).
    #[error("unknown download source {0}")]
    UnknownSource(String),
    /// The filename is absolute, empty, or escapes the download root.
    #[error("invalid download filename '{0}'")]
    InvalidFilename(String),
    /// The user cancelled the save dialog.
    #[error("download cancelled")]
    Cancelled,
    /// Writing the file failed.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The host rejected the request.
    #[error("download channel unavailable: {0}")]
    Unavailable(String),
}

/// Host download channel.
#[async_trait]
pub trait DownloadChannel: Send + Sync {
    /// Starts saving `request.url` to `request.filename`.
    ///
    /// Returns once the request is issued; the caller does not wait for bytes
    /// to reach disk.
    async fn download(&self, request: DownloadRequest) -> Result<DownloadId, DownloadError>;
}

/// Saves blobs under a root directory, uniquifying on name conflicts.
#[derive(Debug)]
pub struct FsDownloadChannel {
    root: PathBuf,
    blobs: Arc<BlobRegistry>,
    next_id: AtomicU64,
    interactive: bool,
}

impl FsDownloadChannel {
    /// Creates a channel rooted at `root`.
    ///
    /// Save-as prompts are shown only when stdin and stderr are terminals.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, blobs: Arc<BlobRegistry>) -> Self {
        Self {
            root: root.into(),
            blobs,
            next_id: AtomicU64::new(0),
            interactive: io::stdin().is_terminal() && io::stderr().is_terminal(),
        }
    }

    /// Overrides whether save-as requests prompt.
    #[must_use]
    pub fn with_prompts(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Returns the download root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn prompt_for_path(&self, default: &Path) -> Result<Option<PathBuf>, DownloadError> {
        let shown = default.display().to_string();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stderr = io::stderr();
            write!(stderr, "Save export as [{shown}]: ")?;
            stderr.flush()?;
            let mut line = String::new();
            let read = io::stdin().lock().read_line(&mut line)?;
            if read == 0 {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
            }
            Ok(line)
        })
        .await
        .map_err(|error| DownloadError::Unavailable(error.to_string()))?;

        match answer {
            Ok(line) if line.trim().is_empty() => Ok(None),
            Ok(line) => Ok(Some(PathBuf::from(line.trim()))),
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                Err(DownloadError::Cancelled)
            }
            Err(error) => Err(DownloadError::Unavailable(error.to_string())),
        }
    }
}

#[async_trait]
impl DownloadChannel for FsDownloadChannel {
    #[instrument(level = "debug", skip(self), fields(filename = %request.filename))]
    async fn download(&self, request: DownloadRequest) -> Result<DownloadId, DownloadError> {
        let blob = self
            .blobs
            .resolve(&request.url)
            .ok_or_else(|| DownloadError::UnknownSource(request.url.clone()))?;

        let relative = validate_relative_path(&request.filename)?;
        let mut target = self.root.join(relative);
        if request.save_as
            && self.interactive
            && let Some(chosen) = self.prompt_for_path(&target).await?
        {
            target = if chosen.is_absolute() {
                chosen
            } else {
                self.root
                    .join(validate_relative_path(&chosen.to_string_lossy())?)
            };
        }

        let (dir, name) = split_target(&target, &request.filename)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| DownloadError::Io {
                path: dir.clone(),
                source,
            })?;
        let path = resolve_unique_path(&dir, &name);
        tokio::fs::write(&path, &blob.bytes)
            .await
            .map_err(|source| DownloadError::Io {
                path: path.clone(),
                source,
            })?;

        let id = DownloadId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        info!(path = %path.display(), bytes = blob.bytes.len(), "Export saved");
        Ok(id)
    }
}

fn validate_relative_path(filename: &str) -> Result<PathBuf, DownloadError> {
    let path = Path::new(filename);
    if filename.trim().is_empty() || path.is_absolute() {
        return Err(DownloadError::InvalidFilename(filename.to_string()));
    }
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(DownloadError::InvalidFilename(filename.to_string()));
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(DownloadError::InvalidFilename(filename.to_string()));
    }
    Ok(clean)
}

fn split_target(target: &Path, requested: &str) -> Result<(PathBuf, String), DownloadError> {
    let name = target
        .file_name()
        .map(|name| sanitize_filename(&name.to_string_lossy()))
        .ok_or_else(|| DownloadError::InvalidFilename(requested.to_string()))?;
    let dir = target.parent().map_or_else(PathBuf::new, Path::to_path_buf);
    Ok((dir, name))
}

fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        "export.json".to_string()
    } else {
        sanitized
    }
}

/// Returns `dir/filename`, or `dir/stem_N.ext` for the first free `N`.
fn resolve_unique_path(dir: &Path, filename: &str) -> PathBuf {
    let base_path = dir.join(filename);
    if !base_path.exists() {
        return base_path;
    }

    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    };

    let mut suffix = 1_u64;
    loop {
        let candidate = dir.join(format!("{stem}_{suffix}{ext}"));
        if !candidate.exists() {
            debug!(path = %candidate.display(), "Filename conflict resolved");
            return candidate;
        }
        suffix += 1;
    }
}
