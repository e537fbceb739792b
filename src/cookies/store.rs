//! File-backed host cookie store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{Cookie, CookieStore, CookieStoreError, domain_matches, parse_cookie_export};

/// Cookie store reading a Netscape or JSON cookie export from disk.
///
/// The file is re-read on every query so each export sees current contents.
#[derive(Debug, Clone)]
pub struct FileCookieStore {
    path: PathBuf,
}

impl FileCookieStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the cookie file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Cookie>, CookieStoreError> {
        let contents =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| CookieStoreError::Io {
                    path: self.path.clone(),
                    source,
                })?;
        Ok(parse_cookie_export(&contents)?.cookies)
    }
}

#[async_trait]
impl CookieStore for FileCookieStore {
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    async fn get_all(&self, domain: Option<&str>) -> Result<Vec<Cookie>, CookieStoreError> {
        let cookies = self.load().await?;
        let cookies: Vec<Cookie> = match domain {
            Some(filter) => cookies
                .into_iter()
                .filter(|cookie| domain_matches(&cookie.domain, filter))
                .collect(),
            None => cookies,
        };
        debug!(count = cookies.len(), "Cookies loaded");
        Ok(cookies)
    }
}
