//! Cookie records, the host cookie store contract, and per-domain collection.
//!
//! Records mirror the host cookie API shape (camelCase JSON) so an export can be
//! re-imported by browser cookie tools. Cookie values are sensitive and are
//! redacted from `Debug` output.

mod collector;
mod parse;
mod store;

pub use collector::CookieCollector;
pub use parse::{ParsedCookies, parse_cookie_export};
pub use store::FileCookieStore;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Site entry meaning "every domain known to the cookie store".
pub const WILDCARD_SITE: &str = "<all>";

/// A single cookie as supplied by the host cookie store.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub domain: String,
    pub name: String,
    value: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub host_only: bool,
    #[serde(default)]
    pub session: bool,
    /// Expiry as seconds since the Unix epoch; absent for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    /// Host attributes this crate does not interpret, passed through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_path() -> String {
    "/".to_string()
}

impl Cookie {
    /// Creates a session cookie scoped to `/`.
    #[must_use]
    pub fn new(domain: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
            value: value.into(),
            path: default_path(),
            secure: false,
            http_only: false,
            host_only: false,
            session: true,
            expiration_date: None,
            same_site: None,
            store_id: None,
            extra: Map::new(),
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive — avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookie")
            .field("domain", &self.domain)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("expiration_date", &self.expiration_date)
            .finish_non_exhaustive()
    }
}

/// Cookies exported for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieGroup {
    pub domain: String,
    pub cookies: Vec<Cookie>,
}

/// Which sites an export covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteSelection {
    /// Every domain known to the cookie store.
    All,
    /// Explicit domains, trimmed, blanks removed.
    Domains(Vec<String>),
}

impl SiteSelection {
    /// Builds a selection from raw site entries.
    ///
    /// Any entry equal to [`WILDCARD_SITE`] selects every domain.
    pub fn from_sites<I, S>(sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut domains = Vec::new();
        for site in sites {
            let site = site.as_ref().trim();
            if site == WILDCARD_SITE {
                return Self::All;
            }
            if !site.is_empty() {
                domains.push(site.to_string());
            }
        }
        Self::Domains(domains)
    }

    /// Returns true when there is nothing to query.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Domains(domains) if domains.is_empty())
    }

    /// Human-readable description for notifications.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::All => "all domains".to_string(),
            Self::Domains(domains) => domains.join(", "),
        }
    }
}

/// Errors from the host cookie store.
#[derive(Debug, thiserror::Error)]
pub enum CookieStoreError {
    /// I/O error reading the cookie source.
    #[error("failed to read cookie source {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON cookie export could not be parsed.
    #[error("invalid cookie JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Cookie source contained no data.
    #[error("cookie source is empty")]
    EmptyInput,
    /// The store refused the query.
    #[error("cookie store unavailable: {0}")]
    Unavailable(String),
}

/// Host cookie store contract.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Returns every cookie, or only those matching `domain` when given.
    ///
    /// Matching follows [`domain_matches`].
    async fn get_all(&self, domain: Option<&str>) -> Result<Vec<Cookie>, CookieStoreError>;
}

/// Returns true if a cookie stored for `cookie_domain` matches the `filter`.
///
/// A cookie matches when its domain equals the filter or is a subdomain of it;
/// leading dots and ASCII case are ignored.
#[must_use]
pub fn domain_matches(cookie_domain: &str, filter: &str) -> bool {
    let cookie_domain = cookie_domain.trim().trim_start_matches('.').to_ascii_lowercase();
    let filter = filter.trim().trim_start_matches('.').to_ascii_lowercase();
    if filter.is_empty() {
        return false;
    }
    cookie_domain == filter
        || cookie_domain
            .strip_suffix(&filter)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
