//! Transient in-memory blobs addressed by object URLs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

const BLOB_URL_PREFIX: &str = "blob:cookie-backup/";

/// Downloadable bytes with a content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Blob {
    /// Creates an `application/json` blob.
    #[must_use]
    pub fn json(text: impl Into<String>) -> Self {
        Self {
            content_type: "application/json".to_string(),
            bytes: text.into().into_bytes(),
        }
    }
}

/// Object URL registry shared by the delivery manager and download channel.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    next_id: AtomicU64,
    blobs: Mutex<HashMap<String, Arc<Blob>>>,
}

impl BlobRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `blob` and returns its object URL.
    pub fn create_object_url(&self, blob: Blob) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!("{BLOB_URL_PREFIX}{id}");
        self.lock().insert(url.clone(), Arc::new(blob));
        debug!(url = %url, "Blob URL created");
        url
    }

    /// Looks up a live object URL.
    #[must_use]
    pub fn resolve(&self, url: &str) -> Option<Arc<Blob>> {
        self.lock().get(url).cloned()
    }

    /// Releases an object URL. Returns false if it was not registered.
    pub fn revoke_object_url(&self, url: &str) -> bool {
        let removed = self.lock().remove(url).is_some();
        if removed {
            debug!(url = %url, "Blob URL revoked");
        }
        removed
    }

    /// Number of live object URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Blob>>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_resolve_revoke() {
        let registry = BlobRegistry::new();
        let url = registry.create_object_url(Blob::json("[]"));
        assert!(url.starts_with(BLOB_URL_PREFIX));
        assert_eq!(registry.resolve(&url).unwrap().bytes, b"[]");
        assert_eq!(registry.len(), 1);

        assert!(registry.revoke_object_url(&url));
        assert!(registry.resolve(&url).is_none());
        assert!(registry.is_empty());
        assert!(!registry.revoke_object_url(&url));
    }

    #[test]
    fn test_urls_are_unique() {
        let registry = BlobRegistry::new();
        let first = registry.create_object_url(Blob::json("a"));
        let second = registry.create_object_url(Blob::json("b"));
        assert_ne!(first, second);
    }
}
