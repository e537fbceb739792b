//! Per-export cookie collection.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::{Cookie, CookieGroup, CookieStore, CookieStoreError, SiteSelection};

/// Gathers cookies for a [`SiteSelection`], grouped by domain.
pub struct CookieCollector {
    store: Arc<dyn CookieStore>,
}

impl CookieCollector {
    #[must_use]
    pub fn new(store: Arc<dyn CookieStore>) -> Self {
        Self { store }
    }

    /// Collects cookie groups for `sites`.
    ///
    /// For [`SiteSelection::All`] every cookie is fetched once and grouped by
    /// exact domain in first-seen order. For explicit domains each one is
    /// queried separately; a domain that fails or has no cookies is left out.
    ///
    /// # Errors
    ///
    /// Returns [`CookieStoreError`] only when fetching all cookies fails.
    #[instrument(level = "debug", skip(self))]
    pub async fn collect(&self, sites: &SiteSelection) -> Result<Vec<CookieGroup>, CookieStoreError> {
        let groups = match sites {
            SiteSelection::All => group_by_domain(self.store.get_all(None).await?),
            SiteSelection::Domains(domains) => self.collect_domains(domains).await,
        };
        info!(groups = groups.len(), "Cookies collected");
        Ok(groups)
    }

    async fn collect_domains(&self, domains: &[String]) -> Vec<CookieGroup> {
        let mut groups = Vec::new();
        for domain in domains {
            let domain = domain.trim();
            if domain.is_empty() {
                continue;
            }

            match self.store.get_all(Some(domain)).await {
                Ok(cookies) if cookies.is_empty() => {
                    debug!(domain, "No cookies for domain");
                }
                Ok(cookies) => groups.push(CookieGroup {
                    domain: domain.to_string(),
                    cookies,
                }),
                Err(error) => {
                    warn!(domain, error = %error, "Skipping domain after cookie store error");
                }
            }
        }
        groups
    }
}

fn group_by_domain(cookies: Vec<Cookie>) -> Vec<CookieGroup> {
    let mut groups: Vec<CookieGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for cookie in cookies {
        if let Some(&position) = index.get(&cookie.domain) {
            groups[position].cookies.push(cookie);
        } else {
            index.insert(cookie.domain.clone(), groups.len());
            groups.push(CookieGroup {
                domain: cookie.domain.clone(),
                cookies: vec![cookie],
            });
        }
    }
    groups
}
