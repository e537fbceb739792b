//! Export file naming.

use chrono::NaiveDate;

use crate::clock::format_date;
use crate::cookies::SiteSelection;
use crate::export::ExportKind;

/// Tag for instant exports covering several sites or all domains.
pub const INSTANT_EXPORT_TAG: &str = "instant_export";
/// Tag for scheduled exports.
pub const BACKUP_TAG: &str = "backup";

/// Returns the filename tag identifying what an export covers.
///
/// A single-site instant export uses the site with dots replaced by
/// underscores; other instant exports use [`INSTANT_EXPORT_TAG`]; scheduled
/// exports use [`BACKUP_TAG`].
#[must_use]
pub fn domain_tag(kind: &ExportKind, sites: &SiteSelection) -> String {
    match (kind, sites) {
        (ExportKind::Instant, SiteSelection::Domains(domains)) if domains.len() == 1 => {
            sanitize_tag(&domains[0])
        }
        (ExportKind::Instant, _) => INSTANT_EXPORT_TAG.to_string(),
        (ExportKind::Scheduled { .. }, _) => BACKUP_TAG.to_string(),
    }
}

/// Builds `<location>/cookies_<tag>_<YYYY-MM-DD>.json`.
///
/// The location segment is omitted when `location` is empty.
#[must_use]
pub fn export_filename(location: &str, tag: &str, date: NaiveDate) -> String {
    let name = format!("cookies_{tag}_{}.json", format_date(date));
    if location.is_empty() {
        name
    } else {
        format!("{location}/{name}")
    }
}

fn sanitize_tag(site: &str) -> String {
    site.trim()
        .chars()
        .map(|c| match c {
            '.' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}
