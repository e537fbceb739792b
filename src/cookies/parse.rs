//! Parsing of cookie exports used as the CLI's host cookie source.
//!
//! Supports:
//! - Netscape HTTP Cookie File format (7 TAB-separated fields, `#HttpOnly_` prefix)
//! - JSON cookie exports (array or `{ "cookies": [...] }`)

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{Cookie, CookieStoreError};

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Cookies parsed from an export, with non-fatal warnings.
#[derive(Debug, Default)]
pub struct ParsedCookies {
    pub cookies: Vec<Cookie>,
    pub warnings: Vec<String>,
}

/// Parses a Netscape or JSON cookie export.
///
/// Malformed entries are skipped and reported in [`ParsedCookies::warnings`].
///
/// # Errors
///
/// Returns [`CookieStoreError::EmptyInput`] for blank input, or
/// [`CookieStoreError::Json`] when JSON input is not a cookie array.
#[instrument(level = "debug", skip(input))]
pub fn parse_cookie_export(input: &str) -> Result<ParsedCookies, CookieStoreError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CookieStoreError::EmptyInput);
    }

    let parsed = if trimmed.starts_with('[') || trimmed.starts_with('{') {
        parse_json(trimmed)?
    } else {
        parse_netscape(trimmed)
    };

    for warning in &parsed.warnings {
        warn!("skipping cookie: {warning}");
    }
    debug!(cookies = parsed.cookies.len(), "Parsed cookie export");
    Ok(parsed)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonPayload {
    Array(Vec<Value>),
    Wrapped { cookies: Vec<Value> },
}

fn parse_json(input: &str) -> Result<ParsedCookies, CookieStoreError> {
    let entries = match serde_json::from_str::<JsonPayload>(input)? {
        JsonPayload::Array(entries) | JsonPayload::Wrapped { cookies: entries } => entries,
    };

    let mut parsed = ParsedCookies::default();
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Cookie>(entry) {
            Ok(cookie) if cookie.domain.trim().is_empty() => parsed
                .warnings
                .push(format!("entry {}: missing domain", index + 1)),
            Ok(cookie) if cookie.name.trim().is_empty() => parsed
                .warnings
                .push(format!("entry {}: missing name", index + 1)),
            Ok(cookie) => parsed.cookies.push(cookie),
            Err(error) => parsed.warnings.push(format!("entry {}: {error}", index + 1)),
        }
    }
    Ok(parsed)
}

fn parse_netscape(input: &str) -> ParsedCookies {
    let mut parsed = ParsedCookies::default();

    for (idx, raw_line) in input.lines().enumerate() {
        let line_number = idx + 1;
        let line = raw_line.trim_end();
        if line.is_empty() {
            continue;
        }

        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None if line.starts_with('#') => continue,
            None => (line, false),
        };

        match parse_netscape_line(line, http_only) {
            Ok(cookie) => parsed.cookies.push(cookie),
            Err(reason) => parsed.warnings.push(format!("line {line_number}: {reason}")),
        }
    }

    parsed
}

#[allow(clippy::cast_precision_loss)]
fn parse_netscape_line(line: &str, http_only: bool) -> Result<Cookie, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 7 {
        return Err(format!(
            "expected 7 TAB-separated fields, found {}",
            fields.len()
        ));
    }

    let domain = fields[0].trim();
    if domain.is_empty() {
        return Err("domain field is empty".to_string());
    }
    let tailmatch = parse_flag(fields[1], "tailmatch")?;
    let secure = parse_flag(fields[3], "secure")?;
    let expires = fields[4]
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("expires field must be a non-negative integer, got '{}'", fields[4]))?;
    let name = fields[5];
    if name.is_empty() {
        return Err("cookie name field is empty".to_string());
    }

    let mut cookie = Cookie::new(domain, name, fields[6]);
    cookie.path = if fields[2].is_empty() {
        "/".to_string()
    } else {
        fields[2].to_string()
    };
    cookie.secure = secure;
    cookie.http_only = http_only;
    cookie.host_only = !tailmatch;
    cookie.session = expires == 0;
    cookie.expiration_date = (expires > 0).then_some(expires as f64);
    Ok(cookie)
}

fn parse_flag(value: &str, field_name: &str) -> Result<bool, String> {
    match value {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(format!("{field_name} field must be TRUE or FALSE, got '{value}'")),
    }
}
