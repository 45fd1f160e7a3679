//! URL, slug and date helpers shared by the sitemap builders.
//!
//! Every function here is pure.
//!
//! ```rust
//! use qbuyse_sitemap::url::{generate_slug, join_url_paths};
//!
//! assert_eq!(generate_slug("Tamil Nadu"), "tamil-nadu");
//! assert_eq!(
//!     join_url_paths("https://qbuyse.com/", ["state", "tamil-nadu"]),
//!     "https://qbuyse.com/state/tamil-nadu"
//! );
//! ```

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use ::url::Url;

use crate::{Error, Result};

/// Derive a URL slug from human-readable text.
///
/// Lowercases and trims the input, drops everything except ASCII word
/// characters, whitespace and hyphens, then collapses each run of
/// whitespace, underscores and hyphens into one `-`. Leading and trailing
/// hyphens never survive.
///
/// ```rust
/// use qbuyse_sitemap::url::generate_slug;
///
/// assert_eq!(generate_slug("Hello & World!"), "hello-world");
/// assert_eq!(generate_slug("  -Hello World-  "), "hello-world");
/// ```
#[must_use]
pub fn generate_slug(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for c in lowered.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_hyphen = true;
        }
    }

    slug
}

/// Check that `text` is an absolute `http` or `https` URL with a host.
#[must_use]
pub fn is_valid_url(text: &str) -> bool {
    Url::parse(text).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
    })
}

/// Prefix `https://` unless the text already names an HTTP scheme.
#[must_use]
pub fn ensure_protocol(text: &str) -> Cow<'_, str> {
    if text.starts_with("http://") || text.starts_with("https://") {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("https://{text}"))
    }
}

/// Join a base URL and path segments with single slashes.
///
/// Trailing slashes are stripped from `base`, surrounding slashes from each
/// segment, and segments that end up empty are skipped.
pub fn join_url_paths<I, S>(base: &str, segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.as_ref().trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        joined.push('/');
        joined.push_str(segment);
    }
    joined
}

/// Escape the five XML special characters.
///
/// Returns the input unchanged when nothing needs escaping.
#[must_use]
pub fn escape_xml(text: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(text)
}

/// Append percent-encoded path segments to an absolute URL.
///
/// Unlike [`join_url_paths`], each segment is taken literally: `/`, `?`, `#`
/// and spaces inside a segment are encoded rather than shaping the URL.
///
/// ```rust
/// use qbuyse_sitemap::url::push_path_segments;
///
/// let url = push_path_segments("https://qbuyse.com/", ["post", "a b/c"])?;
/// assert_eq!(url, "https://qbuyse.com/post/a%20b%2Fc");
/// # Ok::<(), qbuyse_sitemap::Error>(())
/// ```
pub fn push_path_segments<I, S>(base: &str, segments: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = Url::parse(base)
        .map_err(|e| Error::InvalidRequest(format!("Invalid base URL '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| Error::InvalidRequest(format!("Base URL '{base}' cannot have a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

/// Format a timestamp as a sitemap `lastmod` date (`YYYY-MM-DD`, UTC).
pub fn format_sitemap_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
    date.with_timezone(&Utc)
        .date_naive()
        .format("%Y-%m-%d")
        .to_string()
}

/// Parse an ISO-8601 date or timestamp string into its UTC calendar date.
///
/// Supports:
/// - `2024-01-15` (date only)
/// - `2024-01-15T10:30:00Z` / `2024-01-15T10:30:00+05:30` (RFC 3339)
/// - `2024-01-15T10:30:00` and `2024-01-15T10:30:00.000` (assumed UTC)
pub fn parse_sitemap_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }

    Err(Error::InvalidRequest(format!("Unrecognized date: {text}")))
}
