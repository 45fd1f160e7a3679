use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Change frequency hints for sitemap entries.
///
/// These values indicate how frequently a page is likely to change,
/// though search engines may not follow these hints strictly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    /// The page changes every time it is accessed.
    Always,
    /// The page changes hourly.
    Hourly,
    /// The page changes daily.
    Daily,
    /// The page changes weekly.
    Weekly,
    /// The page changes monthly.
    Monthly,
    /// The page changes yearly.
    Yearly,
    /// The page is archived and will not change.
    Never,
}

impl ChangeFrequency {
    /// The lowercase form used inside `<changefreq>`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "never" => Ok(Self::Never),
            _ => Err(Error::InvalidRequest(format!("Invalid changefreq value: {s}"))),
        }
    }
}

/// Priority of a URL relative to other URLs on the site, in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Priority(f32);

impl Priority {
    /// Highest priority (`1.0`).
    pub const MAX: Self = Self(1.0);

    /// Build a priority, rejecting values outside `[0.0, 1.0]` and NaN.
    pub fn new(value: f32) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidRequest(format!(
                "Priority must be between 0.0 and 1.0, got {value}"
            )))
        }
    }

    /// Const constructor for reference tables; callers guarantee the range.
    pub(crate) const fn from_static(value: f32) -> Self {
        Self(value)
    }

    /// The raw value.
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// One `<url>` element of a `<urlset>` document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SitemapEntry {
    /// Absolute URL of the page (unescaped).
    pub url: String,
    /// Last modification date.
    pub lastmod: NaiveDate,
    /// How frequently the page changes.
    pub changefreq: ChangeFrequency,
    /// Priority of this URL relative to others.
    pub priority: Priority,
}

/// One `<sitemap>` element of a `<sitemapindex>` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SitemapIndexEntry {
    /// Absolute URL of the child sitemap (unescaped).
    pub loc: String,
    /// Last modification date of the child sitemap.
    pub lastmod: NaiveDate,
}

/// The four sub-sitemaps listed by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SitemapKind {
    /// Marketing and navigation pages.
    Static,
    /// One URL per listing category.
    Categories,
    /// One URL per state.
    States,
    /// Listing pages, paginated.
    Posts,
}

impl SitemapKind {
    /// All kinds in index order.
    pub const ALL: [Self; 4] = [Self::Static, Self::Categories, Self::States, Self::Posts];

    /// File name of the sitemap, relative to the base URL.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Static => "sitemap-static.xml",
            Self::Categories => "sitemap-categories.xml",
            Self::States => "sitemap-states.xml",
            Self::Posts => "sitemap-posts.xml",
        }
    }

    /// Short label used in logs and metadata.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Categories => "categories",
            Self::States => "states",
            Self::Posts => "posts",
        }
    }
}

impl fmt::Display for SitemapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for SitemapKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label() == s || kind.file_name() == s)
            .ok_or_else(|| Error::InvalidRequest(format!("Unknown sitemap type: {s}")))
    }
}

/// Observability record describing one generated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapMetadata {
    /// Sitemap label (`index`, `static`, `posts`, ...).
    pub sitemap_type: String,
    /// When the record was produced.
    pub generated_at: DateTime<Utc>,
    /// Number of URLs (or child sitemaps) in the document.
    pub url_count: usize,
    /// Base URL in effect.
    pub base_url: String,
    /// Per-file URL cap in effect.
    pub max_urls_per_sitemap: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_changefreq_parsing() {
        let test_cases = [
            ("always", ChangeFrequency::Always),
            ("hourly", ChangeFrequency::Hourly),
            ("daily", ChangeFrequency::Daily),
            ("weekly", ChangeFrequency::Weekly),
            ("monthly", ChangeFrequency::Monthly),
            ("yearly", ChangeFrequency::Yearly),
            ("never", ChangeFrequency::Never),
            // Case insensitive
            ("WEEKLY", ChangeFrequency::Weekly),
            ("Weekly", ChangeFrequency::Weekly),
        ];

        for (value, expected) in test_cases {
            let result: Result<ChangeFrequency> = value.parse();
            assert_eq!(result.unwrap(), expected, "Failed to parse: {value}");
        }

        assert!("fortnightly".parse::<ChangeFrequency>().is_err());
    }

    #[test]
    fn test_changefreq_display_round_trips() {
        for freq in [
            ChangeFrequency::Always,
            ChangeFrequency::Never,
            ChangeFrequency::Monthly,
        ] {
            assert_eq!(freq.to_string().parse::<ChangeFrequency>().unwrap(), freq);
        }
    }

    #[test]
    fn test_priority_bounds() {
        assert!(Priority::new(0.0).is_ok());
        assert!(Priority::new(1.0).is_ok());
        assert!(Priority::new(0.5).is_ok());
        assert!(Priority::new(1.5).is_err());
        assert!(Priority::new(-0.1).is_err());
        assert!(Priority::new(f32::NAN).is_err());
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(Priority::new(0.8).unwrap().to_string(), "0.8");
        assert_eq!(Priority::MAX.to_string(), "1.0");
        assert_eq!(Priority::new(0.0).unwrap().to_string(), "0.0");
    }

    #[test]
    fn test_kind_lookup() {
        assert_eq!("posts".parse::<SitemapKind>().unwrap(), SitemapKind::Posts);
        assert_eq!(
            "sitemap-states.xml".parse::<SitemapKind>().unwrap(),
            SitemapKind::States
        );
        assert!("sitemap.xml".parse::<SitemapKind>().is_err());
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let metadata = SitemapMetadata {
            sitemap_type: "static".to_string(),
            generated_at: Utc::now(),
            url_count: 8,
            base_url: "https://qbuyse.com".to_string(),
            max_urls_per_sitemap: 50_000,
        };

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["sitemapType"], "static");
        assert_eq!(json["urlCount"], 8);
        assert_eq!(json["maxUrlsPerSitemap"], 50_000);
    }
}
