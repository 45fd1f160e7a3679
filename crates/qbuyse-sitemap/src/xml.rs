//! Sitemap protocol serialization.
//!
//! Documents are composed from fixed templates in input order. Every locator
//! goes through [`escape_xml`] before it is written.

use std::fmt::Write;

use crate::types::{SitemapEntry, SitemapIndexEntry};
use crate::url::escape_xml;

/// XML declaration that starts every document.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Sitemap protocol namespace.
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// `Content-Type` for HTTP responses carrying a sitemap document.
pub const CONTENT_TYPE: &str = "application/xml; charset=utf-8";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Render a `<urlset>` document.
pub fn render_urlset(entries: &[SitemapEntry]) -> String {
    // ~160 bytes per <url> block
    let mut xml = String::with_capacity(128 + entries.len() * 160);
    xml.push_str(XML_DECLARATION);
    xml.push('\n');
    let _ = writeln!(xml, r#"<urlset xmlns="{SITEMAP_NAMESPACE}">"#);

    for entry in entries {
        let _ = write!(
            xml,
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{}</priority>\n  </url>\n",
            escape_xml(&entry.url),
            entry.lastmod.format(DATE_FORMAT),
            entry.changefreq,
            entry.priority,
        );
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Render a `<sitemapindex>` document.
pub fn render_sitemap_index(entries: &[SitemapIndexEntry]) -> String {
    let mut xml = String::with_capacity(128 + entries.len() * 96);
    xml.push_str(XML_DECLARATION);
    xml.push('\n');
    let _ = writeln!(xml, r#"<sitemapindex xmlns="{SITEMAP_NAMESPACE}">"#);

    for entry in entries {
        let _ = write!(
            xml,
            "  <sitemap>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n  </sitemap>\n",
            escape_xml(&entry.loc),
            entry.lastmod.format(DATE_FORMAT),
        );
    }

    xml.push_str("</sitemapindex>\n");
    xml
}
