//! Strict reader for sitemap documents.
//!
//! Reads a `<urlset>` or `<sitemapindex>` back into [`SitemapEntry`] and
//! [`SitemapIndexEntry`] values so generated output can be checked against
//! the sitemap protocol. The root element must carry the sitemap namespace,
//! and every record must have all of its fields in valid form. Anything else
//! is an [`Error::InvalidRequest`].

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::types::{ChangeFrequency, Priority, SitemapEntry, SitemapIndexEntry};
use crate::url::parse_sitemap_date;
use crate::xml::SITEMAP_NAMESPACE;
use crate::{Error, Result};

/// Top-level element of a sitemap document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootElement {
    /// `<urlset>`
    UrlSet,
    /// `<sitemapindex>`
    SitemapIndex,
}

impl RootElement {
    const fn tag(self) -> &'static str {
        match self {
            Self::UrlSet => "urlset",
            Self::SitemapIndex => "sitemapindex",
        }
    }

    const fn record_tag(self) -> &'static str {
        match self {
            Self::UrlSet => "url",
            Self::SitemapIndex => "sitemap",
        }
    }
}

/// Child elements of one record, in document order.
type Fields = Vec<(String, String)>;

/// Identify the root element of `xml`.
pub fn root_element(xml: &str) -> Result<RootElement> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) | Event::Empty(e) => {
                return match local_name(&e).as_str() {
                    "urlset" => Ok(RootElement::UrlSet),
                    "sitemapindex" => Ok(RootElement::SitemapIndex),
                    other => Err(Error::InvalidRequest(format!(
                        "<{other}> is not a sitemap root element"
                    ))),
                };
            },
            Event::Eof => return Err(Error::InvalidRequest("empty sitemap document".into())),
            _ => {},
        }
    }
}

/// Read every `<url>` of a `<urlset>`.
pub fn read_urlset(xml: &str) -> Result<Vec<SitemapEntry>> {
    read_records(xml, RootElement::UrlSet)?
        .into_iter()
        .map(|fields| {
            Ok(SitemapEntry {
                url: required(&fields, "url", "loc")?.to_string(),
                lastmod: parse_sitemap_date(required(&fields, "url", "lastmod")?)?,
                changefreq: required(&fields, "url", "changefreq")?.parse::<ChangeFrequency>()?,
                priority: parse_priority(required(&fields, "url", "priority")?)?,
            })
        })
        .collect()
}

/// Read every `<sitemap>` of a `<sitemapindex>`.
pub fn read_sitemap_index(xml: &str) -> Result<Vec<SitemapIndexEntry>> {
    read_records(xml, RootElement::SitemapIndex)?
        .into_iter()
        .map(|fields| {
            Ok(SitemapIndexEntry {
                loc: required(&fields, "sitemap", "loc")?.to_string(),
                lastmod: parse_sitemap_date(required(&fields, "sitemap", "lastmod")?)?,
            })
        })
        .collect()
}

/// Collect the text children of each record under `root`.
///
/// Depth 1 is the root, depth 2 a record, depth 3 a field.
fn read_records(xml: &str, root: RootElement) -> Result<Vec<Fields>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut open: Vec<String> = Vec::new();
    let mut records = Vec::new();
    let mut fields = Fields::new();
    let mut saw_root = false;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                let name = local_name(&e);
                match open.len() {
                    0 => {
                        check_root(&e, &name, root)?;
                        saw_root = true;
                    },
                    2 => fields.push((name.clone(), String::new())),
                    _ => {},
                }
                open.push(name);
            },
            Event::Empty(e) if open.is_empty() => {
                check_root(&e, &local_name(&e), root)?;
                saw_root = true;
            },
            Event::Text(text) if open.len() == 3 => {
                let value = text.unescape().map_err(malformed)?;
                if let Some((_, field)) = fields.last_mut() {
                    field.push_str(&value);
                }
            },
            Event::End(_) => {
                let closed = open.pop();
                if open.len() == 1 {
                    let record = std::mem::take(&mut fields);
                    if closed.as_deref() == Some(root.record_tag()) {
                        records.push(record);
                    }
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if !saw_root {
        return Err(Error::InvalidRequest(format!(
            "missing <{}> root element",
            root.tag()
        )));
    }
    Ok(records)
}

fn check_root(start: &BytesStart<'_>, name: &str, expected: RootElement) -> Result<()> {
    if name != expected.tag() {
        return Err(Error::InvalidRequest(format!(
            "expected <{}>, found <{name}>",
            expected.tag()
        )));
    }

    let namespace = start
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"xmlns")
        .map(|attr| attr.unescape_value().map(|v| v.into_owned()))
        .transpose()
        .map_err(malformed)?;

    match namespace.as_deref() {
        Some(SITEMAP_NAMESPACE) => Ok(()),
        Some(other) => Err(Error::InvalidRequest(format!(
            "unexpected sitemap namespace: {other}"
        ))),
        None => Err(Error::InvalidRequest(format!(
            "<{name}> is missing the sitemap namespace"
        ))),
    }
}

fn required<'a>(fields: &'a Fields, record: &str, field: &str) -> Result<&'a str> {
    fields
        .iter()
        .find(|(name, _)| name == field)
        .map(|(_, value)| value.as_str())
        .ok_or_else(|| Error::InvalidRequest(format!("<{record}> without <{field}>")))
}

fn parse_priority(text: &str) -> Result<Priority> {
    let value = text
        .parse::<f32>()
        .map_err(|_| Error::InvalidRequest(format!("priority is not a number: {text}")))?;
    Priority::new(value)
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn malformed(err: impl std::fmt::Display) -> Error {
    Error::InvalidRequest(format!("XML parse error: {err}"))
}
