//! # qbuyse-sitemap
//!
//! XML sitemap generation for the Qbuyse classifieds marketplace.
//!
//! The crate produces standards-compliant sitemap documents (sitemap protocol
//! 0.9) describing the site's public pages so search engines can discover
//! them: a sitemap index plus four sub-sitemaps for static pages, categories,
//! states and listings. Listings are paginated so no file exceeds the
//! configured URL cap.
//!
//! ## Architecture
//!
//! - **Configuration**: [`SitemapConfig`] held by a shared [`ConfigService`]
//! - **Generation**: [`SitemapGenerator`] composes documents from the
//!   [`reference`] tables and a [`PostStore`]
//! - **Serialization**: [`xml`] templates and a verification parser in [`parse`]
//! - **Caching**: [`DocumentCache`] keeps rendered documents for
//!   `cache_expiry_minutes`
//! - **Error Handling**: one [`Error`] enum with kinds and HTTP status hints
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use qbuyse_sitemap::{
//!     ConfigService, InMemoryPostStore, PostRecord, SitemapConfig, SitemapGenerator,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> qbuyse_sitemap::Result<()> {
//! let store = InMemoryPostStore::new();
//! store.push(PostRecord::new("42", chrono::Utc::now()));
//!
//! let config = Arc::new(ConfigService::new(SitemapConfig::default()));
//! let generator = SitemapGenerator::new(config, Arc::new(store))?;
//!
//! for page in 1..=generator.posts_page_count().await? {
//!     let xml = generator.generate_posts_sitemap(page).await?;
//!     assert!(xml.contains("https://qbuyse.com/post/42"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Failures inside a generation call come back as [`Error::Generation`]
//! carrying the cause; [`Error::status_code`] maps any error to an HTTP status:
//!
//! ```rust
//! use qbuyse_sitemap::Error;
//!
//! fn respond(err: &Error) -> (u16, String) {
//!     (err.status_code(), err.kind().to_string())
//! }
//!
//! let (status, code) = respond(&Error::InvalidRequest("page 0".into()));
//! assert_eq!(status, 400);
//! assert_eq!(code, "INVALID_REQUEST");
//! ```

/// TTL cache for rendered documents
pub mod cache;
/// Configuration and the shared configuration service
pub mod config;
/// Error types and result aliases
pub mod error;
/// Sitemap generator service
pub mod generator;
/// Sitemap XML reader used to verify generated documents
pub mod parse;
/// States, categories and static pages
pub mod reference;
/// Post data sources
pub mod source;
/// Deadline wrapper for data fetches
pub mod timeout;
/// Core data types
pub mod types;
/// Slug, URL, escaping and date helpers
pub mod url;
/// Sitemap protocol serialization
pub mod xml;

// Re-export commonly used types
pub use cache::{CacheStatsSummary, DocumentCache, DocumentKey};
pub use config::{
    ConfigService, ConfigValidation, DEFAULT_BASE_URL, DEFAULT_MAX_URLS_PER_SITEMAP,
    SitemapConfig, SitemapConfigUpdate,
};
pub use error::{Error, ErrorKind, Result};
pub use generator::{INDEX_LABEL, SitemapDocument, SitemapGenerator};
pub use source::{InMemoryPostStore, PostRecord, PostStore, RestPostStore, RestStoreConfig};
pub use types::*;
pub use xml::CONTENT_TYPE;
