//! Sitemap generation service.
//!
//! [`SitemapGenerator`] turns the reference tables and the post store into
//! sitemap protocol documents. It reads a fresh configuration snapshot on every
//! call, so updates made through the shared [`ConfigService`] apply to the next
//! generation without rebuilding the generator.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use qbuyse_sitemap::{ConfigService, InMemoryPostStore, SitemapConfig, SitemapGenerator};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> qbuyse_sitemap::Result<()> {
//! let config = Arc::new(ConfigService::new(SitemapConfig::default()));
//! let generator = SitemapGenerator::new(config, Arc::new(InMemoryPostStore::new()))?;
//!
//! let index = generator.generate_sitemap_index().await?;
//! assert!(index.contains("https://qbuyse.com/sitemap-posts.xml"));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info, instrument};

use crate::cache::{CacheStatsSummary, DocumentCache, DocumentKey};
use crate::config::{ConfigService, SitemapConfig, SitemapConfigUpdate};
use crate::reference::{CATEGORIES, STATES, STATIC_PAGES};
use crate::source::PostStore;
use crate::timeout::with_timeout;
use crate::types::{
    ChangeFrequency, Priority, SitemapEntry, SitemapIndexEntry, SitemapKind, SitemapMetadata,
};
use crate::url::{join_url_paths, push_path_segments};
use crate::xml::{render_sitemap_index, render_urlset};
use crate::{Error, Result};

/// Metadata label of the index document.
pub const INDEX_LABEL: &str = "index";

const CATEGORY_PRIORITY: Priority = Priority::from_static(0.8);
const STATE_PRIORITY: Priority = Priority::from_static(0.7);
const POST_PRIORITY: Priority = Priority::from_static(0.6);

/// A generated document together with its observability record.
#[derive(Debug, Clone)]
pub struct SitemapDocument {
    /// The XML document.
    pub xml: Arc<str>,
    /// What was generated and under which configuration.
    pub metadata: SitemapMetadata,
}

/// Rendered XML plus the number of `<url>`/`<sitemap>` elements it holds.
struct Rendered {
    xml: String,
    url_count: usize,
}

impl Rendered {
    fn urlset(entries: &[SitemapEntry]) -> Self {
        Self {
            xml: render_urlset(entries),
            url_count: entries.len(),
        }
    }
}

/// Generates sitemap documents for the marketplace.
pub struct SitemapGenerator {
    config: Arc<ConfigService>,
    posts: Arc<dyn PostStore>,
    cache: Option<Arc<DocumentCache>>,
}

impl std::fmt::Debug for SitemapGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SitemapGenerator")
            .field("config", &self.config)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl SitemapGenerator {
    /// Create a generator with its own document cache.
    ///
    /// Fails with [`Error::Configuration`] listing every violated rule if the
    /// current configuration is invalid.
    pub fn new(config: Arc<ConfigService>, posts: Arc<dyn PostStore>) -> Result<Self> {
        Self::build(config, posts, Some(Arc::new(DocumentCache::new())))
    }

    /// Create a generator sharing `cache` with other generators.
    pub fn with_cache(
        config: Arc<ConfigService>,
        posts: Arc<dyn PostStore>,
        cache: Arc<DocumentCache>,
    ) -> Result<Self> {
        Self::build(config, posts, Some(cache))
    }

    /// Create a generator that renders every document afresh.
    pub fn without_cache(config: Arc<ConfigService>, posts: Arc<dyn PostStore>) -> Result<Self> {
        Self::build(config, posts, None)
    }

    fn build(
        config: Arc<ConfigService>,
        posts: Arc<dyn PostStore>,
        cache: Option<Arc<DocumentCache>>,
    ) -> Result<Self> {
        config.validate_config().into_result()?;
        debug!(
            base_url = %config.config().base_url,
            cached = cache.is_some(),
            "Created sitemap generator"
        );
        Ok(Self {
            config,
            posts,
            cache,
        })
    }

    /// Snapshot of the configuration in effect.
    pub fn config(&self) -> SitemapConfig {
        self.config.config()
    }

    /// Merge `update` into the shared configuration.
    ///
    /// Invalid results are rejected and leave the configuration untouched.
    /// Cached documents rendered under the previous configuration are no
    /// longer served.
    pub fn update_config(&self, update: SitemapConfigUpdate) -> Result<SitemapConfig> {
        self.config.update_config(update)
    }

    /// Drop every cached document.
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear().await;
        }
    }

    /// Cache counters, or `None` when caching is disabled.
    pub async fn cache_stats(&self) -> Option<CacheStatsSummary> {
        match &self.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }

    /// Build an observability record for a document with `url_count` entries.
    pub fn sitemap_metadata(&self, sitemap_type: &str, url_count: usize) -> SitemapMetadata {
        metadata_for(&self.config.config(), sitemap_type, url_count)
    }

    /// The sitemap index listing the four sub-sitemaps.
    pub async fn generate_sitemap_index(&self) -> Result<String> {
        self.render_string(DocumentKey::Index).await
    }

    /// Static pages sitemap.
    pub async fn generate_static_sitemap(&self) -> Result<String> {
        self.generate(SitemapKind::Static, 1).await
    }

    /// One URL per category.
    pub async fn generate_categories_sitemap(&self) -> Result<String> {
        self.generate(SitemapKind::Categories, 1).await
    }

    /// One URL per state.
    pub async fn generate_states_sitemap(&self) -> Result<String> {
        self.generate(SitemapKind::States, 1).await
    }

    /// One page of listings, newest first. Pages are one-based.
    pub async fn generate_posts_sitemap(&self, page: u32) -> Result<String> {
        self.generate(SitemapKind::Posts, page).await
    }

    /// Generate the sub-sitemap `kind`; `page` only varies for posts.
    pub async fn generate(&self, kind: SitemapKind, page: u32) -> Result<String> {
        self.render_string(DocumentKey::Sitemap { kind, page }).await
    }

    /// Number of posts pages at the current cap (at least one).
    #[instrument(skip(self))]
    pub async fn posts_page_count(&self) -> Result<u32> {
        let config = self.config.config();
        let count = with_timeout(
            config.generation_timeout(),
            "count posts",
            self.posts.count_posts(),
        )
        .await
        .map_err(|e| {
            error!(sitemap = SitemapKind::Posts.label(), error = %e, "Failed to count posts");
            Error::generation(SitemapKind::Posts.label(), e)
        })?;

        let pages = count
            .div_ceil(u64::from(config.max_urls_per_sitemap))
            .max(1);
        Ok(u32::try_from(pages).unwrap_or(u32::MAX))
    }

    /// Generate any document together with its metadata.
    pub async fn generate_document(&self, key: DocumentKey) -> Result<SitemapDocument> {
        validate_key(key)?;
        let (config, revision) = self.config.snapshot();
        let label = key_label(key);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key, revision).await {
                debug!(sitemap = label, url_count = hit.url_count, "Serving cached sitemap");
                return Ok(SitemapDocument {
                    xml: hit.xml,
                    metadata: metadata_for(&config, label, hit.url_count),
                });
            }
        }

        debug!(sitemap = label, ?key, "Generating sitemap");
        let started = Instant::now();
        let rendered = self.render(key, &config).await.map_err(|e| {
            error!(sitemap = label, error = %e, "Sitemap generation failed");
            Error::generation(label, e)
        })?;

        info!(
            sitemap = label,
            url_count = rendered.url_count,
            elapsed_ms = started.elapsed().as_millis(),
            "Generated sitemap"
        );

        let xml: Arc<str> = Arc::from(rendered.xml);
        let cache = self.cache.as_ref().filter(|_| is_cacheable(key, rendered.url_count));
        if let Some(cache) = cache {
            cache
                .insert(
                    key,
                    revision,
                    Arc::clone(&xml),
                    rendered.url_count,
                    config.cache_ttl(),
                )
                .await;
        }

        Ok(SitemapDocument {
            xml,
            metadata: metadata_for(&config, label, rendered.url_count),
        })
    }

    async fn render_string(&self, key: DocumentKey) -> Result<String> {
        let document = self.generate_document(key).await?;
        Ok(document.xml.to_string())
    }

    async fn render(&self, key: DocumentKey, config: &SitemapConfig) -> Result<Rendered> {
        let today = Utc::now().date_naive();
        match key {
            DocumentKey::Index => Ok(index_document(config, today)),
            DocumentKey::Sitemap { kind, page } => {
                let entries = match kind {
                    SitemapKind::Static => static_entries(config, today),
                    SitemapKind::Categories => category_entries(config, today),
                    SitemapKind::States => state_entries(config, today),
                    SitemapKind::Posts => self.post_entries(config, page).await?,
                };
                Ok(Rendered::urlset(&entries))
            },
        }
    }

    async fn post_entries(&self, config: &SitemapConfig, page: u32) -> Result<Vec<SitemapEntry>> {
        let limit = config.max_urls_per_sitemap;
        let offset = u64::from(page.saturating_sub(1)) * u64::from(limit);

        let mut posts = with_timeout(
            config.generation_timeout(),
            "fetch posts",
            self.posts.fetch_posts(offset, limit),
        )
        .await?;
        // A store may ignore the limit; never exceed the cap.
        posts.truncate(limit as usize);

        posts
            .into_iter()
            .map(|post| {
                Ok(SitemapEntry {
                    url: push_path_segments(&config.base_url, ["post", post.id.as_str()])?,
                    lastmod: post.created_at.date_naive(),
                    changefreq: ChangeFrequency::Weekly,
                    priority: POST_PRIORITY,
                })
            })
            .collect()
    }
}

/// Empty posts pages past the first are not cached, so requests for arbitrary
/// page numbers cannot fill the cache.
const fn is_cacheable(key: DocumentKey, url_count: usize) -> bool {
    !matches!(
        key,
        DocumentKey::Sitemap {
            kind: SitemapKind::Posts,
            page: 2..,
        }
    ) || url_count > 0
}

fn metadata_for(config: &SitemapConfig, label: &str, url_count: usize) -> SitemapMetadata {
    SitemapMetadata {
        sitemap_type: label.to_string(),
        generated_at: Utc::now(),
        url_count,
        base_url: config.base_url.clone(),
        max_urls_per_sitemap: config.max_urls_per_sitemap,
    }
}

fn validate_key(key: DocumentKey) -> Result<()> {
    match key {
        DocumentKey::Index => Ok(()),
        DocumentKey::Sitemap { page: 0, .. } => Err(Error::InvalidRequest(
            "Page numbers start at 1".to_string(),
        )),
        DocumentKey::Sitemap {
            kind: SitemapKind::Posts,
            ..
        }
        | DocumentKey::Sitemap { page: 1, .. } => Ok(()),
        DocumentKey::Sitemap { kind, page } => Err(Error::InvalidRequest(format!(
            "The {kind} sitemap has a single page, got page {page}"
        ))),
    }
}

const fn key_label(key: DocumentKey) -> &'static str {
    match key {
        DocumentKey::Index => INDEX_LABEL,
        DocumentKey::Sitemap { kind, .. } => kind.label(),
    }
}

fn index_document(config: &SitemapConfig, today: NaiveDate) -> Rendered {
    let entries: Vec<SitemapIndexEntry> = SitemapKind::ALL
        .into_iter()
        .map(|kind| SitemapIndexEntry {
            loc: join_url_paths(&config.base_url, [kind.file_name()]),
            lastmod: today,
        })
        .collect();
    Rendered {
        xml: render_sitemap_index(&entries),
        url_count: entries.len(),
    }
}

fn static_entries(config: &SitemapConfig, today: NaiveDate) -> Vec<SitemapEntry> {
    STATIC_PAGES
        .iter()
        .take(config.max_urls_per_sitemap as usize)
        .map(|page| SitemapEntry {
            url: join_url_paths(&config.base_url, [page.path]),
            lastmod: today,
            changefreq: page.changefreq,
            priority: page.priority,
        })
        .collect()
}

fn category_entries(config: &SitemapConfig, today: NaiveDate) -> Vec<SitemapEntry> {
    CATEGORIES
        .iter()
        .take(config.max_urls_per_sitemap as usize)
        .map(|category| SitemapEntry {
            url: join_url_paths(&config.base_url, ["category", category.slug]),
            lastmod: today,
            changefreq: ChangeFrequency::Daily,
            priority: CATEGORY_PRIORITY,
        })
        .collect()
}

fn state_entries(config: &SitemapConfig, today: NaiveDate) -> Vec<SitemapEntry> {
    STATES
        .iter()
        .take(config.max_urls_per_sitemap as usize)
        .map(|state| SitemapEntry {
            url: join_url_paths(&config.base_url, ["state", state.slug]),
            lastmod: today,
            changefreq: ChangeFrequency::Daily,
            priority: STATE_PRIORITY,
        })
        .collect()
}
