//! TTL cache for generated sitemap documents.
//!
//! Entries expire `cache_expiry_minutes` after they were stored, or as soon as
//! the configuration revision they were rendered under is superseded. Stale
//! entries are evicted lazily on lookup, in bulk through
//! [`DocumentCache::purge_expired`], or periodically by
//! [`DocumentCache::spawn_sweeper`]. The cache holds at most
//! [`DocumentCache::capacity`] documents; inserting into a full cache drops
//! expired entries first and then the oldest ones. [`CacheStats`] counters are
//! exposed for observability.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::debug;

use crate::types::SitemapKind;

/// Upper bound for TTLs too large to add to an `Instant`.
const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Default number of documents a cache holds.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Identifies one cached document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    /// The sitemap index.
    Index,
    /// A sub-sitemap; `page` is `1` for everything but paginated posts.
    Sitemap {
        /// Which sitemap.
        kind: SitemapKind,
        /// One-based page number.
        page: u32,
    },
}

#[derive(Debug, Clone)]
struct CachedDocument {
    xml: Arc<str>,
    url_count: usize,
    revision: u64,
    inserted_at: Instant,
    expires_at: Instant,
}

impl CachedDocument {
    fn is_fresh(&self, revision: u64, now: Instant) -> bool {
        self.revision == revision && self.expires_at > now
    }
}

/// A cached document returned by [`DocumentCache::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
    /// The document.
    pub xml: Arc<str>,
    /// Number of URLs the document lists.
    pub url_count: usize,
}

#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsSummary {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that found nothing fresh.
    pub misses: u64,
    /// Entries removed because they expired, were displaced by newer entries
    /// in a full cache, or the cache was cleared.
    pub evictions: u64,
    /// Entries currently stored (fresh or not yet purged).
    pub entries: usize,
}

/// Shared document cache.
#[derive(Debug)]
pub struct DocumentCache {
    documents: RwLock<HashMap<DocumentKey, CachedDocument>>,
    max_entries: usize,
    stats: CacheStats,
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl DocumentCache {
    /// Create an empty cache holding up to [`DEFAULT_MAX_ENTRIES`] documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache holding up to `max_entries` documents (at least one).
    pub fn with_capacity(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            documents: RwLock::new(HashMap::with_capacity(max_entries.min(DEFAULT_MAX_ENTRIES))),
            max_entries,
            stats: CacheStats::default(),
        }
    }

    /// Maximum number of documents held at once.
    pub const fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Purge expired entries every `period` in a background task.
    ///
    /// The task holds a weak reference and ends once the cache is dropped.
    /// Periods shorter than a second are rounded up to one second.
    pub fn spawn_sweeper(cache: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(cache);
        let period = period.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            timer.tick().await;
            loop {
                timer.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.purge_expired().await;
                if removed > 0 {
                    debug!(removed, "Swept expired sitemap documents");
                }
            }
        })
    }

    /// Look up a document rendered under `revision` that has not expired.
    ///
    /// Stale entries are evicted.
    pub async fn get(&self, key: &DocumentKey, revision: u64) -> Option<CacheHit> {
        let now = Instant::now();
        {
            let documents = self.documents.read().await;
            match documents.get(key) {
                Some(doc) if doc.is_fresh(revision, now) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(CacheHit {
                        xml: Arc::clone(&doc.xml),
                        url_count: doc.url_count,
                    });
                },
                Some(_) => {},
                None => {
                    self.stats.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                },
            }
        }

        // Stale: re-check under the write lock, another task may have refreshed it.
        let mut documents = self.documents.write().await;
        if documents.get(key).is_some_and(|doc| !doc.is_fresh(revision, now)) {
            documents.remove(key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(?key, "Evicted stale sitemap document");
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a document rendered under `revision` for `ttl`.
    pub async fn insert(
        &self,
        key: DocumentKey,
        revision: u64,
        xml: Arc<str>,
        url_count: usize,
        ttl: Duration,
    ) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or_else(|| now + MAX_TTL);
        let mut documents = self.documents.write().await;
        if !documents.contains_key(&key) && documents.len() >= self.max_entries {
            let removed = make_room(&mut documents, self.max_entries - 1, now);
            self.stats
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(
                removed,
                capacity = self.max_entries,
                "Evicted sitemap documents from full cache"
            );
        }
        documents.insert(
            key,
            CachedDocument {
                xml,
                url_count,
                revision,
                inserted_at: now,
                expires_at,
            },
        );
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut documents = self.documents.write().await;
        let removed = documents.len() as u64;
        documents.clear();
        self.stats.evictions.fetch_add(removed, Ordering::Relaxed);
        if removed > 0 {
            debug!(removed, "Cleared sitemap cache");
        }
    }

    /// Remove all expired entries, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|_, doc| doc.expires_at > now);
        let removed = before - documents.len();
        self.stats
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Current counters.
    pub async fn stats(&self) -> CacheStatsSummary {
        CacheStatsSummary {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            entries: self.documents.read().await.len(),
        }
    }
}

/// Shrink `documents` to at most `target` entries, expired ones first and
/// then by insertion time. Returns how many were removed.
fn make_room(
    documents: &mut HashMap<DocumentKey, CachedDocument>,
    target: usize,
    now: Instant,
) -> usize {
    let before = documents.len();
    documents.retain(|_, doc| doc.expires_at > now);

    let excess = documents.len().saturating_sub(target);
    if excess > 0 {
        let mut by_age: Vec<(Instant, DocumentKey)> = documents
            .iter()
            .map(|(key, doc)| (doc.inserted_at, *key))
            .collect();
        by_age.sort_unstable_by_key(|(inserted_at, _)| *inserted_at);
        for (_, key) in by_age.into_iter().take(excess) {
            documents.remove(&key);
        }
    }
    before - documents.len()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const POSTS_PAGE_2: DocumentKey = DocumentKey::Sitemap {
        kind: SitemapKind::Posts,
        page: 2,
    };

    #[tokio::test(start_paused = true)]
    async fn test_hit_before_expiry() {
        let cache = DocumentCache::new();
        cache
            .insert(DocumentKey::Index, 0, Arc::from("<xml/>"), 4, Duration::from_secs(60))
            .await;

        tokio::time::advance(Duration::from_secs(59)).await;
        let hit = cache.get(&DocumentKey::Index, 0).await.unwrap();
        assert_eq!(&*hit.xml, "<xml/>");
        assert_eq!(hit.url_count, 4);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_evicted() {
        let cache = DocumentCache::new();
        cache
            .insert(POSTS_PAGE_2, 0, Arc::from("<xml/>"), 1, Duration::from_secs(60))
            .await;

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get(&POSTS_PAGE_2, 0).await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 0);
    }

    #[tokio::test]
    async fn test_pages_are_cached_independently() {
        let cache = DocumentCache::new();
        cache
            .insert(POSTS_PAGE_2, 0, Arc::from("page two"), 1, Duration::from_secs(60))
            .await;

        let page_one = DocumentKey::Sitemap {
            kind: SitemapKind::Posts,
            page: 1,
        };
        assert!(cache.get(&page_one, 0).await.is_none());
        assert!(cache.get(&POSTS_PAGE_2, 0).await.is_some());
    }

    #[tokio::test]
    async fn test_superseded_revision_is_stale() {
        let cache = DocumentCache::new();
        cache
            .insert(DocumentKey::Index, 3, Arc::from("old"), 4, Duration::from_secs(60))
            .await;

        assert!(cache.get(&DocumentKey::Index, 4).await.is_none());
        // Evicted, so even the old revision misses now.
        assert!(cache.get(&DocumentKey::Index, 3).await.is_none());
        assert_eq!(cache.stats().await.evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_and_clear() {
        let cache = DocumentCache::new();
        cache
            .insert(DocumentKey::Index, 0, Arc::from("a"), 4, Duration::from_secs(10))
            .await;
        cache
            .insert(POSTS_PAGE_2, 0, Arc::from("b"), 1, Duration::from_secs(120))
            .await;

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.stats().await.entries, 1);

        cache.clear().await;
        let stats = cache.stats().await;
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.evictions, 2);
    }

    fn page(page: u32) -> DocumentKey {
        DocumentKey::Sitemap {
            kind: SitemapKind::Posts,
            page,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_drops_the_oldest_entry() {
        let cache = DocumentCache::with_capacity(2);
        for n in 1..=3 {
            cache
                .insert(page(n), 0, Arc::from("doc"), 1, Duration::from_secs(60))
                .await;
            tokio::time::advance(Duration::from_secs(1)).await;
        }

        assert!(cache.get(&page(1), 0).await.is_none());
        assert!(cache.get(&page(2), 0).await.is_some());
        assert!(cache.get(&page(3), 0).await.is_some());
        let stats = cache.stats().await;
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_prefers_dropping_expired_entries() {
        let cache = DocumentCache::with_capacity(2);
        cache
            .insert(page(1), 0, Arc::from("long"), 1, Duration::from_secs(600))
            .await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache
            .insert(page(2), 0, Arc::from("short"), 1, Duration::from_secs(5))
            .await;
        tokio::time::advance(Duration::from_secs(10)).await;

        cache
            .insert(page(3), 0, Arc::from("new"), 1, Duration::from_secs(60))
            .await;
        assert!(cache.get(&page(1), 0).await.is_some());
        assert!(cache.get(&page(3), 0).await.is_some());
        assert_eq!(cache.stats().await.entries, 2);
    }

    #[tokio::test]
    async fn test_replacing_an_entry_does_not_evict() {
        let cache = DocumentCache::with_capacity(1);
        assert_eq!(DocumentCache::with_capacity(0).capacity(), 1);

        cache
            .insert(DocumentKey::Index, 0, Arc::from("a"), 4, Duration::from_secs(60))
            .await;
        cache
            .insert(DocumentKey::Index, 1, Arc::from("b"), 4, Duration::from_secs(60))
            .await;

        let hit = cache.get(&DocumentKey::Index, 1).await.unwrap();
        assert_eq!(&*hit.xml, "b");
        assert_eq!(cache.stats().await.evictions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_expired_entries() {
        let cache = Arc::new(DocumentCache::new());
        cache
            .insert(DocumentKey::Index, 0, Arc::from("a"), 4, Duration::from_secs(30))
            .await;
        let sweeper = DocumentCache::spawn_sweeper(&cache, Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(61)).await;
        let stats = cache.stats().await;
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.evictions, 1);

        drop(cache);
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(sweeper.is_finished());
    }
}
