//! Data sources for post-derived sitemap entries.
//!
//! States, categories and static pages come from [`crate::reference`]; posts
//! come from a [`PostStore`]. Two stores ship with the crate:
//!
//! - [`InMemoryPostStore`]: vector-backed, for embedding and tests
//! - [`RestPostStore`]: queries the hosted backend's PostgREST API

mod memory;
mod rest;

pub use memory::InMemoryPostStore;
pub use rest::{RestPostStore, RestStoreConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// A published listing as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Listing id (numeric ids are carried as their decimal text).
    pub id: String,
    /// Creation timestamp, used as `lastmod`.
    pub created_at: DateTime<Utc>,
    /// State the listing was posted in.
    pub state: Option<String>,
    /// Category the listing was posted under.
    pub category: Option<String>,
}

impl PostRecord {
    /// Convenience constructor.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
            state: None,
            category: None,
        }
    }
}

/// Read-only, paginated access to eligible (published, non-deleted) posts.
///
/// Pages are ordered newest first, ties broken by id, so consecutive pages
/// never overlap.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Number of eligible posts.
    async fn count_posts(&self) -> Result<u64>;

    /// Up to `limit` posts starting at `offset`.
    async fn fetch_posts(&self, offset: u64, limit: u32) -> Result<Vec<PostRecord>>;
}
