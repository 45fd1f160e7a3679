use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::{PostRecord, PostStore};
use crate::Result;

/// Vector-backed [`PostStore`].
#[derive(Debug, Default)]
pub struct InMemoryPostStore {
    posts: RwLock<Vec<PostRecord>>,
}

impl InMemoryPostStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `posts`.
    pub fn with_posts(mut posts: Vec<PostRecord>) -> Self {
        sort_posts(&mut posts);
        Self {
            posts: RwLock::new(posts),
        }
    }

    /// Add a post.
    pub fn push(&self, post: PostRecord) {
        let mut posts = self.posts.write().unwrap_or_else(PoisonError::into_inner);
        posts.push(post);
        sort_posts(&mut posts);
    }

    /// Number of stored posts.
    pub fn len(&self) -> usize {
        self.posts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sort_posts(posts: &mut [PostRecord]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn count_posts(&self) -> Result<u64> {
        Ok(self.len() as u64)
    }

    async fn fetch_posts(&self, offset: u64, limit: u32) -> Result<Vec<PostRecord>> {
        let posts = self.posts.read().unwrap_or_else(PoisonError::into_inner);
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(posts
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
