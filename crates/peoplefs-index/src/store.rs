//! Published snapshot holder.

use peoplefs_core::TagIndex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

struct Published {
    snapshot: Arc<TagIndex>,
    generation: u64,
}

/// Holds the currently published [`TagIndex`] and swaps it atomically.
///
/// Readers get an `Arc` handle and keep using it for as long as they need,
/// even after a newer snapshot is published. The write lock is only held for
/// the pointer swap; builds run outside of it.
pub struct IndexStore {
    inner: RwLock<Published>,
}

impl IndexStore {
    /// Create a store serving an empty snapshot over `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: RwLock::new(Published {
                snapshot: Arc::new(TagIndex::empty(root)),
                generation: 0,
            }),
        }
    }

    /// The current snapshot.
    pub async fn snapshot(&self) -> Arc<TagIndex> {
        Arc::clone(&self.inner.read().await.snapshot)
    }

    /// Install `index` as the current snapshot and return the previous one.
    pub async fn publish(&self, index: TagIndex) -> Arc<TagIndex> {
        let next = Arc::new(index);
        let mut inner = self.inner.write().await;
        inner.generation += 1;
        debug!("Publishing snapshot generation {}", inner.generation);
        std::mem::replace(&mut inner.snapshot, next)
    }

    /// Number of snapshots published so far.
    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }

    /// Whether at least one build has been published.
    pub async fn is_populated(&self) -> bool {
        self.generation().await > 0
    }
}
