//! Caching layer for derived ledger views
//!
//! Views (validation report + index) are keyed by snapshot identity and the
//! policy they were validated under, so a refresh that delivers an unchanged
//! chain reuses the work already done, while any change in content or policy
//! produces a new key and a fresh build.
use crate::blockchain::{SnapshotId, ValidationPolicy};
use crate::session::LedgerView;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

type ViewKey = (SnapshotId, ValidationPolicy);

/// Thread-safe LRU of built views. Clones share the same storage.
#[derive(Clone)]
pub struct ViewCache {
    cache: Arc<RwLock<LruCache<ViewKey, Arc<LedgerView>>>>,
}

impl ViewCache {
    pub const DEFAULT_CAPACITY: usize = 8;

    /// Create a cache holding up to `capacity` views (0 is treated as 1).
    pub fn new(capacity: usize) -> Self {
        let capacity_nz = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(RwLock::new(LruCache::new(capacity_nz))),
        }
    }

    /// Get the view built for `id` under `policy`. Uses the read lock and
    /// does not promote the entry.
    pub async fn get(&self, id: SnapshotId, policy: ValidationPolicy) -> Option<Arc<LedgerView>> {
        let cache = self.cache.read().await;
        cache.peek(&(id, policy)).cloned()
    }

    pub async fn put(&self, view: Arc<LedgerView>) {
        let mut cache = self.cache.write().await;
        cache.put((view.snapshot.id(), view.policy), view);
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
    }

    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }

    pub async fn is_empty(&self) -> bool {
        let cache = self.cache.read().await;
        cache.is_empty()
    }

    pub async fn capacity(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cap().get()
    }
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
