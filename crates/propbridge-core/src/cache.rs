//! Per-connection metadata cache.
//!
//! Category descriptors and object definitions rarely change during an edit
//! session, so they are fetched once per `(base URL, repository)` and kept
//! in a [`MetadataCache`] owned by whoever drives the session. There is no
//! process-wide instance; dropping the owner drops the cache.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use crate::id_map::IdMap;
use crate::model::PropertyDescriptor;

// ---------------------------------------------------------------------------
// CacheKey
// ---------------------------------------------------------------------------

/// `(base URL, repository id)`, both trimmed. The base loses trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub base: String,
    pub repo_id: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(base: &str, repo_id: &str) -> Self {
        Self {
            base: base.trim().trim_end_matches('/').to_string(),
            repo_id: repo_id.trim().to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.base, self.repo_id)
    }
}

/// What one repository's metadata fetch produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryMetadata {
    pub descriptors: Vec<PropertyDescriptor>,
    pub id_map: IdMap,
}

// ---------------------------------------------------------------------------
// MetadataCache
// ---------------------------------------------------------------------------

/// Explicitly owned cache of fetched metadata keyed by [`CacheKey`].
#[derive(Debug, Clone)]
pub struct MetadataCache<V> {
    entries: HashMap<CacheKey, V>,
}

impl<V> Default for MetadataCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> MetadataCache<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&V> {
        let hit = self.entries.get(key);
        trace!(key = %key, hit = hit.is_some(), "metadata cache lookup");
        hit
    }

    /// Store `value`, returning whatever was cached before.
    pub fn insert(&mut self, key: CacheKey, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    /// Cached value, or the result of `fetch` stored under `key`.
    ///
    /// A failed fetch caches nothing, so the next call retries.
    ///
    /// # Errors
    ///
    /// Whatever `fetch` returns.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: CacheKey,
        fetch: impl FnOnce() -> Result<V, E>,
    ) -> Result<&V, E> {
        use std::collections::hash_map::Entry;
        match self.entries.entry(key) {
            Entry::Occupied(slot) => {
                debug!(key = %slot.key(), "metadata cache hit");
                Ok(slot.into_mut())
            }
            Entry::Vacant(slot) => {
                debug!(key = %slot.key(), "metadata cache miss");
                let value = fetch()?;
                Ok(slot.insert(value))
            }
        }
    }

    /// Forget one repository's metadata.
    pub fn invalidate(&mut self, key: &CacheKey) -> Option<V> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            debug!(key = %key, "metadata cache entry invalidated");
        }
        removed
    }

    pub fn clear(&mut self) {
        debug!(entries = self.entries.len(), "metadata cache cleared");
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
