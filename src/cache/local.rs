//! In-process cache domains and the registry that owns them.
//!
//! The registry is built once at process start and handed to the
//! invalidation pipeline; nothing here is global state.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use lru::LruCache;
use thiserror::Error;

use crate::domain::tags::CacheHandle;

use super::config::LocalCacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::local";

#[derive(Debug, Error)]
pub enum LocalCacheError {
    #[error("failed to clear local cache: {0}")]
    Clear(String),
}

/// A cache domain that can be dropped wholesale.
///
/// Clearing must be safe to call concurrently and repeatedly; clearing an
/// empty cache is a no-op.
pub trait LocalCache: Send + Sync {
    fn clear(&self) -> Result<(), LocalCacheError>;
}

/// Bounded LRU memory cache keyed by string.
pub struct MemoryCache {
    entries: RwLock<LruCache<String, Bytes>>,
}

impl MemoryCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        rw_write(&self.entries, SOURCE, "get").get(key).cloned()
    }

    pub fn put(&self, key: impl Into<String>, value: Bytes) {
        rw_write(&self.entries, SOURCE, "put").put(key.into(), value);
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalCache for MemoryCache {
    fn clear(&self) -> Result<(), LocalCacheError> {
        rw_write(&self.entries, SOURCE, "clear").clear();
        Ok(())
    }
}

/// Process-lifetime set of local caches, addressed by [`CacheHandle`].
#[derive(Default)]
pub struct LocalCacheRegistry {
    caches: HashMap<CacheHandle, Arc<dyn LocalCache>>,
    memory: HashMap<CacheHandle, Arc<MemoryCache>>,
}

impl LocalCacheRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with one [`MemoryCache`] per known handle.
    pub fn with_memory_caches(config: &LocalCacheConfig) -> Self {
        let mut registry = Self::new();
        for handle in CacheHandle::ALL {
            let cache = Arc::new(MemoryCache::new(config.capacity_non_zero()));
            registry.memory.insert(handle, cache.clone());
            registry.caches.insert(handle, cache);
        }
        registry
    }

    /// Register (or replace) the cache behind `handle`.
    pub fn register(&mut self, handle: CacheHandle, cache: Arc<dyn LocalCache>) {
        self.memory.remove(&handle);
        self.caches.insert(handle, cache);
    }

    pub fn get(&self, handle: CacheHandle) -> Option<&Arc<dyn LocalCache>> {
        self.caches.get(&handle)
    }

    /// Typed access for callers that read and write the built-in memory caches.
    pub fn memory(&self, handle: CacheHandle) -> Option<&Arc<MemoryCache>> {
        self.memory.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}
