//! Drops local cache domains affected by a set of changed tags.

use std::sync::Arc;

use indexmap::IndexSet;
use metrics::counter;
use tracing::{debug, warn};

use crate::domain::tags::{CacheHandle, Tag, TagRegistry};

use super::local::LocalCacheRegistry;

const METRIC_LOCAL_CLEAR_TOTAL: &str = "freshline_local_cache_clear_total";

/// What happened to each distinct handle during one invalidation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalInvalidationReport {
    pub cleared: Vec<CacheHandle>,
    pub failed: Vec<(CacheHandle, String)>,
    pub unregistered: Vec<CacheHandle>,
}

impl LocalInvalidationReport {
    pub fn attempted(&self) -> usize {
        self.cleared.len() + self.failed.len() + self.unregistered.len()
    }
}

/// Clears every distinct local cache reached from the request's tags, once.
pub struct LocalCacheInvalidator {
    registry: TagRegistry,
    caches: Arc<LocalCacheRegistry>,
}

impl LocalCacheInvalidator {
    pub fn new(registry: TagRegistry, caches: Arc<LocalCacheRegistry>) -> Self {
        Self { registry, caches }
    }

    /// Distinct handles reached by `tags`, in first-seen order.
    pub fn handles_for(&self, tags: &[Tag]) -> IndexSet<CacheHandle> {
        tags.iter()
            .flat_map(|tag| self.registry.local_cache_handles_for(*tag).iter().copied())
            .collect()
    }

    /// Clear affected caches. Failures are logged and reported, never propagated.
    pub fn invalidate(&self, tags: &[Tag]) -> LocalInvalidationReport {
        let mut report = LocalInvalidationReport::default();

        for handle in self.handles_for(tags) {
            let Some(cache) = self.caches.get(handle) else {
                warn!(
                    target = "freshline::cache::local",
                    handle = handle.as_str(),
                    "No local cache registered for handle"
                );
                counter!(METRIC_LOCAL_CLEAR_TOTAL, "handle" => handle.as_str(), "result" => "unregistered")
                    .increment(1);
                report.unregistered.push(handle);
                continue;
            };

            match cache.clear() {
                Ok(()) => {
                    debug!(
                        target = "freshline::cache::local",
                        handle = handle.as_str(),
                        "Cleared local cache"
                    );
                    counter!(METRIC_LOCAL_CLEAR_TOTAL, "handle" => handle.as_str(), "result" => "cleared")
                        .increment(1);
                    report.cleared.push(handle);
                }
                Err(err) => {
                    warn!(
                        target = "freshline::cache::local",
                        handle = handle.as_str(),
                        error = %err,
                        "Local cache clear failed; continuing"
                    );
                    counter!(METRIC_LOCAL_CLEAR_TOTAL, "handle" => handle.as_str(), "result" => "failed")
                        .increment(1);
                    report.failed.push((handle, err.to_string()));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::local::{LocalCache, LocalCacheError};

    #[derive(Default)]
    struct CountingCache {
        clears: AtomicUsize,
    }

    impl LocalCache for CountingCache {
        fn clear(&self) -> Result<(), LocalCacheError> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct BrokenCache;

    impl LocalCache for BrokenCache {
        fn clear(&self) -> Result<(), LocalCacheError> {
            Err(LocalCacheError::Clear("backing map unavailable".into()))
        }
    }

    fn counting_registry() -> (LocalCacheRegistry, Vec<(CacheHandle, Arc<CountingCache>)>) {
        let mut registry = LocalCacheRegistry::new();
        let mut counters = Vec::new();
        for handle in CacheHandle::ALL {
            let cache = Arc::new(CountingCache::default());
            registry.register(handle, cache.clone());
            counters.push((handle, cache));
        }
        (registry, counters)
    }

    fn clears_for(counters: &[(CacheHandle, Arc<CountingCache>)], handle: CacheHandle) -> usize {
        counters
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, cache)| cache.clears.load(Ordering::SeqCst))
            .unwrap_or_default()
    }

    #[test]
    fn shared_handle_is_cleared_once() {
        let (registry, counters) = counting_registry();
        let invalidator = LocalCacheInvalidator::new(TagRegistry::new(), Arc::new(registry));

        let report = invalidator.invalidate(&[Tag::Regions, Tag::Cities]);

        assert_eq!(clears_for(&counters, CacheHandle::Geography), 1);
        assert_eq!(clears_for(&counters, CacheHandle::Sitemap), 1);
        assert_eq!(clears_for(&counters, CacheHandle::PlaceDetails), 0);
        assert_eq!(report.cleared, vec![CacheHandle::Geography, CacheHandle::Sitemap]);
    }

    #[test]
    fn broken_cache_does_not_stop_the_run() {
        let (mut registry, counters) = counting_registry();
        registry.register(CacheHandle::PlaceDetails, Arc::new(BrokenCache));
        let invalidator = LocalCacheInvalidator::new(TagRegistry::new(), Arc::new(registry));

        let report = invalidator.invalidate(&[Tag::Places]);

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, CacheHandle::PlaceDetails);
        assert_eq!(clears_for(&counters, CacheHandle::Listings), 1);
        assert_eq!(clears_for(&counters, CacheHandle::Sitemap), 1);
    }

    #[test]
    fn missing_handle_is_reported() {
        let invalidator =
            LocalCacheInvalidator::new(TagRegistry::new(), Arc::new(LocalCacheRegistry::new()));
        let report = invalidator.invalidate(&[Tag::Collections]);
        assert_eq!(report.unregistered, vec![CacheHandle::Listings]);
        assert_eq!(report.attempted(), 1);
    }
}
