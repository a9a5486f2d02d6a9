//! Local cache configuration.
//!
//! Controls the in-process cache domains and the origin response cache via
//! the `[local_cache]` section of `freshline.toml`.

use std::num::NonZeroUsize;

const DEFAULT_CAPACITY: usize = 256;
const DEFAULT_ORIGIN_CAPACITY: usize = 1024;

/// Local cache capacities resolved from the `[local_cache]` settings.
#[derive(Debug, Clone)]
pub struct LocalCacheConfig {
    /// Maximum entries held by each local cache domain.
    pub capacity: usize,
    /// Maximum responses held by the origin tagged response cache.
    pub origin_capacity: usize,
}

impl Default for LocalCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            origin_capacity: DEFAULT_ORIGIN_CAPACITY,
        }
    }
}

impl From<&crate::config::LocalCacheSettings> for LocalCacheConfig {
    fn from(settings: &crate::config::LocalCacheSettings) -> Self {
        Self {
            capacity: settings.capacity.get(),
            origin_capacity: settings.origin_capacity.get(),
        }
    }
}

impl LocalCacheConfig {
    /// Returns the per-domain capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the origin capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn origin_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.origin_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
