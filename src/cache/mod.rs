//! Freshline cache layers owned by this process.
//!
//! - **Local caches**: per-domain in-memory caches, cleared wholesale by handle
//! - **Origin cache**: the tag-scoped response cache of record
//!
//! ## Configuration
//!
//! Capacities are controlled via `freshline.toml`:
//!
//! ```toml
//! [local_cache]
//! capacity = 256
//! origin_capacity = 1024
//! ```

mod config;
mod expiry;
mod invalidator;
mod local;
mod lock;
mod origin;

pub use config::LocalCacheConfig;
pub use expiry::{OriginExpiryReport, OriginTagInvalidator, TagExpiry};
pub use invalidator::{LocalCacheInvalidator, LocalInvalidationReport};
pub use local::{LocalCache, LocalCacheError, LocalCacheRegistry, MemoryCache};
pub use origin::{CachedResponse, OriginCacheError, OriginTagCache, TaggedResponseCache};
