//! Origin tag-scoped response cache.
//!
//! The cache of record for rendered responses. Entries are keyed by request
//! path and indexed under every tag whose edge prefix covers the path, so a
//! tag expiry drops exactly the responses that tag owns.
//!
//! Expiring a tag has two steps: dropping the indexed entries, then writing an
//! expiry mark to the ledger. Only the second step can fail.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use bytes::Bytes;
use dashmap::DashMap;
use lru::LruCache;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::domain::tags::{Tag, TagRegistry};

use super::config::LocalCacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::origin";

#[derive(Debug, Error)]
pub enum OriginCacheError {
    #[error("failed to record expiry for `{tag}`: {message}")]
    Bookkeeping { tag: Tag, message: String },
}

/// Collaborator that expires the origin's logical cache for one tag.
pub trait OriginTagCache: Send + Sync {
    fn expire_tag(&self, tag: Tag) -> Result<(), OriginCacheError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Bidirectional tag ↔ path index.
#[derive(Default)]
struct TagIndex {
    tag_to_paths: HashMap<Tag, HashSet<String>>,
    path_to_tags: HashMap<String, Vec<Tag>>,
}

impl TagIndex {
    fn register(&mut self, path: &str, tags: &[Tag]) {
        for tag in tags {
            self.tag_to_paths
                .entry(*tag)
                .or_default()
                .insert(path.to_string());
        }
        self.path_to_tags.insert(path.to_string(), tags.to_vec());
    }

    fn unregister(&mut self, path: &str) {
        if let Some(tags) = self.path_to_tags.remove(path) {
            for tag in tags {
                if let Some(paths) = self.tag_to_paths.get_mut(&tag) {
                    paths.remove(path);
                    if paths.is_empty() {
                        self.tag_to_paths.remove(&tag);
                    }
                }
            }
        }
    }

    fn take_tag(&mut self, tag: Tag) -> HashSet<String> {
        let paths = self.tag_to_paths.remove(&tag).unwrap_or_default();
        for path in &paths {
            self.unregister(path);
        }
        paths
    }
}

pub struct TaggedResponseCache {
    registry: TagRegistry,
    responses: RwLock<LruCache<String, CachedResponse>>,
    index: RwLock<TagIndex>,
    expirations: DashMap<Tag, OffsetDateTime>,
}

impl TaggedResponseCache {
    pub fn new(registry: TagRegistry, config: &LocalCacheConfig) -> Self {
        Self {
            registry,
            responses: RwLock::new(LruCache::new(config.origin_capacity_non_zero())),
            index: RwLock::new(TagIndex::default()),
            expirations: DashMap::new(),
        }
    }

    pub fn get(&self, path: &str) -> Option<CachedResponse> {
        rw_write(&self.responses, SOURCE, "get").get(path).cloned()
    }

    /// Store a response and index it under the tags that own its path.
    ///
    /// Returns the tags the entry was indexed under.
    pub fn put(&self, path: &str, response: CachedResponse) -> Vec<Tag> {
        let tags = self.registry.tags_for_path(path);
        let evicted = rw_write(&self.responses, SOURCE, "put").push(path.to_string(), response);

        let mut index = rw_write(&self.index, SOURCE, "put.index");
        if let Some((evicted_path, _)) = evicted
            && evicted_path != path
        {
            index.unregister(&evicted_path);
        }
        index.unregister(path);
        index.register(path, &tags);
        tags
    }

    pub fn len(&self) -> usize {
        rw_read(&self.responses, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Paths currently indexed under `tag`.
    pub fn paths_for(&self, tag: Tag) -> HashSet<String> {
        rw_read(&self.index, SOURCE, "paths_for")
            .tag_to_paths
            .get(&tag)
            .cloned()
            .unwrap_or_default()
    }

    /// When `tag` was last expired, if ever.
    pub fn last_expired(&self, tag: Tag) -> Option<OffsetDateTime> {
        self.expirations.get(&tag).map(|entry| *entry.value())
    }

    fn drop_entries(&self, tag: Tag) -> usize {
        let paths = rw_write(&self.index, SOURCE, "expire.index").take_tag(tag);
        let mut responses = rw_write(&self.responses, SOURCE, "expire.responses");
        for path in &paths {
            responses.pop(path.as_str());
        }
        paths.len()
    }

    /// Expiry marks only move forward; a mark older than the current one is refused.
    fn record_expiry(&self, tag: Tag, at: OffsetDateTime) -> Result<(), OriginCacheError> {
        let mut entry = self.expirations.entry(tag).or_insert(at);
        if at < *entry {
            return Err(OriginCacheError::Bookkeeping {
                tag,
                message: format!("expiry mark {at} is older than recorded {}", *entry),
            });
        }
        *entry = at;
        Ok(())
    }

    fn expire_at(&self, tag: Tag, at: OffsetDateTime) -> Result<(), OriginCacheError> {
        let dropped = self.drop_entries(tag);
        debug!(
            target = "freshline::cache::origin",
            tag = tag.as_str(),
            dropped,
            "Expired origin tag"
        );
        self.record_expiry(tag, at)
    }
}

impl OriginTagCache for TaggedResponseCache {
    fn expire_tag(&self, tag: Tag) -> Result<(), OriginCacheError> {
        self.expire_at(tag, OffsetDateTime::now_utc())
    }
}
