//! Closed tag enumeration and the static registry mapping each tag to the
//! caches it affects.
//!
//! The registry is the single source of truth for "what does this tag
//! touch": local cache handles, literal edge prefixes, and wildcard CDN
//! patterns. Downstream components never derive mappings on their own.

use std::fmt;

use super::paths::PathSet;

/// Version of the tag enumeration; bump whenever members change.
pub const TAG_SET_VERSION: u32 = 1;

/// Logical identifier for a class of cached content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    Places,
    Regions,
    Cities,
    Collections,
    Sitemap,
}

impl Tag {
    pub const ALL: [Tag; 5] = [
        Tag::Places,
        Tag::Regions,
        Tag::Cities,
        Tag::Collections,
        Tag::Sitemap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Places => "places",
            Tag::Regions => "regions",
            Tag::Cities => "cities",
            Tag::Collections => "collections",
            Tag::Sitemap => "sitemap",
        }
    }
}

impl TryFrom<&str> for Tag {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "places" => Ok(Tag::Places),
            "regions" => Ok(Tag::Regions),
            "cities" => Ok(Tag::Cities),
            "collections" => Ok(Tag::Collections),
            "sitemap" => Ok(Tag::Sitemap),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one in-process cache domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheHandle {
    PlaceDetails,
    Geography,
    Listings,
    Sitemap,
}

impl CacheHandle {
    pub const ALL: [CacheHandle; 4] = [
        CacheHandle::PlaceDetails,
        CacheHandle::Geography,
        CacheHandle::Listings,
        CacheHandle::Sitemap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CacheHandle::PlaceDetails => "place_details",
            CacheHandle::Geography => "geography",
            CacheHandle::Listings => "listings",
            CacheHandle::Sitemap => "sitemap",
        }
    }
}

impl fmt::Display for CacheHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct TagRoutes {
    handles: &'static [CacheHandle],
    prefixes: &'static [&'static str],
    patterns: &'static [&'static str],
}

const PLACES: TagRoutes = TagRoutes {
    handles: &[
        CacheHandle::PlaceDetails,
        CacheHandle::Listings,
        CacheHandle::Sitemap,
    ],
    prefixes: &["/places/", "/api/places"],
    patterns: &["/places/*", "/api/places*"],
};

const REGIONS: TagRoutes = TagRoutes {
    handles: &[CacheHandle::Geography, CacheHandle::Sitemap],
    prefixes: &["/regions/", "/api/regions"],
    patterns: &["/regions/*", "/api/regions*"],
};

const CITIES: TagRoutes = TagRoutes {
    handles: &[CacheHandle::Geography, CacheHandle::Sitemap],
    prefixes: &["/cities/", "/api/cities"],
    patterns: &["/cities/*", "/api/cities*"],
};

const COLLECTIONS: TagRoutes = TagRoutes {
    handles: &[CacheHandle::Listings],
    prefixes: &["/collections/"],
    patterns: &["/collections/*"],
};

const SITEMAP: TagRoutes = TagRoutes {
    handles: &[CacheHandle::Sitemap],
    prefixes: &["/sitemap"],
    patterns: &["/sitemap*", "/robots.txt"],
};

/// Immutable lookup from [`Tag`] to everything it invalidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagRegistry;

impl TagRegistry {
    pub const fn new() -> Self {
        Self
    }

    fn routes(tag: Tag) -> &'static TagRoutes {
        match tag {
            Tag::Places => &PLACES,
            Tag::Regions => &REGIONS,
            Tag::Cities => &CITIES,
            Tag::Collections => &COLLECTIONS,
            Tag::Sitemap => &SITEMAP,
        }
    }

    pub fn allowed_tags(&self) -> &'static [Tag] {
        &Tag::ALL
    }

    /// Comma-separated allowed tags, in declaration order.
    pub fn allowed_list(&self) -> String {
        Tag::ALL
            .iter()
            .map(|tag| tag.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn lookup(&self, raw: &str) -> Option<Tag> {
        Tag::try_from(raw).ok()
    }

    pub fn local_cache_handles_for(&self, tag: Tag) -> &'static [CacheHandle] {
        Self::routes(tag).handles
    }

    pub fn prefixes_for(&self, tag: Tag) -> &'static [&'static str] {
        Self::routes(tag).prefixes
    }

    pub fn patterns_for(&self, tag: Tag) -> &'static [&'static str] {
        Self::routes(tag).patterns
    }

    /// Union of literal edge prefixes for `tags`, in tag order.
    pub fn prefix_set(&self, tags: &[Tag]) -> PathSet {
        tags.iter()
            .flat_map(|tag| self.prefixes_for(*tag).iter().copied())
            .collect()
    }

    /// Union of CDN patterns for `tags`, in tag order.
    pub fn pattern_set(&self, tags: &[Tag]) -> PathSet {
        tags.iter()
            .flat_map(|tag| self.patterns_for(*tag).iter().copied())
            .collect()
    }

    /// Tags whose edge prefixes cover `path`.
    pub fn tags_for_path(&self, path: &str) -> Vec<Tag> {
        Tag::ALL
            .into_iter()
            .filter(|tag| {
                self.prefixes_for(*tag)
                    .iter()
                    .any(|prefix| path.starts_with(prefix))
            })
            .collect()
    }
}
