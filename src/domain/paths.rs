//! Normalized, insertion-ordered sets of purge targets.

use indexmap::IndexSet;

/// Deduplicated set of literal prefixes or wildcard patterns.
///
/// Every entry is trimmed, non-empty and starts with `/`. Insertion order is
/// preserved so truncation always keeps the same entries for the same input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSet {
    entries: IndexSet<String>,
}

/// Result of applying a hard size cap to a [`PathSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CappedPaths {
    pub applied: PathSet,
    pub truncated: bool,
    /// Size before truncation; only set when `truncated` is true.
    pub original_count: Option<usize>,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize and insert `raw`; returns false for blanks and duplicates.
    pub fn insert(&mut self, raw: &str) -> bool {
        match normalize_path(raw) {
            Some(path) => self.entries.insert(path),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    /// Keep at most `cap` entries in insertion order.
    pub fn cap(self, cap: usize) -> CappedPaths {
        let original = self.entries.len();
        if original <= cap {
            return CappedPaths {
                applied: self,
                truncated: false,
                original_count: None,
            };
        }

        let entries = self.entries.into_iter().take(cap).collect();
        CappedPaths {
            applied: Self { entries },
            truncated: true,
            original_count: Some(original),
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for PathSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = PathSet::new();
        for raw in iter {
            set.insert(raw.as_ref());
        }
        set
    }
}

impl<'a> IntoIterator for &'a PathSet {
    type Item = &'a String;
    type IntoIter = indexmap::set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn normalize_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{trimmed}"))
    }
}
