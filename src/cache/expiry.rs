//! Per-tag expiry of the origin cache with failure isolation.

use std::sync::Arc;

use tracing::warn;

use crate::domain::tags::Tag;

use super::origin::OriginTagCache;

/// Outcome for one tag. The tag counts as revalidated either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagExpiry {
    pub tag: Tag,
    pub bookkeeping_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginExpiryReport {
    pub outcomes: Vec<TagExpiry>,
}

impl OriginExpiryReport {
    pub fn failures(&self) -> impl Iterator<Item = &TagExpiry> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.bookkeeping_error.is_some())
    }

    pub fn applied(&self) -> impl Iterator<Item = Tag> + '_ {
        self.outcomes.iter().map(|outcome| outcome.tag)
    }
}

pub struct OriginTagInvalidator {
    cache: Arc<dyn OriginTagCache>,
}

impl OriginTagInvalidator {
    pub fn new(cache: Arc<dyn OriginTagCache>) -> Self {
        Self { cache }
    }

    /// Expire every tag independently; one failure never stops the loop.
    pub fn expire(&self, tags: &[Tag]) -> OriginExpiryReport {
        let outcomes = tags
            .iter()
            .map(|tag| match self.cache.expire_tag(*tag) {
                Ok(()) => TagExpiry {
                    tag: *tag,
                    bookkeeping_error: None,
                },
                Err(err) => {
                    warn!(
                        target = "freshline::cache::origin",
                        tag = tag.as_str(),
                        error = %err,
                        "Origin tag expiry bookkeeping failed; tag still counted as revalidated"
                    );
                    TagExpiry {
                        tag: *tag,
                        bookkeeping_error: Some(err.to_string()),
                    }
                }
            })
            .collect();

        OriginExpiryReport { outcomes }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::cache::origin::OriginCacheError;

    #[derive(Default)]
    struct FlakyOrigin {
        fail_on: Vec<Tag>,
        seen: Mutex<Vec<Tag>>,
    }

    impl OriginTagCache for FlakyOrigin {
        fn expire_tag(&self, tag: Tag) -> Result<(), OriginCacheError> {
            self.seen.lock().expect("seen lock").push(tag);
            if self.fail_on.contains(&tag) {
                return Err(OriginCacheError::Bookkeeping {
                    tag,
                    message: "ledger unavailable".into(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn failure_on_one_tag_does_not_skip_the_rest() {
        let origin = Arc::new(FlakyOrigin {
            fail_on: vec![Tag::Regions],
            ..Default::default()
        });
        let invalidator = OriginTagInvalidator::new(origin.clone());

        let report = invalidator.expire(&[Tag::Regions, Tag::Cities]);

        assert_eq!(
            *origin.seen.lock().expect("seen lock"),
            vec![Tag::Regions, Tag::Cities]
        );
        assert_eq!(report.applied().collect::<Vec<_>>(), vec![Tag::Regions, Tag::Cities]);
        let failures: Vec<_> = report.failures().map(|f| f.tag).collect();
        assert_eq!(failures, vec![Tag::Regions]);
    }

    #[test]
    fn clean_run_has_no_failures() {
        let invalidator = OriginTagInvalidator::new(Arc::new(FlakyOrigin::default()));
        let report = invalidator.expire(&[Tag::Places]);
        assert_eq!(report.failures().count(), 0);
    }
}
