use indexmap::IndexSet;
use serde_json::Value;

use crate::domain::{
    error::ValidationError,
    tags::{Tag, TagRegistry},
};

/// Validates revalidation bodies against the registry's closed tag set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagSetValidator {
    registry: TagRegistry,
}

impl TagSetValidator {
    pub fn new(registry: TagRegistry) -> Self {
        Self { registry }
    }

    /// Parse raw body bytes, then validate.
    pub fn parse_body(&self, body: &[u8]) -> Result<Vec<Tag>, ValidationError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|err| ValidationError::invalid_json(err.to_string()))?;
        self.validate(&value)
    }

    /// Validate a parsed body of the shape `{"tags": [...]}`.
    ///
    /// Returns the tags de-duplicated in first-seen order. Any bad element
    /// rejects the whole body.
    pub fn validate(&self, body: &Value) -> Result<Vec<Tag>, ValidationError> {
        let raw = body.get("tags").ok_or(ValidationError::MissingTags)?;
        let items = raw.as_array().ok_or(ValidationError::NotAnArray)?;
        if items.is_empty() {
            return Err(ValidationError::Empty);
        }

        let mut tags = IndexSet::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let name = item
                .as_str()
                .ok_or(ValidationError::NotAString { index })?;
            let tag = self
                .registry
                .lookup(name)
                .ok_or_else(|| ValidationError::unknown_tag(name))?;
            tags.insert(tag);
        }

        Ok(tags.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn validator() -> TagSetValidator {
        TagSetValidator::default()
    }

    #[test]
    fn accepts_every_non_empty_subset_of_the_registry() {
        let all = Tag::ALL;
        for mask in 1u32..(1 << all.len()) {
            let subset: Vec<Tag> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, tag)| *tag)
                .collect();
            let names: Vec<&str> = subset.iter().map(|tag| tag.as_str()).collect();
            let parsed = validator()
                .validate(&json!({ "tags": names }))
                .expect("subset accepted");
            assert_eq!(parsed, subset);
        }
    }

    #[test]
    fn rejects_strings_outside_the_registry() {
        for bad in ["events", "Places", " places", "", "place", "sitemap.xml"] {
            let err = validator()
                .validate(&json!({ "tags": ["places", bad] }))
                .expect_err("unknown tag rejected");
            assert_eq!(err, ValidationError::unknown_tag(bad));
        }
    }

    #[test]
    fn rejects_malformed_shapes() {
        let v = validator();
        assert_eq!(v.validate(&json!({})), Err(ValidationError::MissingTags));
        assert_eq!(v.validate(&json!([])), Err(ValidationError::MissingTags));
        assert_eq!(
            v.validate(&json!({ "tags": "places" })),
            Err(ValidationError::NotAnArray)
        );
        assert_eq!(v.validate(&json!({ "tags": [] })), Err(ValidationError::Empty));
        assert_eq!(
            v.validate(&json!({ "tags": ["places", 3] })),
            Err(ValidationError::NotAString { index: 1 })
        );
    }

    #[test]
    fn duplicates_collapse_in_first_seen_order() {
        let parsed = validator()
            .validate(&json!({ "tags": ["cities", "places", "cities"] }))
            .expect("valid");
        assert_eq!(parsed, vec![Tag::Cities, Tag::Places]);
    }

    #[test]
    fn parse_body_reports_json_errors() {
        let err = validator().parse_body(b"{\"tags\": [").expect_err("bad json");
        assert!(err.is_json_error());

        let err = validator().parse_body(b"").expect_err("empty body");
        assert!(err.is_json_error());

        let tags = validator()
            .parse_body(br#"{"tags":["sitemap"]}"#)
            .expect("valid");
        assert_eq!(tags, vec![Tag::Sitemap]);
    }
}
