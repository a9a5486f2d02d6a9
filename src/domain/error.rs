use thiserror::Error;

/// Reasons an inbound revalidation body is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("`tags` is missing")]
    MissingTags,
    #[error("`tags` must be an array")]
    NotAnArray,
    #[error("`tags` must not be empty")]
    Empty,
    #[error("tag at index {index} is not a string")]
    NotAString { index: usize },
    #[error("tag `{tag}` is not allowed")]
    UnknownTag { tag: String },
}

impl ValidationError {
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::InvalidJson(message.into())
    }

    pub fn unknown_tag(tag: impl Into<String>) -> Self {
        Self::UnknownTag { tag: tag.into() }
    }

    pub fn is_json_error(&self) -> bool {
        matches!(self, ValidationError::InvalidJson(_))
    }
}
