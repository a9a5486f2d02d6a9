use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use freshline_api_types::ErrorBody;
use thiserror::Error;

use crate::{
    config::LoadError,
    domain::{error::ValidationError, tags::TagRegistry},
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Terminal failures of a revalidation request. Everything else degrades to warnings.
#[derive(Debug, Error)]
pub enum RevalidateError {
    #[error("missing or incorrect shared secret")]
    Unauthorized,
    #[error("invalid request body")]
    InvalidJson(#[source] ValidationError),
    #[error("invalid tag set")]
    InvalidTags(#[source] ValidationError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl RevalidateError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RevalidateError::Unauthorized => StatusCode::UNAUTHORIZED,
            RevalidateError::InvalidJson(_) | RevalidateError::InvalidTags(_) => {
                StatusCode::BAD_REQUEST
            }
            RevalidateError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metric label for `freshline_revalidate_requests_total`.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            RevalidateError::Unauthorized => "unauthorized",
            RevalidateError::InvalidJson(_) | RevalidateError::InvalidTags(_) => "invalid",
            RevalidateError::Unexpected(_) => "error",
        }
    }

    fn public_message(&self) -> String {
        match self {
            RevalidateError::Unauthorized => "Unauthorized".to_string(),
            RevalidateError::InvalidJson(_) => "Invalid JSON body".to_string(),
            RevalidateError::InvalidTags(_) => format!(
                "Invalid or missing tags. Allowed tags: {}",
                TagRegistry::new().allowed_list()
            ),
            RevalidateError::Unexpected(_) => "Internal server error".to_string(),
        }
    }
}

impl From<ValidationError> for RevalidateError {
    fn from(error: ValidationError) -> Self {
        if error.is_json_error() {
            Self::InvalidJson(error)
        } else {
            Self::InvalidTags(error)
        }
    }
}

impl IntoResponse for RevalidateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody::new(self.public_message());
        let report =
            ErrorReport::from_error("application::error::RevalidateError", status, &self);
        let mut response = (status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}

/// Process-level failures surfaced by the binaries.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
