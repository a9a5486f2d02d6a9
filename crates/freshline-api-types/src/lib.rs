//! Wire types for the freshline revalidation endpoint.
//!
//! Shared by the server and `freshline_cli` so both sides agree on field
//! names without duplicating serde attributes.

use serde::{Deserialize, Serialize};

/// Header carrying the shared revalidation secret.
pub const SECRET_HEADER: &str = "x-revalidate-secret";

/// Route accepting revalidation requests.
pub const REVALIDATE_PATH: &str = "/revalidate";

/// Body of `POST /revalidate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevalidateRequest {
    pub tags: Vec<String>,
}

/// Successful revalidation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub tags: Vec<String>,
    pub edge: EdgePurgeReport,
    pub cdn: CdnInvalidationReport,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub timestamp: String,
}

/// Outcome of the prefix purge against the edge cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgePurgeReport {
    pub purged: bool,
    pub skipped: bool,
    pub prefixes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of the wildcard invalidation against the CDN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdnInvalidationReport {
    pub invalidated: bool,
    pub skipped: bool,
    pub paths: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_reference: Option<String>,
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body returned for every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
