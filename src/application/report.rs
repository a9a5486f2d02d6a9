//! Folds every step of a revalidation run into one response.

use freshline_api_types::{CdnInvalidationReport, EdgePurgeReport, RevalidateResponse};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::info;

use crate::{
    cache::{LocalInvalidationReport, OriginExpiryReport},
    domain::{
        invalidation::{Backend, BackendOutcome, BackendResult},
        tags::Tag,
    },
};

use super::error::RevalidateError;

#[derive(Debug, Clone)]
pub struct AggregatedResponse {
    /// True once the local and origin steps ran, whatever the remotes did.
    pub revalidated: bool,
    pub tags: Vec<Tag>,
    pub local: LocalInvalidationReport,
    pub origin: OriginExpiryReport,
    pub edge: BackendResult,
    pub cdn: BackendResult,
    pub warnings: Vec<String>,
    pub timestamp: OffsetDateTime,
}

impl AggregatedResponse {
    pub fn into_body(self) -> Result<RevalidateResponse, RevalidateError> {
        let timestamp = self
            .timestamp
            .format(&Rfc3339)
            .map_err(|err| RevalidateError::unexpected(format!("timestamp formatting: {err}")))?;
        let warning = (!self.warnings.is_empty()).then(|| self.warnings.join("; "));

        Ok(RevalidateResponse {
            revalidated: self.revalidated,
            tags: self.tags.iter().map(|tag| tag.as_str().to_string()).collect(),
            edge: edge_report(&self.edge),
            cdn: cdn_report(&self.cdn),
            warnings: self.warnings,
            warning,
            timestamp,
        })
    }
}

/// Compose the step reports and emit the run's single summary log line.
pub fn aggregate(
    tags: Vec<Tag>,
    local: LocalInvalidationReport,
    origin: OriginExpiryReport,
    edge: BackendResult,
    cdn: BackendResult,
    timestamp: OffsetDateTime,
) -> AggregatedResponse {
    let mut warnings: Vec<String> = origin
        .failures()
        .map(|failure| {
            format!(
                "Tag `{}` revalidated but expiry bookkeeping failed: {}",
                failure.tag,
                failure.bookkeeping_error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect();

    if let Some((original, applied)) = cdn.truncation() {
        warnings.push(format!(
            "CDN invalidation truncated to {applied} of {original} paths"
        ));
    }

    for result in [&edge, &cdn] {
        if let BackendOutcome::Failed { message, .. } = &result.outcome {
            warnings.push(format!("{} failed: {message}", backend_label(result.backend)));
        }
    }

    let failed_tags: Vec<&str> = origin.failures().map(|f| f.tag.as_str()).collect();
    let tag_list: Vec<&str> = tags.iter().map(|tag| tag.as_str()).collect();
    info!(
        target = "freshline::revalidate",
        tags = ?tag_list,
        bookkeeping_failures = ?failed_tags,
        local_cleared = local.cleared.len(),
        local_failed = local.failed.len(),
        edge = edge.outcome.label(),
        edge_detail = %edge.detail(),
        cdn = cdn.outcome.label(),
        cdn_detail = %cdn.detail(),
        warnings = warnings.len(),
        "Revalidation complete"
    );

    AggregatedResponse {
        revalidated: true,
        tags,
        local,
        origin,
        edge,
        cdn,
        warnings,
        timestamp,
    }
}

fn backend_label(backend: Backend) -> &'static str {
    match backend {
        Backend::Edge => "Edge purge",
        Backend::Cdn => "CDN invalidation",
    }
}

fn failure_parts(result: &BackendResult) -> (Option<u16>, Option<String>) {
    match &result.outcome {
        BackendOutcome::Failed { status, message } => (*status, Some(message.clone())),
        _ => (None, None),
    }
}

fn edge_report(result: &BackendResult) -> EdgePurgeReport {
    let (status, error) = failure_parts(result);
    EdgePurgeReport {
        purged: result.is_success(),
        skipped: result.is_skipped(),
        prefixes: result.target_count(),
        status,
        error,
    }
}

fn cdn_report(result: &BackendResult) -> CdnInvalidationReport {
    let (status, error) = failure_parts(result);
    let invalidation_id = match &result.outcome {
        BackendOutcome::Success { remote_id } => remote_id.clone(),
        _ => None,
    };
    let job = result.job.as_ref();
    CdnInvalidationReport {
        invalidated: result.is_success(),
        skipped: result.is_skipped(),
        paths: result.target_count(),
        invalidation_id,
        caller_reference: job
            .and_then(|job| job.idempotency_token)
            .map(|token| token.to_string()),
        truncated: job.is_some_and(|job| job.truncated),
        original_count: job.and_then(|job| job.original_count),
        status,
        error,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::{
        cache::TagExpiry,
        domain::{
            invalidation::InvalidationJob,
            paths::PathSet,
            tags::CacheHandle,
        },
    };

    fn paths(count: usize) -> PathSet {
        (0..count).map(|i| format!("/p/{i}")).collect()
    }

    fn clean_origin(tags: &[Tag]) -> OriginExpiryReport {
        OriginExpiryReport {
            outcomes: tags
                .iter()
                .map(|tag| TagExpiry {
                    tag: *tag,
                    bookkeeping_error: None,
                })
                .collect(),
        }
    }

    fn local() -> LocalInvalidationReport {
        LocalInvalidationReport {
            cleared: vec![CacheHandle::PlaceDetails],
            ..Default::default()
        }
    }

    #[test]
    fn healthy_run_has_no_warnings() {
        let edge = BackendResult::success(InvalidationJob::new(Backend::Edge, paths(2)), None);
        let mut job = InvalidationJob::new(Backend::Cdn, paths(2));
        job.idempotency_token = Some(Uuid::nil());
        let cdn = BackendResult::success(job, Some("ID1".into()));

        let aggregated = aggregate(
            vec![Tag::Places],
            local(),
            clean_origin(&[Tag::Places]),
            edge,
            cdn,
            datetime!(2026-01-02 03:04:05 UTC),
        );
        assert!(aggregated.warnings.is_empty());

        let body = aggregated.into_body().expect("body");
        assert!(body.revalidated);
        assert_eq!(body.tags, vec!["places".to_string()]);
        assert!(body.edge.purged);
        assert_eq!(body.edge.prefixes, 2);
        assert!(body.cdn.invalidated);
        assert_eq!(body.cdn.invalidation_id.as_deref(), Some("ID1"));
        assert_eq!(body.cdn.caller_reference, Some(Uuid::nil().to_string()));
        assert_eq!(body.warning, None);
        assert_eq!(body.timestamp, "2026-01-02T03:04:05Z");
    }

    #[test]
    fn warnings_follow_bookkeeping_then_truncation_then_backends() {
        let origin = OriginExpiryReport {
            outcomes: vec![
                TagExpiry {
                    tag: Tag::Regions,
                    bookkeeping_error: Some("ledger down".into()),
                },
                TagExpiry {
                    tag: Tag::Cities,
                    bookkeeping_error: None,
                },
            ],
        };
        let edge = BackendResult::failed(
            InvalidationJob::new(Backend::Edge, paths(1)),
            Some(500),
            "edge purge returned HTTP 500",
        );
        let mut job = InvalidationJob::new(Backend::Cdn, paths(3));
        job.truncated = true;
        job.original_count = Some(5000);
        let cdn = BackendResult::failed(job, None, "cdn invalidation timed out after 10s");

        let aggregated = aggregate(
            vec![Tag::Regions, Tag::Cities],
            local(),
            origin,
            edge,
            cdn,
            OffsetDateTime::now_utc(),
        );

        assert_eq!(aggregated.warnings.len(), 4);
        assert!(aggregated.warnings[0].contains("regions"));
        assert!(aggregated.warnings[1].contains("3 of 5000"));
        assert!(aggregated.warnings[2].starts_with("Edge purge failed"));
        assert!(aggregated.warnings[3].starts_with("CDN invalidation failed"));
        assert!(aggregated.revalidated);

        let body = aggregated.into_body().expect("body");
        assert_eq!(body.warning.as_deref(), Some(body.warnings.join("; ").as_str()));
        assert_eq!(body.edge.status, Some(500));
        assert!(body.cdn.truncated);
        assert_eq!(body.cdn.original_count, Some(5000));
        assert!(!body.cdn.invalidated);
        assert!(body.cdn.error.is_some());
    }

    #[test]
    fn skipped_backends_add_no_warnings() {
        let aggregated = aggregate(
            vec![Tag::Sitemap],
            local(),
            clean_origin(&[Tag::Sitemap]),
            BackendResult::skipped(Backend::Edge, "not configured"),
            BackendResult::skipped(Backend::Cdn, "not configured"),
            OffsetDateTime::now_utc(),
        );
        assert!(aggregated.warnings.is_empty());

        let body = aggregated.into_body().expect("body");
        assert!(body.edge.skipped && !body.edge.purged);
        assert!(body.cdn.skipped && !body.cdn.invalidated);
        assert_eq!(body.edge.error, None);
        assert_eq!(body.cdn.caller_reference, None);
    }
}
