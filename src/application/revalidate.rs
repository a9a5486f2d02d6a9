//! The revalidation pipeline.
//!
//! Authenticate, validate, clear local caches, expire origin tags, then fan
//! out to the remote backends concurrently and aggregate. Only the first two
//! steps can end the request early.

use std::{sync::Arc, time::Instant};

use metrics::{counter, histogram};
use time::OffsetDateTime;

use crate::{
    cache::{LocalCacheInvalidator, OriginTagInvalidator},
    domain::{
        error::ValidationError,
        invalidation::BackendResult,
        paths::PathSet,
        tags::TagRegistry,
    },
};

use super::{
    auth::{AuditContext, SecretAuthenticator},
    error::RevalidateError,
    remote::RemoteInvalidator,
    report::{AggregatedResponse, aggregate},
    validation::TagSetValidator,
};

const METRIC_REQUESTS_TOTAL: &str = "freshline_revalidate_requests_total";
const METRIC_BACKEND_OUTCOME_TOTAL: &str = "freshline_backend_outcome_total";
const METRIC_BACKEND_LATENCY_MS: &str = "freshline_backend_latency_ms";

/// One inbound call as seen by the pipeline.
#[derive(Debug, Clone)]
pub struct RevalidateCommand<'a> {
    pub secret: Option<&'a str>,
    pub body: &'a [u8],
    pub audit: AuditContext<'a>,
}

pub struct RevalidationService {
    registry: TagRegistry,
    authenticator: SecretAuthenticator,
    validator: TagSetValidator,
    local: LocalCacheInvalidator,
    origin: OriginTagInvalidator,
    edge: Arc<dyn RemoteInvalidator>,
    cdn: Arc<dyn RemoteInvalidator>,
}

impl RevalidationService {
    pub fn new(
        registry: TagRegistry,
        authenticator: SecretAuthenticator,
        local: LocalCacheInvalidator,
        origin: OriginTagInvalidator,
        edge: Arc<dyn RemoteInvalidator>,
        cdn: Arc<dyn RemoteInvalidator>,
    ) -> Self {
        Self {
            registry,
            authenticator,
            validator: TagSetValidator::new(registry),
            local,
            origin,
            edge,
            cdn,
        }
    }

    pub async fn revalidate(
        &self,
        command: RevalidateCommand<'_>,
    ) -> Result<AggregatedResponse, RevalidateError> {
        let result = self.run(command).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(err) => err.outcome_label(),
        };
        counter!(METRIC_REQUESTS_TOTAL, "outcome" => outcome).increment(1);
        result
    }

    /// Resolve a request whose body could not be read; authentication still runs first.
    pub fn reject_unreadable(
        &self,
        secret: Option<&str>,
        audit: AuditContext<'_>,
        reason: String,
    ) -> RevalidateError {
        let err = if self.authenticator.check(secret, audit) {
            RevalidateError::from(ValidationError::invalid_json(reason))
        } else {
            RevalidateError::Unauthorized
        };
        counter!(METRIC_REQUESTS_TOTAL, "outcome" => err.outcome_label()).increment(1);
        err
    }

    async fn run(
        &self,
        command: RevalidateCommand<'_>,
    ) -> Result<AggregatedResponse, RevalidateError> {
        if !self.authenticator.check(command.secret, command.audit) {
            return Err(RevalidateError::Unauthorized);
        }

        let tags = self.validator.parse_body(command.body)?;

        // Local and origin steps finish before any network call starts.
        let local = self.local.invalidate(&tags);
        let origin = self.origin.expire(&tags);

        let prefixes = self.registry.prefix_set(&tags);
        let patterns = self.registry.pattern_set(&tags);
        let (edge, cdn) = tokio::join!(
            observe(self.edge.as_ref(), prefixes),
            observe(self.cdn.as_ref(), patterns),
        );

        Ok(aggregate(
            tags,
            local,
            origin,
            edge,
            cdn,
            OffsetDateTime::now_utc(),
        ))
    }
}

async fn observe(remote: &dyn RemoteInvalidator, targets: PathSet) -> BackendResult {
    let backend = remote.backend().as_str();
    let started = Instant::now();
    let result = remote.invalidate(targets).await;

    histogram!(METRIC_BACKEND_LATENCY_MS, "backend" => backend)
        .record(started.elapsed().as_secs_f64() * 1000.0);
    counter!(
        METRIC_BACKEND_OUTCOME_TOTAL,
        "backend" => backend,
        "outcome" => result.outcome.label()
    )
    .increment(1);
    result
}
