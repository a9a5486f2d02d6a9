//! Wildcard path invalidation against a CDN invalidation gateway.
//!
//! The provider caps paths per batch, so the normalized pattern set is
//! truncated in insertion order before sending. Each call carries a fresh
//! `callerReference` so identical batches are never merged remotely.

use std::time::Instant;

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    application::remote::RemoteInvalidator,
    config::CdnSettings,
    domain::{
        invalidation::{Backend, BackendResult, InvalidationJob},
        paths::PathSet,
    },
};

use super::{api_url, exchange, non_success_message};

const METRIC_CDN_TRUNCATED_TOTAL: &str = "freshline_cdn_truncated_total";
const SKIP_REASON: &str = "cdn endpoint or distribution_id not configured";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationBatch {
    pub caller_reference: String,
    pub paths: InvalidationPaths,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidationPaths {
    pub quantity: usize,
    pub items: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct InvalidationEnvelope {
    invalidation: Option<InvalidationInfo>,
}

#[derive(Debug, Deserialize)]
struct InvalidationInfo {
    id: Option<String>,
    status: Option<String>,
}

pub struct PatternInvalidationClient {
    http: Client,
    settings: CdnSettings,
}

impl PatternInvalidationClient {
    pub fn new(http: Client, settings: CdnSettings) -> Self {
        Self { http, settings }
    }

    /// Cap `targets` and attach a fresh caller reference.
    pub fn prepare(&self, targets: PathSet) -> InvalidationJob {
        let capped = targets.cap(self.settings.max_paths.get());
        InvalidationJob {
            backend: Backend::Cdn,
            targets: capped.applied,
            idempotency_token: Some(Uuid::new_v4()),
            truncated: capped.truncated,
            original_count: capped.original_count,
        }
    }

    pub fn batch(job: &InvalidationJob) -> InvalidationBatch {
        InvalidationBatch {
            caller_reference: job
                .idempotency_token
                .map(|token| token.to_string())
                .unwrap_or_default(),
            paths: InvalidationPaths {
                quantity: job.targets.len(),
                items: job.targets.to_vec(),
            },
        }
    }

    pub fn invalidation_url(endpoint: &Url, distribution_id: &str) -> Result<Url, url::ParseError> {
        api_url(endpoint, &["distributions", distribution_id, "invalidations"])
    }
}

#[async_trait]
impl RemoteInvalidator for PatternInvalidationClient {
    fn backend(&self) -> Backend {
        Backend::Cdn
    }

    async fn invalidate(&self, targets: PathSet) -> BackendResult {
        let (Some(endpoint), Some(distribution_id)) = (
            self.settings.endpoint.as_ref(),
            self.settings.distribution_id.as_deref(),
        ) else {
            return BackendResult::skipped(Backend::Cdn, SKIP_REASON);
        };

        let job = self.prepare(targets);
        if let Some((original, applied)) = job.original_count.map(|n| (n, job.targets.len())) {
            counter!(METRIC_CDN_TRUNCATED_TOTAL).increment(1);
            warn!(
                target = "freshline::backend::cdn",
                original,
                applied,
                "CDN path list exceeds provider cap; truncating"
            );
        }

        let url = match Self::invalidation_url(endpoint, distribution_id) {
            Ok(url) => url,
            Err(err) => {
                return BackendResult::failed(job, None, format!("invalid invalidation url: {err}"));
            }
        };

        let mut request = self.http.post(url).json(&Self::batch(&job));
        if let Some(token) = self.settings.api_token.as_ref() {
            request = request.bearer_auth(token.expose());
        }

        let started = Instant::now();
        match exchange(request, self.settings.timeout).await {
            Ok(response) if response.status.is_success() => {
                let info = serde_json::from_str::<InvalidationEnvelope>(&response.body)
                    .ok()
                    .and_then(|envelope| envelope.invalidation);
                let (remote_id, remote_status) = match info {
                    Some(info) => (info.id, info.status),
                    None => (None, None),
                };
                info!(
                    target = "freshline::backend::cdn",
                    paths = job.targets.len(),
                    invalidation_id = remote_id.as_deref().unwrap_or(""),
                    remote_status = remote_status.as_deref().unwrap_or(""),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "CDN invalidation accepted"
                );
                BackendResult::success(job, remote_id)
            }
            Ok(response) => {
                let message =
                    non_success_message("cdn invalidation", response.status, &response.body);
                warn!(
                    target = "freshline::backend::cdn",
                    status = response.status.as_u16(),
                    error = %message,
                    "CDN invalidation rejected"
                );
                BackendResult::failed(job, Some(response.status.as_u16()), message)
            }
            Err(err) => {
                warn!(
                    target = "freshline::backend::cdn",
                    error = %err,
                    "CDN invalidation failed"
                );
                BackendResult::failed(job, err.status(), format!("cdn invalidation {err}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{num::NonZeroUsize, time::Duration};

    use httpmock::MockServer;

    use super::*;
    use crate::{config::Secret, domain::invalidation::BackendOutcome};

    fn settings(endpoint: &str, max_paths: usize) -> CdnSettings {
        CdnSettings {
            endpoint: Some(Url::parse(endpoint).expect("endpoint")),
            distribution_id: Some("dist-1".into()),
            api_token: Some(Secret::new("cdn-token")),
            timeout: Duration::from_secs(2),
            max_paths: NonZeroUsize::new(max_paths).expect("non-zero"),
        }
    }

    fn many(count: usize) -> PathSet {
        (0..count).map(|i| format!("/places/{i}/*")).collect()
    }

    #[test]
    fn prepare_truncates_in_insertion_order() {
        let client = PatternInvalidationClient::new(Client::new(), settings("http://cdn.test", 3000));
        let job = client.prepare(many(5000));

        assert_eq!(job.targets.len(), 3000);
        assert!(job.truncated);
        assert_eq!(job.original_count, Some(5000));
        assert_eq!(job.targets.iter().next(), Some("/places/0/*"));
        assert!(job.targets.contains("/places/2999/*"));
        assert!(!job.targets.contains("/places/3000/*"));
    }

    #[test]
    fn prepare_under_cap_keeps_everything() {
        let client = PatternInvalidationClient::new(Client::new(), settings("http://cdn.test", 3000));
        let job = client.prepare(many(3000));
        assert_eq!(job.targets.len(), 3000);
        assert!(!job.truncated);
        assert_eq!(job.original_count, None);
    }

    #[test]
    fn every_call_gets_a_fresh_caller_reference() {
        let client = PatternInvalidationClient::new(Client::new(), settings("http://cdn.test", 10));
        let first = client.prepare(many(2));
        let second = client.prepare(many(2));
        assert!(first.idempotency_token.is_some());
        assert_ne!(first.idempotency_token, second.idempotency_token);
    }

    #[test]
    fn batch_serializes_provider_shape() {
        let client = PatternInvalidationClient::new(Client::new(), settings("http://cdn.test", 10));
        let job = client.prepare(["/sitemap*", "/robots.txt"].into_iter().collect());
        let value = serde_json::to_value(PatternInvalidationClient::batch(&job)).expect("json");

        assert_eq!(
            value["callerReference"],
            serde_json::json!(job.idempotency_token.expect("token").to_string())
        );
        assert_eq!(value["paths"]["quantity"], 2);
        assert_eq!(value["paths"]["items"], serde_json::json!(["/sitemap*", "/robots.txt"]));
    }

    #[test]
    fn invalidation_url_keeps_distribution_id_in_one_segment() {
        let endpoint = Url::parse("https://cdn.test/api/").expect("endpoint");
        assert_eq!(
            PatternInvalidationClient::invalidation_url(&endpoint, "dist-1")
                .expect("url")
                .as_str(),
            "https://cdn.test/api/distributions/dist-1/invalidations"
        );
        assert_eq!(
            PatternInvalidationClient::invalidation_url(&endpoint, "d/x?y#z")
                .expect("url")
                .as_str(),
            "https://cdn.test/api/distributions/d%2Fx%3Fy%23z/invalidations"
        );
    }

    #[tokio::test]
    async fn unconfigured_distribution_is_skipped() {
        let mut cdn = settings("http://cdn.test", 10);
        cdn.distribution_id = None;
        let result = PatternInvalidationClient::new(Client::new(), cdn)
            .invalidate(many(1))
            .await;
        assert!(result.is_skipped());
        assert!(!result.is_failed());
    }

    #[tokio::test]
    async fn success_returns_remote_job_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/distributions/dist-1/invalidations")
                .header("authorization", "Bearer cdn-token");
            then.status(201)
                .header("content-type", "application/json")
                .body(r#"{"invalidation":{"id":"I2J0Q8","status":"InProgress"}}"#);
        });

        let result = PatternInvalidationClient::new(Client::new(), settings(&server.base_url(), 10))
            .invalidate(many(3))
            .await;

        mock.assert();
        assert_eq!(
            result.outcome,
            BackendOutcome::Success {
                remote_id: Some("I2J0Q8".into())
            }
        );
    }

    #[tokio::test]
    async fn unparseable_success_body_still_succeeds() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/distributions/dist-1/invalidations");
            then.status(200).body("ok");
        });

        let result = PatternInvalidationClient::new(Client::new(), settings(&server.base_url(), 10))
            .invalidate(many(1))
            .await;

        assert_eq!(result.outcome, BackendOutcome::Success { remote_id: None });
    }

    #[tokio::test]
    async fn truncated_batch_is_sent_and_reported() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST").path("/distributions/dist-1/invalidations");
            then.status(201).body(r#"{"invalidation":{"id":"T1"}}"#);
        });

        let result = PatternInvalidationClient::new(Client::new(), settings(&server.base_url(), 3000))
            .invalidate(many(5000))
            .await;

        mock.assert();
        assert!(result.is_success());
        assert_eq!(result.truncation(), Some((5000, 3000)));
    }

    #[tokio::test]
    async fn server_error_is_failed_with_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/distributions/dist-1/invalidations");
            then.status(503).body("throttled");
        });

        let result = PatternInvalidationClient::new(Client::new(), settings(&server.base_url(), 10))
            .invalidate(many(1))
            .await;

        match result.outcome {
            BackendOutcome::Failed { status, message } => {
                assert_eq!(status, Some(503));
                assert!(message.contains("throttled"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
