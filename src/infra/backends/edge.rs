//! Prefix purge against a Cloudflare-style edge cache API.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::{
    application::remote::RemoteInvalidator,
    config::{EdgeSettings, Secret},
    domain::{
        invalidation::{Backend, BackendResult, InvalidationJob},
        paths::PathSet,
    },
};

use super::{api_url, exchange, non_success_message};

const SKIP_REASON: &str = "edge api_token or zone_id not configured";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgePayload {
    pub prefixes: Vec<String>,
}

pub struct PrefixPurgeClient {
    http: Client,
    settings: EdgeSettings,
}

impl PrefixPurgeClient {
    pub fn new(http: Client, settings: EdgeSettings) -> Self {
        Self { http, settings }
    }

    /// Literal prefixes as sent on the wire, host-qualified when a host is set.
    pub fn payload(&self, prefixes: &PathSet) -> PurgePayload {
        let prefixes = prefixes
            .iter()
            .map(|prefix| match self.settings.host.as_deref() {
                Some(host) => format!("{host}{prefix}"),
                None => prefix.to_string(),
            })
            .collect();
        PurgePayload { prefixes }
    }

    pub fn purge_url(&self, zone_id: &str) -> Result<Url, url::ParseError> {
        api_url(&self.settings.base_url, &["zones", zone_id, "purge_cache"])
    }

    fn credentials(&self) -> Option<(&Secret, &str)> {
        Some((
            self.settings.api_token.as_ref()?,
            self.settings.zone_id.as_deref()?,
        ))
    }
}

#[async_trait]
impl RemoteInvalidator for PrefixPurgeClient {
    fn backend(&self) -> Backend {
        Backend::Edge
    }

    async fn invalidate(&self, targets: PathSet) -> BackendResult {
        let Some((token, zone_id)) = self.credentials() else {
            return BackendResult::skipped(Backend::Edge, SKIP_REASON);
        };

        let payload = self.payload(&targets);
        let job = InvalidationJob::new(Backend::Edge, targets);
        let url = match self.purge_url(zone_id) {
            Ok(url) => url,
            Err(err) => {
                return BackendResult::failed(job, None, format!("invalid purge url: {err}"));
            }
        };

        let started = Instant::now();
        let request = self
            .http
            .post(url)
            .bearer_auth(token.expose())
            .json(&payload);

        match exchange(request, self.settings.timeout).await {
            Ok(response) if response.status.is_success() => {
                info!(
                    target = "freshline::backend::edge",
                    prefixes = job.targets.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Edge prefix purge accepted"
                );
                BackendResult::success(job, None)
            }
            Ok(response) => {
                let message = non_success_message("edge purge", response.status, &response.body);
                warn!(
                    target = "freshline::backend::edge",
                    status = response.status.as_u16(),
                    error = %message,
                    "Edge prefix purge rejected"
                );
                BackendResult::failed(job, Some(response.status.as_u16()), message)
            }
            Err(err) => {
                warn!(
                    target = "freshline::backend::edge",
                    error = %err,
                    "Edge prefix purge failed"
                );
                BackendResult::failed(job, err.status(), format!("edge purge {err}"))
            }
        }
    }
}
