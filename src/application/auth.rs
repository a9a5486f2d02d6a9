//! Shared-secret authentication for the revalidation endpoint.
//!
//! Both sides are hashed to fixed-length digests before a constant-time
//! compare, so neither the secret's length nor its prefix leaks through
//! response timing. Rejections feed a sampled audit log.

use std::{net::SocketAddr, sync::Arc};

use axum::http::HeaderMap;
use metrics::counter;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::config::Secret;

const METRIC_AUTH_REJECTED_TOTAL: &str = "freshline_auth_rejected_total";
const UNKNOWN_CALLER: &str = "unknown";

/// Uniform random source in `[0, 1)`.
pub trait ProbabilitySource: Send + Sync {
    fn sample(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FastrandSource;

impl ProbabilitySource for FastrandSource {
    fn sample(&self) -> f64 {
        fastrand::f64()
    }
}

#[derive(Clone)]
pub struct AuditSampler {
    rate: f64,
    source: Arc<dyn ProbabilitySource>,
}

impl AuditSampler {
    pub fn new(rate: f64, source: Arc<dyn ProbabilitySource>) -> Self {
        let rate = if rate.is_nan() {
            0.0
        } else {
            rate.clamp(0.0, 1.0)
        };
        Self { rate, source }
    }

    pub fn with_rate(rate: f64) -> Self {
        Self::new(rate, Arc::new(FastrandSource))
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn should_record(&self) -> bool {
        self.rate > 0.0 && self.source.sample() < self.rate
    }
}

/// What the audit event may know about a rejected request.
#[derive(Debug, Clone)]
pub struct AuditContext<'a> {
    pub path: &'a str,
    pub headers: &'a HeaderMap,
    pub peer: Option<SocketAddr>,
}

#[derive(Clone)]
pub struct SecretAuthenticator {
    expected: Option<[u8; 32]>,
    sampler: AuditSampler,
}

impl SecretAuthenticator {
    pub fn new(expected: Option<&Secret>, sampler: AuditSampler) -> Self {
        Self {
            expected: expected.map(|secret| digest(secret.expose())),
            sampler,
        }
    }

    /// Fails closed when either side is absent.
    pub fn authenticate(&self, provided: Option<&str>) -> bool {
        let (Some(expected), Some(provided)) = (self.expected.as_ref(), provided) else {
            return false;
        };
        expected[..].ct_eq(&digest(provided)[..]).into()
    }

    /// Authenticate and, on rejection, count it and maybe emit an audit event.
    pub fn check(&self, provided: Option<&str>, audit: AuditContext<'_>) -> bool {
        if self.authenticate(provided) {
            return true;
        }

        counter!(METRIC_AUTH_REJECTED_TOTAL).increment(1);
        if self.sampler.should_record() {
            warn!(
                target = "freshline::audit",
                path = audit.path,
                credential_present = provided.is_some(),
                caller = %caller_identifier(audit.headers, audit.peer),
                sample_rate = self.sampler.rate(),
                "Rejected revalidation credential"
            );
        }
        false
    }
}

fn digest(value: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Best-effort caller identity: `cf-connecting-ip`, first `x-forwarded-for`
/// hop, `x-real-ip`, then the TCP peer.
pub fn caller_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    if let Some(ip) = header("cf-connecting-ip") {
        return ip.to_string();
    }
    if let Some(first) = header("x-forwarded-for")
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
    {
        return first.to_string();
    }
    if let Some(ip) = header("x-real-ip") {
        return ip.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CALLER.to_string())
}
