//! Per-backend invalidation jobs and their outcomes.

use std::fmt;

use uuid::Uuid;

use super::paths::PathSet;

/// Remote cache layer a job is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Prefix-based edge cache purge.
    Edge,
    /// Wildcard path invalidation at the CDN.
    Cdn,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Edge => "edge",
            Backend::Cdn => "cdn",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of work handed to one remote backend. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationJob {
    pub backend: Backend,
    pub targets: PathSet,
    pub idempotency_token: Option<Uuid>,
    pub truncated: bool,
    pub original_count: Option<usize>,
}

impl InvalidationJob {
    pub fn new(backend: Backend, targets: PathSet) -> Self {
        Self {
            backend,
            targets,
            idempotency_token: None,
            truncated: false,
            original_count: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOutcome {
    /// The backend accepted the job; `remote_id` is its job identifier if it returned one.
    Success { remote_id: Option<String> },
    /// The backend is not configured for this deployment.
    Skipped { reason: String },
    /// The backend was configured but the call did not succeed.
    Failed {
        status: Option<u16>,
        message: String,
    },
}

impl BackendOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            BackendOutcome::Success { .. } => "success",
            BackendOutcome::Skipped { .. } => "skipped",
            BackendOutcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResult {
    pub backend: Backend,
    pub outcome: BackendOutcome,
    /// Job that was (or would have been) sent; absent when skipped before one was built.
    pub job: Option<InvalidationJob>,
}

impl BackendResult {
    pub fn success(job: InvalidationJob, remote_id: Option<String>) -> Self {
        Self {
            backend: job.backend,
            outcome: BackendOutcome::Success { remote_id },
            job: Some(job),
        }
    }

    pub fn skipped(backend: Backend, reason: impl Into<String>) -> Self {
        Self {
            backend,
            outcome: BackendOutcome::Skipped {
                reason: reason.into(),
            },
            job: None,
        }
    }

    pub fn failed(job: InvalidationJob, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            backend: job.backend,
            outcome: BackendOutcome::Failed {
                status,
                message: message.into(),
            },
            job: Some(job),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BackendOutcome::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, BackendOutcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, BackendOutcome::Failed { .. })
    }

    pub fn target_count(&self) -> usize {
        self.job.as_ref().map_or(0, |job| job.targets.len())
    }

    /// Truncation notice if the job was capped.
    pub fn truncation(&self) -> Option<(usize, usize)> {
        let job = self.job.as_ref()?;
        match (job.truncated, job.original_count) {
            (true, Some(original)) => Some((original, job.targets.len())),
            _ => None,
        }
    }

    /// Human-readable one-liner used in logs and warnings.
    pub fn detail(&self) -> String {
        match &self.outcome {
            BackendOutcome::Success {
                remote_id: Some(id),
            } => format!("accepted as {id}"),
            BackendOutcome::Success { remote_id: None } => "accepted".to_string(),
            BackendOutcome::Skipped { reason } => format!("skipped: {reason}"),
            BackendOutcome::Failed {
                status: Some(status),
                message,
            } => format!("failed with status {status}: {message}"),
            BackendOutcome::Failed {
                status: None,
                message,
            } => format!("failed: {message}"),
        }
    }
}
