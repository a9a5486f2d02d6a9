//! Seam between the orchestrator and remote cache backends.

use async_trait::async_trait;

use crate::domain::{
    invalidation::{Backend, BackendResult},
    paths::PathSet,
};

/// A remote cache layer that can be told to drop a set of targets.
///
/// Implementations resolve every condition, including timeouts and
/// transport errors, into a [`BackendResult`]; they never return an error.
#[async_trait]
pub trait RemoteInvalidator: Send + Sync {
    fn backend(&self) -> Backend;

    async fn invalidate(&self, targets: PathSet) -> BackendResult;
}
