// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Challenge and instance lifecycle managers, plus the janitor.
//!
//! Locking discipline, shared by everything here: the challenge lock is
//! taken first (shared for instance operations, exclusive for challenge
//! mutations), then at most one instance lock, always exclusive. Engine
//! and store work happens strictly under those locks.

mod challenge;
mod instance;
mod janitor;

#[cfg(test)]
pub(crate) mod test_support;

pub use challenge::{ChallengeDelta, ChallengeManager, NewChallenge};
pub use instance::InstanceManager;
pub use janitor::{Janitor, Schedule, TickSummary};

use chall_adapters::{LockError, LockProvider, OciError, ScenarioLoader};
use chall_core::{Clock, ScenarioError};
use chall_engine::{EngineError, ScenarioEngine};
use chall_storage::{FsStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Shared collaborators injected into the managers.
pub struct Deps<C: Clock> {
    pub store: FsStore,
    pub locks: Arc<dyn LockProvider>,
    pub loader: Arc<ScenarioLoader>,
    pub engine: Arc<dyn ScenarioEngine>,
    pub clock: C,
}

/// Errors surfaced by manager operations; mapped to gRPC codes in
/// `grpc::status`.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("precondition failed: {0}")]
    FailedPrecondition(String),

    /// Some per-instance steps of a fan-out operation failed; the rest
    /// completed and are not rolled back. Retry safe.
    #[error("partial failure: {}", summarize(.0))]
    Partial(Vec<(String, String)>),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Oci(#[from] OciError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<ScenarioError> for ManagerError {
    fn from(e: ScenarioError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

/// Reject empty identifiers before they reach locks or paths.
pub(crate) fn require_id(value: &str, what: &str) -> Result<(), ManagerError> {
    if value.trim().is_empty() {
        return Err(ManagerError::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(())
}

fn summarize(failures: &[(String, String)]) -> String {
    let parts: Vec<String> =
        failures.iter().map(|(identity, error)| format!("{identity}: {error}")).collect();
    parts.join("; ")
}
