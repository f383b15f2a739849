// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named reader-writer locks over pluggable backends.
//!
//! Two scopes are used by the managers:
//! - challenge lock `challenge_key(id)`: shared for instance operations,
//!   exclusive for challenge mutations;
//! - instance lock `instance_key(id, source)`: always exclusive, taken
//!   under the challenge lock.
//!
//! Callers acquire the challenge lock first, then at most one instance
//! lock. Neither backend supports reentrant acquisition; a task must
//! release before re-entering.

mod etcd;
mod local;

pub use etcd::EtcdLocks;
pub use local::LocalLocks;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Lock key for a challenge.
pub fn challenge_key(challenge_id: &str) -> String {
    format!("chall/{challenge_id}")
}

/// Lock key for one `(challenge_id, source_id)` pair.
pub fn instance_key(challenge_id: &str, source_id: &str) -> String {
    format!("chall/{challenge_id}/src/{source_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Errors from lock acquisition.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock acquisition cancelled: {0}")]
    Cancelled(String),

    #[error("lock backend error: {0}")]
    Backend(String),
}

/// A held lock. Released on drop; release is idempotent and safe on every
/// exit path, including panic unwinds and cancelled futures.
pub struct LockGuard {
    _inner: GuardInner,
}

// NOTE(lifetime): held for its Drop; never read.
#[allow(dead_code)]
enum GuardInner {
    Local(local::LocalGuard),
    Etcd(etcd::EtcdGuard),
}

/// A named-lock backend.
///
/// `acquire` blocks until the lock is granted or `cancel` fires. Fairness
/// is not part of the contract.
#[async_trait]
pub trait LockProvider: Send + Sync {
    async fn acquire(
        &self,
        key: &str,
        mode: LockMode,
        cancel: &CancellationToken,
    ) -> Result<LockGuard, LockError>;
}
