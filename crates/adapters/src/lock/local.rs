// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process lock backend: a refcounted table of named RW locks.
//!
//! Entries exist only while at least one task holds or awaits the lock, so
//! the table does not grow with the number of names ever seen.

use super::{GuardInner, LockError, LockGuard, LockMode, LockProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tokio_util::sync::CancellationToken;

struct Slot {
    lock: Arc<RwLock<()>>,
    refs: usize,
}

type Table = Arc<Mutex<HashMap<String, Slot>>>;

/// Process-wide mutex table keyed by name.
#[derive(Clone, Default)]
pub struct LocalLocks {
    table: Table,
}

impl LocalLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries; used by tests to check cleanup.
    pub fn entry_count(&self) -> usize {
        self.table.lock().len()
    }

    fn checkout(&self, key: &str) -> Arc<RwLock<()>> {
        let mut table = self.table.lock();
        let slot = table
            .entry(key.to_string())
            .or_insert_with(|| Slot { lock: Arc::new(RwLock::new(())), refs: 0 });
        slot.refs += 1;
        Arc::clone(&slot.lock)
    }
}

/// Decrements the slot refcount; removes the entry at zero.
struct Checkin {
    table: Table,
    key: String,
}

impl Drop for Checkin {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        if let Some(slot) = table.get_mut(&self.key) {
            slot.refs -= 1;
            if slot.refs == 0 {
                table.remove(&self.key);
            }
        }
    }
}

// NOTE(lifetime): held to keep the RW lock; never read.
#[allow(dead_code)]
enum Held {
    Shared(OwnedRwLockReadGuard<()>),
    Exclusive(OwnedRwLockWriteGuard<()>),
}

/// Fields drop in declaration order: the RW guard releases before the
/// refcount check-in, so a waiter woken by the release still sees the slot.
pub(super) struct LocalGuard {
    _held: Held,
    _checkin: Checkin,
}

#[async_trait]
impl LockProvider for LocalLocks {
    async fn acquire(
        &self,
        key: &str,
        mode: LockMode,
        cancel: &CancellationToken,
    ) -> Result<LockGuard, LockError> {
        let lock = self.checkout(key);
        let checkin = Checkin { table: Arc::clone(&self.table), key: key.to_string() };

        // Biased: a cancelled caller never wins the lock.
        let held = match mode {
            LockMode::Shared => tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(LockError::Cancelled(key.to_string()));
                }
                guard = lock.clone().read_owned() => Held::Shared(guard),
            },
            LockMode::Exclusive => tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(LockError::Cancelled(key.to_string()));
                }
                guard = lock.clone().write_owned() => Held::Exclusive(guard),
            },
        };

        Ok(LockGuard { _inner: GuardInner::Local(LocalGuard { _held: held, _checkin: checkin }) })
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
