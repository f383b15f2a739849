// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed lock backend on etcd.
//!
//! Writers hold the etcd mutex `<prefix><key>/w`. Readers take that mutex
//! briefly to prove no writer is active, register a lease-scoped key under
//! `<prefix><key>/r/`, and release the mutex; a writer, once it owns the
//! mutex, waits for the reader prefix to drain. All session state hangs off
//! a lease so a crashed holder expires after `LEASE_TTL_SECS`.

use super::{GuardInner, LockError, LockGuard, LockMode, LockProvider};
use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions, GetOptions, LockOptions, PutOptions};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Key namespace for every lock this service creates.
const PREFIX: &str = "challd/lock/";

/// Lease TTL; a crashed holder blocks others for at most this long.
const LEASE_TTL_SECS: i64 = 30;

/// Poll interval while a writer waits for readers to drain.
const READER_DRAIN_POLL: Duration = Duration::from_millis(200);

/// Etcd-backed lock provider.
#[derive(Clone)]
pub struct EtcdLocks {
    client: Client,
}

impl EtcdLocks {
    /// Connect to etcd. `username`/`password` are both required or both
    /// absent.
    pub async fn connect(
        endpoint: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self, LockError> {
        let options = match (username, password) {
            (Some(user), Some(pass)) => Some(ConnectOptions::new().with_user(user, pass)),
            _ => None,
        };
        let client = Client::connect([endpoint], options)
            .await
            .map_err(|e| LockError::Backend(format!("etcd connect {endpoint}: {e}")))?;
        Ok(Self { client })
    }

    async fn grant_lease(&self) -> Result<i64, LockError> {
        let mut client = self.client.clone();
        let lease = client
            .lease_grant(LEASE_TTL_SECS, None)
            .await
            .map_err(|e| LockError::Backend(format!("lease grant: {e}")))?;
        Ok(lease.id())
    }

    /// Keep the lease alive for as long as the guard lives.
    fn spawn_keepalive(&self, lease_id: i64, stop: CancellationToken) {
        let client = self.client.clone();
        tokio::spawn(async move {
            let mut client = client;
            let Ok((mut keeper, mut stream)) = client.lease_keep_alive(lease_id).await else {
                warn!(lease_id, "etcd keep-alive channel failed to open");
                return;
            };
            let mut tick = tokio::time::interval(Duration::from_secs(LEASE_TTL_SECS as u64 / 3));
            loop {
                tokio::select! {
                    () = stop.cancelled() => return,
                    _ = tick.tick() => {
                        if keeper.keep_alive().await.is_err() {
                            warn!(lease_id, "etcd keep-alive failed; lease will expire");
                            return;
                        }
                        let _ = stream.message().await;
                    }
                }
            }
        });
    }

    async fn acquire_writer(&self, key: &str, lease_id: i64) -> Result<Vec<u8>, LockError> {
        let mut client = self.client.clone();
        let response = client
            .lock(
                format!("{PREFIX}{key}/w"),
                Some(LockOptions::new().with_lease(lease_id)),
            )
            .await
            .map_err(|e| LockError::Backend(format!("etcd lock {key}: {e}")))?;
        Ok(response.key().to_vec())
    }

    async fn reader_count(&self, key: &str) -> Result<i64, LockError> {
        let mut client = self.client.clone();
        let response = client
            .get(
                format!("{PREFIX}{key}/r/"),
                Some(GetOptions::new().with_prefix().with_count_only()),
            )
            .await
            .map_err(|e| LockError::Backend(format!("etcd get {key}: {e}")))?;
        Ok(response.count())
    }

    async fn drain_readers(&self, key: &str, cancel: &CancellationToken) -> Result<(), LockError> {
        loop {
            if self.reader_count(key).await? == 0 {
                return Ok(());
            }
            tokio::select! {
                () = cancel.cancelled() => return Err(LockError::Cancelled(key.to_string())),
                () = tokio::time::sleep(READER_DRAIN_POLL) => {}
            }
        }
    }
}

/// Cleanup actions for one held etcd lock.
pub(super) struct EtcdGuard {
    client: Client,
    /// Mutex key to unlock (writers only).
    mutex_key: Option<Vec<u8>>,
    /// Reader registration to delete (readers only).
    reader_key: Option<String>,
    lease_id: i64,
    keepalive_stop: CancellationToken,
}

impl Drop for EtcdGuard {
    fn drop(&mut self) {
        self.keepalive_stop.cancel();
        let mut client = self.client.clone();
        let mutex_key = self.mutex_key.take();
        let reader_key = self.reader_key.take();
        let lease_id = self.lease_id;
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            // No runtime left; the lease TTL reclaims everything.
            return;
        };
        handle.spawn(async move {
            if let Some(key) = reader_key {
                if let Err(e) = client.delete(key, None).await {
                    warn!(error = %e, "failed to delete etcd reader key");
                }
            }
            if let Some(key) = mutex_key {
                if let Err(e) = client.unlock(key).await {
                    warn!(error = %e, "failed to unlock etcd mutex");
                }
            }
            // Revoking the lease also clears anything the deletes missed.
            if let Err(e) = client.lease_revoke(lease_id).await {
                warn!(error = %e, lease_id, "failed to revoke etcd lease");
            }
        });
    }
}

#[async_trait]
impl LockProvider for EtcdLocks {
    async fn acquire(
        &self,
        key: &str,
        mode: LockMode,
        cancel: &CancellationToken,
    ) -> Result<LockGuard, LockError> {
        let lease_id = self.grant_lease().await?;
        let keepalive_stop = CancellationToken::new();
        self.spawn_keepalive(lease_id, keepalive_stop.clone());

        // Cleans up the session if acquisition fails or is cancelled.
        let mut session = EtcdGuard {
            client: self.client.clone(),
            mutex_key: None,
            reader_key: None,
            lease_id,
            keepalive_stop,
        };

        let mutex_key = tokio::select! {
            result = self.acquire_writer(key, lease_id) => result?,
            () = cancel.cancelled() => return Err(LockError::Cancelled(key.to_string())),
        };

        match mode {
            LockMode::Exclusive => {
                session.mutex_key = Some(mutex_key);
                self.drain_readers(key, cancel).await?;
            }
            LockMode::Shared => {
                // Register as reader, then let the mutex go so other
                // readers (and eventually writers) can proceed.
                let reader_key = format!("{PREFIX}{key}/r/{lease_id:x}");
                let mut client = self.client.clone();
                client
                    .put(
                        reader_key.as_str(),
                        Vec::new(),
                        Some(PutOptions::new().with_lease(lease_id)),
                    )
                    .await
                    .map_err(|e| LockError::Backend(format!("etcd put {key}: {e}")))?;
                session.reader_key = Some(reader_key);
                let mut client = self.client.clone();
                client
                    .unlock(mutex_key)
                    .await
                    .map_err(|e| LockError::Backend(format!("etcd unlock {key}: {e}")))?;
            }
        }

        Ok(LockGuard { _inner: GuardInner::Etcd(session) })
    }
}
