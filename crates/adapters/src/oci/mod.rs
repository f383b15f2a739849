// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario loader and OCI cache.
//!
//! Resolves a [`ScenarioRef`] to a local working directory holding the
//! scenario program. OCI artifacts and inline archives are extracted into a
//! content-addressed cache; local directories are used in place, read-only.
//!
//! Cache entries are committed by renaming a fully-extracted temp directory
//! into place, so an entry that exists is complete. Per-key single-flight
//! ensures concurrent callers for the same reference trigger one fetch.

mod archive;
mod digest;
mod registry;

pub use digest::dir_digest;

use chall_core::{read_descriptor, ScenarioError, ScenarioRef};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from scenario resolution.
#[derive(Debug, Error)]
pub enum OciError {
    #[error("registry authentication failed: {0}")]
    Unauthenticated(String),

    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("malformed scenario artifact: {0}")]
    Malformed(String),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Registry access options, from configuration.
#[derive(Debug, Clone, Default)]
pub struct OciOpts {
    /// Talk plain HTTP to the registry.
    pub insecure: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// A resolved scenario: where it lives and its content key.
#[derive(Debug, Clone)]
pub struct Materialized {
    pub dir: PathBuf,
    /// Content digest: the registry manifest digest when available,
    /// otherwise a stable hash of the reference or bytes.
    pub hash: String,
}

/// Resolves scenario references, caching extracted artifacts.
pub struct ScenarioLoader {
    cache_root: PathBuf,
    opts: OciOpts,
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    /// Memoized digests for `Dir` references, so repeated
    /// materializations of the same directory don't re-walk the tree.
    /// Purged by [`Self::invalidate`].
    dir_hashes: Mutex<HashMap<PathBuf, String>>,
    fetches: AtomicU64,
}

impl ScenarioLoader {
    pub fn new(cache_root: impl Into<PathBuf>, opts: OciOpts) -> Self {
        Self {
            cache_root: cache_root.into(),
            opts,
            inflight: Mutex::new(HashMap::new()),
            dir_hashes: Mutex::new(HashMap::new()),
            fetches: AtomicU64::new(0),
        }
    }

    /// Resolve a reference to a working directory, fetching and extracting
    /// if the cache has no complete entry for it.
    pub async fn materialize(&self, scenario: &ScenarioRef) -> Result<Materialized, OciError> {
        match scenario {
            ScenarioRef::Dir(path) => {
                read_descriptor(path)?;
                let hash = self.dir_hash(path).await?;
                Ok(Materialized { dir: path.clone(), hash })
            }
            ScenarioRef::Archive { name, bytes } => {
                let key = format!("{:x}", Sha256::digest(bytes));
                let name = name.clone();
                let bytes = bytes.clone();
                let dir = self
                    .entry(&key, move || async move {
                        debug!(name = %name, "extracting scenario archive");
                        Ok(vec![bytes])
                    })
                    .await?;
                Ok(Materialized { dir, hash: key })
            }
            ScenarioRef::Oci(reference) => {
                let key = match reference.rsplit_once('@') {
                    // Digest-pinned references are content-addressed already.
                    Some((_, digest)) => sanitize_key(digest),
                    None => format!("{:x}", Sha256::digest(reference.as_bytes())),
                };
                let reference = reference.clone();
                let opts = self.opts.clone();
                let dir = self
                    .entry(&key, move || async move {
                        info!(reference = %reference, "pulling scenario artifact");
                        let pulled = registry::pull(&reference, &opts).await?;
                        Ok(pulled.layers)
                    })
                    .await?;
                Ok(Materialized { dir, hash: key })
            }
        }
    }

    /// Drop a cache entry so the next materialization re-fetches.
    pub async fn invalidate(&self, hash: &str) -> Result<(), OciError> {
        let flight = self.flight(hash);
        let _permit = flight.lock().await;
        self.dir_hashes.lock().retain(|_, memoized| memoized != hash);
        let dir = self.cache_root.join(sanitize_key(hash));
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Digest a `Dir` reference, memoized per path. The per-key flight
    /// mutex keeps concurrent first callers from hashing the tree twice.
    async fn dir_hash(&self, path: &Path) -> Result<String, OciError> {
        let flight = self.flight(&format!("dir:{}", path.display()));
        let _permit = flight.lock().await;

        if let Some(hash) = self.dir_hashes.lock().get(path) {
            return Ok(hash.clone());
        }
        let hash = digest::dir_digest(path)?;
        self.dir_hashes.lock().insert(path.to_path_buf(), hash.clone());
        Ok(hash)
    }

    /// Number of fetch/extract runs performed; cache hits don't count.
    #[cfg(test)]
    pub(crate) fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn flight(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight.lock();
        Arc::clone(inflight.entry(key.to_string()).or_default())
    }

    /// Return the cache directory for `key`, running `fetch` for the layer
    /// bytes if no complete entry exists. Exactly one caller per key runs
    /// `fetch`; the rest wait on the per-key mutex and find the entry.
    async fn entry<F, Fut>(&self, key: &str, fetch: F) -> Result<PathBuf, OciError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<Vec<u8>>, OciError>>,
    {
        let key = sanitize_key(key);
        let flight = self.flight(&key);
        let _permit = flight.lock().await;

        let dir = self.cache_root.join(&key);
        if dir.is_dir() {
            return Ok(dir);
        }

        self.fetches.fetch_add(1, Ordering::SeqCst);
        let layers = fetch().await?;

        let tmp = self.cache_root.join(format!(".{key}.{}.tmp", std::process::id()));
        if tmp.exists() {
            std::fs::remove_dir_all(&tmp)?;
        }
        std::fs::create_dir_all(&tmp)?;
        let committed = extract_and_commit(&layers, &tmp, &dir);
        if committed.is_err() {
            let _ = std::fs::remove_dir_all(&tmp);
        }
        committed?;
        Ok(dir)
    }
}

/// Extract layers into `tmp`, check the descriptor, rename into `dir`.
fn extract_and_commit(layers: &[Vec<u8>], tmp: &Path, dir: &Path) -> Result<(), OciError> {
    for layer in layers {
        archive::unpack_layer(layer, tmp)?;
    }
    read_descriptor(tmp).map_err(|e| OciError::Malformed(e.to_string()))?;
    std::fs::rename(tmp, dir)?;
    Ok(())
}

/// Cache keys become directory names; keep them to one safe path segment.
fn sanitize_key(key: &str) -> String {
    key.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '-' }).collect()
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
