// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Infrastructure adapters: the lock service and the OCI scenario loader.
//!
//! Both sit between the managers and the outside world. The lock service
//! serializes mutations on challenges and instances; the loader resolves
//! scenario references to materialized working directories.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod lock;
pub mod oci;

pub use lock::{
    challenge_key, instance_key, EtcdLocks, LocalLocks, LockError, LockGuard, LockMode,
    LockProvider,
};
pub use oci::{dir_digest, Materialized, OciError, OciOpts, ScenarioLoader};
