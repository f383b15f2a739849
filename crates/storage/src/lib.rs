// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem-rooted persistent store.
//!
//! Durable records for challenges and instances plus the opaque engine
//! state blob, laid out as:
//!
//! ```text
//! <root>/chall/<challenge_id>/info.json
//! <root>/chall/<challenge_id>/instance/<identity>/info.json
//! <root>/chall/<challenge_id>/instance/<identity>/state.json
//! <root>/chall/<challenge_id>/instance/<identity>/state/        (scenario working copy)
//! ```
//!
//! All record writes are atomic (temp sibling + rename). The store is
//! single-writer per file; mutual exclusion comes from the lock service,
//! not from here.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod atomic;
mod challenges;
mod instances;

pub use atomic::{copy_dir, write_atomic};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Record file name within a challenge or instance directory.
pub const INFO_FILE: &str = "info.json";
/// Engine deployment blob, sibling of the instance record.
pub const STATE_FILE: &str = "state.json";
/// Scenario working copy directory inside an instance directory.
pub const STATE_DIR: &str = "state";

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("corrupt record at {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid path segment {0:?}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Filesystem store rooted at a configured directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/chall/<id>`
    pub fn challenge_dir(&self, challenge_id: &str) -> PathBuf {
        self.root.join("chall").join(challenge_id)
    }

    /// `<root>/chall/<id>/instance/<identity>`
    pub fn instance_dir(&self, challenge_id: &str, identity: &str) -> PathBuf {
        self.challenge_dir(challenge_id).join("instance").join(identity)
    }

    /// Scenario working copy for one instance. The engine's local backend
    /// files live here too.
    pub fn scenario_dir(&self, challenge_id: &str, identity: &str) -> PathBuf {
        self.instance_dir(challenge_id, identity).join(STATE_DIR)
    }
}

/// Refuse path segments that would escape the store root.
pub(crate) fn check_segment(segment: &str) -> Result<(), StoreError> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
        || segment.contains('\0');
    if bad {
        return Err(StoreError::InvalidKey(segment.to_string()));
    }
    Ok(())
}
