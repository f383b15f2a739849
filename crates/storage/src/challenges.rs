// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Challenge record persistence.

use crate::{atomic, check_segment, FsStore, StoreError, INFO_FILE};
use chall_core::Challenge;
use std::io::ErrorKind;
use tracing::warn;

impl FsStore {
    /// Persist a challenge record atomically.
    pub fn write_challenge(&self, challenge: &Challenge) -> Result<(), StoreError> {
        check_segment(&challenge.id)?;
        let path = self.challenge_dir(&challenge.id).join(INFO_FILE);
        let bytes = serde_json::to_vec_pretty(challenge)
            .map_err(|source| StoreError::Corrupt { path: path.clone(), source })?;
        atomic::write_atomic(&path, &bytes)?;
        Ok(())
    }

    /// Load a challenge record.
    pub fn read_challenge(&self, challenge_id: &str) -> Result<Challenge, StoreError> {
        check_segment(challenge_id)?;
        let path = self.challenge_dir(challenge_id).join(INFO_FILE);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(challenge_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt { path, source })
    }

    pub fn challenge_exists(&self, challenge_id: &str) -> Result<bool, StoreError> {
        check_segment(challenge_id)?;
        Ok(self.challenge_dir(challenge_id).join(INFO_FILE).is_file())
    }

    /// Remove a challenge directory recursively.
    ///
    /// The caller (challenge manager) guarantees no instances remain; this
    /// only removes whatever is left on disk.
    pub fn remove_challenge(&self, challenge_id: &str) -> Result<(), StoreError> {
        check_segment(challenge_id)?;
        match std::fs::remove_dir_all(self.challenge_dir(challenge_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Enumerate registered challenge ids.
    ///
    /// Directories without an `info.json` (mid-creation, mid-delete) are
    /// skipped, as are entries that vanish while walking.
    pub fn list_challenges(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.root().join("chall");
        list_record_dirs(&dir)
    }
}

/// Walk `dir`, returning names of child directories holding an `info.json`.
pub(crate) fn list_record_dirs(dir: &std::path::Path) -> Result<Vec<String>, StoreError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, dir = %dir.display(), "skipping unreadable store entry");
                continue;
            }
        };
        // A concurrently-deleted entry is not an error, just absent.
        match entry.file_type() {
            Ok(t) if t.is_dir() => {}
            _ => continue,
        }
        if !entry.path().join(INFO_FILE).is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
#[path = "challenges_tests.rs"]
mod tests;
