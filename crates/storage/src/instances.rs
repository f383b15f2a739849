// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance record and engine-state persistence.

use crate::challenges::list_record_dirs;
use crate::{atomic, check_segment, FsStore, StoreError, INFO_FILE, STATE_FILE};
use chall_core::Instance;
use std::io::ErrorKind;

impl FsStore {
    /// Persist an instance record atomically.
    pub fn write_instance(&self, instance: &Instance) -> Result<(), StoreError> {
        check_segment(&instance.challenge_id)?;
        check_segment(&instance.identity)?;
        let path = self.instance_dir(&instance.challenge_id, &instance.identity).join(INFO_FILE);
        let bytes = serde_json::to_vec_pretty(instance)
            .map_err(|source| StoreError::Corrupt { path: path.clone(), source })?;
        atomic::write_atomic(&path, &bytes)?;
        Ok(())
    }

    /// Load an instance record.
    pub fn read_instance(&self, challenge_id: &str, identity: &str) -> Result<Instance, StoreError> {
        check_segment(challenge_id)?;
        check_segment(identity)?;
        let path = self.instance_dir(challenge_id, identity).join(INFO_FILE);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(format!("{challenge_id}/{identity}")))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt { path, source })
    }

    pub fn instance_exists(&self, challenge_id: &str, identity: &str) -> Result<bool, StoreError> {
        check_segment(challenge_id)?;
        check_segment(identity)?;
        Ok(self.instance_dir(challenge_id, identity).join(INFO_FILE).is_file())
    }

    /// Remove an instance directory recursively (record, state blob, and
    /// scenario working copy). Removing an absent instance is not an error.
    pub fn remove_instance(&self, challenge_id: &str, identity: &str) -> Result<(), StoreError> {
        check_segment(challenge_id)?;
        check_segment(identity)?;
        match std::fs::remove_dir_all(self.instance_dir(challenge_id, identity)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Enumerate instance identities under a challenge.
    pub fn list_instances(&self, challenge_id: &str) -> Result<Vec<String>, StoreError> {
        check_segment(challenge_id)?;
        list_record_dirs(&self.challenge_dir(challenge_id).join("instance"))
    }

    /// Persist the engine's exported deployment blob for one instance.
    pub fn write_state(
        &self,
        challenge_id: &str,
        identity: &str,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        check_segment(challenge_id)?;
        check_segment(identity)?;
        let path = self.instance_dir(challenge_id, identity).join(STATE_FILE);
        atomic::write_atomic(&path, bytes)?;
        Ok(())
    }

    /// Load the engine's deployment blob for one instance.
    pub fn read_state(&self, challenge_id: &str, identity: &str) -> Result<Vec<u8>, StoreError> {
        check_segment(challenge_id)?;
        check_segment(identity)?;
        let path = self.instance_dir(challenge_id, identity).join(STATE_FILE);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(format!("{challenge_id}/{identity} state")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "instances_tests.rs"]
mod tests;
