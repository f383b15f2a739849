// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance lifecycle: create, read, update, renew, delete.
//!
//! Every mutating operation holds the challenge lock (shared) and the
//! instance lock (exclusive). Engine work happens only under those locks,
//! so operations on one `(challenge_id, source_id)` are linearizable.

use super::{require_id, Deps, ManagerError};
use chall_adapters::{challenge_key, instance_key, LockMode};
use chall_core::{identity, Challenge, Clock, Instance, ScenarioRef};
use chall_engine::{Stack, StackConfig};
use chall_storage::{copy_dir, StoreError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct InstanceManager<C: Clock> {
    deps: Arc<Deps<C>>,
}

impl<C: Clock> Clone for InstanceManager<C> {
    fn clone(&self) -> Self {
        Self { deps: Arc::clone(&self.deps) }
    }
}

impl<C: Clock> InstanceManager<C> {
    pub fn new(deps: Arc<Deps<C>>) -> Self {
        Self { deps }
    }

    /// Deploy a new instance of `challenge_id` for `source_id`.
    ///
    /// On any failure after `up`, the deployment is torn down best-effort
    /// and no record survives; the original error propagates.
    pub async fn create(
        &self,
        challenge_id: &str,
        source_id: &str,
        additional: BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<Instance, ManagerError> {
        require_id(challenge_id, "challenge_id")?;
        require_id(source_id, "source_id")?;
        let locks = &self.deps.locks;
        let _lc = locks.acquire(&challenge_key(challenge_id), LockMode::Shared, cancel).await?;
        let _li = locks
            .acquire(&instance_key(challenge_id, source_id), LockMode::Exclusive, cancel)
            .await?;

        let challenge = self.load_challenge(challenge_id)?;
        if let Some(max) = challenge.max {
            let count = self.deps.store.list_instances(challenge_id)?.len();
            if count as u32 >= max {
                return Err(ManagerError::FailedPrecondition(format!(
                    "challenge {challenge_id} is at its instance limit ({max})"
                )));
            }
        }

        let identity = identity(challenge_id, source_id);
        if self.deps.store.instance_exists(challenge_id, &identity)? {
            return Err(ManagerError::AlreadyExists(format!(
                "instance {identity} of challenge {challenge_id}"
            )));
        }

        let now = self.deps.clock.now();
        let mut instance = Instance {
            identity: identity.clone(),
            challenge_id: challenge_id.to_string(),
            source_id: source_id.to_string(),
            since: now,
            last_renew: now,
            until: challenge.instance_until(now),
            connection_info: String::new(),
            flags: Vec::new(),
            additional,
            needs_cleanup: false,
        };

        match self.deploy(&challenge, &mut instance).await {
            Ok(()) => {
                info!(challenge_id, identity = %instance.identity, "instance created");
                Ok(instance)
            }
            Err(e) => {
                let _ = self.deps.store.remove_instance(challenge_id, &identity);
                Err(e)
            }
        }
    }

    /// Lock-free read.
    pub fn read(&self, challenge_id: &str, source_id: &str) -> Result<Instance, ManagerError> {
        require_id(challenge_id, "challenge_id")?;
        require_id(source_id, "source_id")?;
        let identity = identity(challenge_id, source_id);
        self.read_by_identity(challenge_id, &identity)
    }

    pub fn read_by_identity(
        &self,
        challenge_id: &str,
        identity: &str,
    ) -> Result<Instance, ManagerError> {
        match self.deps.store.read_instance(challenge_id, identity) {
            Err(StoreError::NotFound(_)) => Err(ManagerError::NotFound(format!(
                "instance {identity} of challenge {challenge_id}"
            ))),
            other => other.map_err(Into::into),
        }
    }

    /// Re-deploy an instance, optionally replacing its config overrides.
    pub async fn update(
        &self,
        challenge_id: &str,
        source_id: &str,
        additional: Option<BTreeMap<String, String>>,
        cancel: &CancellationToken,
    ) -> Result<Instance, ManagerError> {
        require_id(challenge_id, "challenge_id")?;
        require_id(source_id, "source_id")?;
        let locks = &self.deps.locks;
        let _lc = locks.acquire(&challenge_key(challenge_id), LockMode::Shared, cancel).await?;
        let _li = locks
            .acquire(&instance_key(challenge_id, source_id), LockMode::Exclusive, cancel)
            .await?;

        let challenge = self.load_challenge(challenge_id)?;
        let identity = identity(challenge_id, source_id);
        let mut instance = self.read_by_identity(challenge_id, &identity)?;
        if let Some(additional) = additional {
            instance.additional = additional;
        }
        self.re_up(&challenge, &mut instance).await?;
        info!(challenge_id, identity = %instance.identity, "instance updated");
        Ok(instance)
    }

    /// Extend the lease: `last_renew = now`, `until = now + timeout`,
    /// capped at the challenge-wide `until`. Touches no infrastructure.
    pub async fn renew(
        &self,
        challenge_id: &str,
        source_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Instance, ManagerError> {
        require_id(challenge_id, "challenge_id")?;
        require_id(source_id, "source_id")?;
        let locks = &self.deps.locks;
        let _lc = locks.acquire(&challenge_key(challenge_id), LockMode::Shared, cancel).await?;
        let _li = locks
            .acquire(&instance_key(challenge_id, source_id), LockMode::Exclusive, cancel)
            .await?;

        let challenge = self.load_challenge(challenge_id)?;
        let Some(timeout) = challenge.timeout else {
            return Err(ManagerError::FailedPrecondition(format!(
                "challenge {challenge_id} defines no timeout; instances cannot be renewed"
            )));
        };

        let identity = identity(challenge_id, source_id);
        let mut instance = self.read_by_identity(challenge_id, &identity)?;
        let now = self.deps.clock.now();
        instance.last_renew = now;
        let mut until = now + chrono::Duration::seconds(timeout as i64);
        if let Some(ceiling) = challenge.until {
            until = until.min(ceiling);
        }
        instance.until = Some(until);
        self.deps.store.write_instance(&instance)?;
        Ok(instance)
    }

    /// Tear down and remove one instance.
    pub async fn delete(
        &self,
        challenge_id: &str,
        source_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ManagerError> {
        require_id(challenge_id, "challenge_id")?;
        require_id(source_id, "source_id")?;
        let locks = &self.deps.locks;
        let _lc = locks.acquire(&challenge_key(challenge_id), LockMode::Shared, cancel).await?;
        let _li = locks
            .acquire(&instance_key(challenge_id, source_id), LockMode::Exclusive, cancel)
            .await?;
        let identity = identity(challenge_id, source_id);
        self.delete_locked(challenge_id, &identity).await
    }

    /// Delete body; the caller holds the challenge and instance locks.
    ///
    /// The record is removed last: a crash mid-delete leaves it pointing at
    /// the partially-cleaned deployment, and the next attempt (client retry
    /// or janitor) runs the whole sequence again. A failed teardown marks
    /// the record `needs_cleanup` so the janitor retries it.
    pub(crate) async fn delete_locked(
        &self,
        challenge_id: &str,
        identity: &str,
    ) -> Result<(), ManagerError> {
        let mut instance = self.read_by_identity(challenge_id, identity)?;

        // No state blob means `up` never completed; nothing is deployed.
        let state = match self.deps.store.read_state(challenge_id, identity) {
            Ok(state) => Some(state),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        if let Some(state) = state {
            if let Err(e) = self.teardown(challenge_id, identity, &state).await {
                warn!(challenge_id, identity, error = %e, "instance teardown failed");
                instance.needs_cleanup = true;
                if let Err(write_err) = self.deps.store.write_instance(&instance) {
                    warn!(challenge_id, identity, error = %write_err, "failed to flag instance for cleanup");
                }
                return Err(e);
            }
        }

        self.deps.store.remove_instance(challenge_id, identity)?;
        info!(challenge_id, identity, "instance deleted");
        Ok(())
    }

    /// Restore the recorded deployment into the instance's existing working
    /// copy and destroy it.
    ///
    /// The working copy is used as-is, not refreshed from the scenario
    /// cache: the instance comes down with the scenario it went up with,
    /// even if the challenge has since moved to a newer version.
    async fn teardown(
        &self,
        challenge_id: &str,
        identity: &str,
        state: &[u8],
    ) -> Result<(), ManagerError> {
        let workdir = self.deps.store.scenario_dir(challenge_id, identity);
        let mut stack = self.deps.engine.load(&workdir, identity).await?;
        stack.import(state).await?;
        stack.down().await?;
        Ok(())
    }

    /// Re-deploy an existing instance: refresh the working copy, restore
    /// the stored deployment, apply config, `up`, persist the new outputs
    /// and state. Also used by challenge-update fan-out (the caller holds
    /// the locks).
    pub(crate) async fn re_up(
        &self,
        challenge: &Challenge,
        instance: &mut Instance,
    ) -> Result<(), ManagerError> {
        let workdir = self.prepare_workdir(challenge, &instance.identity).await?;
        let mut stack = self.deps.engine.load(&workdir, &instance.identity).await?;
        let state = self.deps.store.read_state(&instance.challenge_id, &instance.identity)?;
        stack.import(&state).await?;
        stack.set_config(&stack_config(challenge, instance)).await?;
        self.finish_up(instance, stack.as_mut()).await
    }

    fn load_challenge(&self, challenge_id: &str) -> Result<Challenge, ManagerError> {
        match self.deps.store.read_challenge(challenge_id) {
            Err(StoreError::NotFound(_)) => Err(ManagerError::FailedPrecondition(format!(
                "challenge {challenge_id} does not exist"
            ))),
            other => other.map_err(Into::into),
        }
    }

    /// Materialize the scenario and copy it into the instance's working
    /// directory (creating or refreshing it).
    async fn prepare_workdir(
        &self,
        challenge: &Challenge,
        identity: &str,
    ) -> Result<PathBuf, ManagerError> {
        let scenario = ScenarioRef::parse(&challenge.scenario)?;
        let materialized = self.deps.loader.materialize(&scenario).await?;
        let workdir = self.deps.store.scenario_dir(&challenge.id, identity);
        copy_dir(&materialized.dir, &workdir).map_err(StoreError::Io)?;
        Ok(workdir)
    }

    /// First deployment: configure, `up`, persist. On failure from `up`
    /// onward, best-effort `down` so nothing leaks.
    async fn deploy(
        &self,
        challenge: &Challenge,
        instance: &mut Instance,
    ) -> Result<(), ManagerError> {
        let workdir = self.prepare_workdir(challenge, &instance.identity).await?;
        let mut stack = self.deps.engine.load(&workdir, &instance.identity).await?;
        stack.set_config(&stack_config(challenge, instance)).await?;
        match self.finish_up(instance, stack.as_mut()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(identity = %instance.identity, error = %e, "deploy failed; tearing down");
                if let Err(down_err) = stack.down().await {
                    warn!(identity = %instance.identity, error = %down_err, "best-effort teardown failed");
                }
                Err(e)
            }
        }
    }

    /// `up`, export outputs and state, write the record and blob.
    async fn finish_up(
        &self,
        instance: &mut Instance,
        stack: &mut dyn Stack,
    ) -> Result<(), ManagerError> {
        let outputs = stack.up().await?;
        let state = stack.export().await?;
        instance.connection_info = outputs.connection_info;
        instance.flags = outputs.flags;
        self.deps.store.write_instance(instance)?;
        self.deps.store.write_state(&instance.challenge_id, &instance.identity, &state)?;
        Ok(())
    }
}

fn stack_config(challenge: &Challenge, instance: &Instance) -> StackConfig {
    StackConfig {
        identity: instance.identity.clone(),
        challenge_id: challenge.id.clone(),
        image_pull_secrets: challenge.image_pull_secrets.clone(),
        additional: instance.merged_additional(challenge),
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
