// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Challenge lifecycle: create, read, update (with instance fan-out),
//! delete (with instance cascade).

use super::{require_id, Deps, InstanceManager, ManagerError};
use chall_adapters::{challenge_key, instance_key, LockMode};
use chall_core::{Challenge, Clock, ScenarioRef};
use chall_storage::StoreError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Parameters for registering a challenge.
pub struct NewChallenge {
    pub id: String,
    pub scenario: ScenarioRef,
    pub until: Option<DateTime<Utc>>,
    pub timeout: Option<u64>,
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub additional: BTreeMap<String, String>,
    pub image_pull_secrets: Vec<String>,
}

/// A challenge update; unset fields leave the stored value untouched.
#[derive(Default)]
pub struct ChallengeDelta {
    pub scenario: Option<ScenarioRef>,
    pub until: Option<DateTime<Utc>>,
    pub timeout: Option<u64>,
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub additional: Option<BTreeMap<String, String>>,
    pub image_pull_secrets: Option<Vec<String>>,
}

pub struct ChallengeManager<C: Clock> {
    deps: Arc<Deps<C>>,
    instances: InstanceManager<C>,
}

impl<C: Clock> Clone for ChallengeManager<C> {
    fn clone(&self) -> Self {
        Self { deps: Arc::clone(&self.deps), instances: self.instances.clone() }
    }
}

impl<C: Clock> ChallengeManager<C> {
    pub fn new(deps: Arc<Deps<C>>) -> Self {
        let instances = InstanceManager::new(Arc::clone(&deps));
        Self { deps, instances }
    }

    /// Register a challenge: resolve the scenario, validate it with a
    /// preview run, persist the record. Nothing is written on failure.
    pub async fn create(
        &self,
        new: NewChallenge,
        cancel: &CancellationToken,
    ) -> Result<Challenge, ManagerError> {
        require_id(&new.id, "challenge id")?;
        let _lc =
            self.deps.locks.acquire(&challenge_key(&new.id), LockMode::Exclusive, cancel).await?;

        if self.deps.store.challenge_exists(&new.id)? {
            return Err(ManagerError::AlreadyExists(format!("challenge {}", new.id)));
        }

        let (scenario, hash) = self.resolve_and_validate(&new.scenario, &new.id).await?;
        let now = self.deps.clock.now();
        let challenge = Challenge {
            id: new.id,
            scenario,
            hash,
            until: new.until,
            timeout: new.timeout,
            min: new.min,
            max: new.max,
            additional: new.additional,
            image_pull_secrets: new.image_pull_secrets,
            created_at: now,
            updated_at: now,
        };
        self.deps.store.write_challenge(&challenge)?;
        info!(challenge_id = %challenge.id, hash = %challenge.hash, "challenge created");
        Ok(challenge)
    }

    /// Lock-free read.
    pub fn read(&self, challenge_id: &str) -> Result<Challenge, ManagerError> {
        require_id(challenge_id, "challenge id")?;
        self.read_record(challenge_id)
    }

    pub fn list(&self) -> Result<Vec<String>, ManagerError> {
        Ok(self.deps.store.list_challenges()?)
    }

    pub fn list_instances(&self, challenge_id: &str) -> Result<Vec<String>, ManagerError> {
        require_id(challenge_id, "challenge id")?;
        Ok(self.deps.store.list_instances(challenge_id)?)
    }

    /// Apply a delta, then re-deploy every live instance so the new
    /// scenario/config takes effect.
    ///
    /// Returns the updated record plus per-instance failures; failed
    /// instances are not rolled back and the record write stands.
    pub async fn update(
        &self,
        challenge_id: &str,
        delta: ChallengeDelta,
        cancel: &CancellationToken,
    ) -> Result<(Challenge, Vec<(String, String)>), ManagerError> {
        require_id(challenge_id, "challenge id")?;
        let _lc = self
            .deps
            .locks
            .acquire(&challenge_key(challenge_id), LockMode::Exclusive, cancel)
            .await?;

        let mut challenge = self.read_record(challenge_id)?;

        if let Some(scenario) = &delta.scenario {
            let old_hash = challenge.hash.clone();
            let (stored, hash) = self.resolve_and_validate(scenario, challenge_id).await?;
            challenge.scenario = stored;
            challenge.hash = hash;
            if old_hash != challenge.hash {
                if let Err(e) = self.deps.loader.invalidate(&old_hash).await {
                    warn!(hash = %old_hash, error = %e, "failed to invalidate stale scenario cache entry");
                }
            }
        }
        if let Some(until) = delta.until {
            challenge.until = Some(until);
        }
        if let Some(timeout) = delta.timeout {
            challenge.timeout = Some(timeout);
        }
        if let Some(min) = delta.min {
            challenge.min = Some(min);
        }
        if let Some(max) = delta.max {
            challenge.max = Some(max);
        }
        if let Some(additional) = delta.additional {
            challenge.additional = additional;
        }
        if let Some(secrets) = delta.image_pull_secrets {
            challenge.image_pull_secrets = secrets;
        }
        challenge.updated_at = self.deps.clock.now();
        self.deps.store.write_challenge(&challenge)?;

        // Fan out under the still-held exclusive challenge lock; nothing
        // else can touch this challenge's instances meanwhile.
        let mut failures = Vec::new();
        for identity in self.deps.store.list_instances(challenge_id)? {
            let mut instance = match self.deps.store.read_instance(challenge_id, &identity) {
                Ok(instance) => instance,
                Err(e) => {
                    failures.push((identity, e.to_string()));
                    continue;
                }
            };
            let _li = self
                .deps
                .locks
                .acquire(&instance_key(challenge_id, &instance.source_id), LockMode::Exclusive, cancel)
                .await?;
            if let Err(e) = self.instances.re_up(&challenge, &mut instance).await {
                warn!(challenge_id, identity = %identity, error = %e, "instance re-deploy failed during challenge update");
                failures.push((identity.clone(), e.to_string()));
            }
        }

        info!(challenge_id, failures = failures.len(), "challenge updated");
        Ok((challenge, failures))
    }

    /// Delete every instance, then the challenge record. If any instance
    /// fails to delete, the record stays so a retry can finish the job.
    pub async fn delete(
        &self,
        challenge_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ManagerError> {
        require_id(challenge_id, "challenge id")?;
        let _lc = self
            .deps
            .locks
            .acquire(&challenge_key(challenge_id), LockMode::Exclusive, cancel)
            .await?;

        let _ = self.read_record(challenge_id)?;

        let mut failures = Vec::new();
        for identity in self.deps.store.list_instances(challenge_id)? {
            let source_id = match self.deps.store.read_instance(challenge_id, &identity) {
                Ok(instance) => instance.source_id,
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => {
                    failures.push((identity, e.to_string()));
                    continue;
                }
            };
            let _li = self
                .deps
                .locks
                .acquire(&instance_key(challenge_id, &source_id), LockMode::Exclusive, cancel)
                .await?;
            match self.instances.delete_locked(challenge_id, &identity).await {
                Ok(()) => {}
                Err(ManagerError::NotFound(_)) => {}
                Err(e) => failures.push((identity.clone(), e.to_string())),
            }
        }

        if !failures.is_empty() {
            return Err(ManagerError::Partial(failures));
        }
        self.deps.store.remove_challenge(challenge_id)?;
        info!(challenge_id, "challenge deleted");
        Ok(())
    }

    fn read_record(&self, challenge_id: &str) -> Result<Challenge, ManagerError> {
        match self.deps.store.read_challenge(challenge_id) {
            Err(StoreError::NotFound(_)) => {
                Err(ManagerError::NotFound(format!("challenge {challenge_id}")))
            }
            other => other.map_err(Into::into),
        }
    }

    /// Materialize and preview-validate a scenario. Returns the reference
    /// string to store (archives resolve to their cache directory) and the
    /// content hash.
    async fn resolve_and_validate(
        &self,
        scenario: &ScenarioRef,
        challenge_id: &str,
    ) -> Result<(String, String), ManagerError> {
        let materialized = self.deps.loader.materialize(scenario).await?;
        self.deps.engine.validate(&materialized.dir, challenge_id).await?;
        let stored = match scenario {
            ScenarioRef::Archive { .. } => materialized.dir.to_string_lossy().into_owned(),
            other => other.to_string(),
        };
        Ok((stored, materialized.hash))
    }
}

#[cfg(test)]
#[path = "challenge_tests.rs"]
mod tests;
