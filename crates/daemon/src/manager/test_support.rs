// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for manager tests: tempdir store, local locks, fake
//! clock, fake engine, and a local scenario fixture.

use super::{ChallengeManager, Deps, InstanceManager, NewChallenge};
use chall_adapters::{LocalLocks, OciOpts, ScenarioLoader};
use chall_core::{Challenge, FakeClock, ScenarioRef};
use chall_engine::fake::FakeEngine;
use chall_storage::FsStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) struct Harness {
    pub deps: Arc<Deps<FakeClock>>,
    pub engine: FakeEngine,
    pub clock: FakeClock,
    pub cancel: CancellationToken,
    pub challenges: ChallengeManager<FakeClock>,
    pub instances: InstanceManager<FakeClock>,
    pub scenario_dir: PathBuf,
    // NOTE(lifetime): removes the tempdir when the harness drops.
    _root: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let data = root.path().join("data");
        let cache = root.path().join("cache");
        let scenario_dir = root.path().join("scenario");
        std::fs::create_dir_all(&scenario_dir).unwrap_or_else(|e| panic!("mkdir: {e}"));
        std::fs::write(scenario_dir.join("Pulumi.yaml"), "name: fixture\nruntime: go\n")
            .unwrap_or_else(|e| panic!("write descriptor: {e}"));

        let engine = FakeEngine::new();
        let clock = FakeClock::new();
        let deps = Arc::new(Deps {
            store: FsStore::new(&data),
            locks: Arc::new(LocalLocks::new()),
            loader: Arc::new(ScenarioLoader::new(&cache, OciOpts::default())),
            engine: Arc::new(engine.clone()),
            clock: clock.clone(),
        });

        Self {
            challenges: ChallengeManager::new(Arc::clone(&deps)),
            instances: InstanceManager::new(Arc::clone(&deps)),
            engine,
            clock,
            cancel: CancellationToken::new(),
            scenario_dir,
            deps,
            _root: root,
        }
    }

    /// A `NewChallenge` pointing at the local scenario fixture.
    pub fn new_challenge(&self, id: &str) -> NewChallenge {
        NewChallenge {
            id: id.to_string(),
            scenario: ScenarioRef::Dir(self.scenario_dir.clone()),
            until: None,
            timeout: None,
            min: None,
            max: None,
            additional: Default::default(),
            image_pull_secrets: Vec::new(),
        }
    }

    pub async fn create_challenge(&self, id: &str) -> Challenge {
        self.challenges
            .create(self.new_challenge(id), &self.cancel)
            .await
            .unwrap_or_else(|e| panic!("create challenge {id}: {e}"))
    }

    pub async fn create_challenge_with(
        &self,
        id: &str,
        modify: impl FnOnce(&mut NewChallenge),
    ) -> Challenge {
        let mut new = self.new_challenge(id);
        modify(&mut new);
        self.challenges
            .create(new, &self.cancel)
            .await
            .unwrap_or_else(|e| panic!("create challenge {id}: {e}"))
    }
}
