// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake engine for tests: records every call, serves scripted outputs and
//! failures, and tracks which identities are currently deployed.

use crate::outputs::Outputs;
use crate::{EngineError, ScenarioEngine, Stack, StackConfig};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Load { dir: PathBuf, identity: String },
    SetConfig { identity: String, config: StackConfig },
    Preview { identity: String },
    Up { identity: String },
    Down { identity: String },
    Export { identity: String },
    Import { identity: String, state: Vec<u8> },
}

/// Scripted failure for one operation kind.
#[derive(Debug, Clone)]
pub enum Fail {
    Scenario(String),
    Deadline,
}

impl Fail {
    fn into_error(self, op: &'static str) -> EngineError {
        match self {
            Self::Scenario(stderr) => EngineError::Scenario { op, stderr },
            Self::Deadline => {
                EngineError::DeadlineExceeded { op, timeout: Duration::from_secs(120) }
            }
        }
    }
}

struct Behavior {
    connection_info: String,
    flags: Vec<String>,
    fail_preview: Option<Fail>,
    fail_up: Option<Fail>,
    fail_down: Option<Fail>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            connection_info: "nc 127.0.0.1:31000".to_string(),
            flags: vec!["FLAG{ok}".to_string()],
            fail_preview: None,
            fail_up: None,
            fail_down: None,
        }
    }
}

/// Scriptable in-memory engine.
#[derive(Clone, Default)]
pub struct FakeEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    behavior: Arc<Mutex<Behavior>>,
    /// Identities currently deployed (up and not yet down).
    live: Arc<Mutex<BTreeSet<String>>>,
    /// Identities with an engine call in flight; used to detect overlap.
    active: Arc<Mutex<BTreeSet<String>>>,
    overlap: Arc<Mutex<bool>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_outputs(&self, connection_info: &str, flags: &[&str]) {
        let mut behavior = self.behavior.lock();
        behavior.connection_info = connection_info.to_string();
        behavior.flags = flags.iter().map(|s| s.to_string()).collect();
    }

    pub fn fail_preview(&self, fail: Fail) {
        self.behavior.lock().fail_preview = Some(fail);
    }

    pub fn fail_up(&self, fail: Fail) {
        self.behavior.lock().fail_up = Some(fail);
    }

    pub fn fail_down(&self, fail: Fail) {
        self.behavior.lock().fail_down = Some(fail);
    }

    pub fn clear_failures(&self) {
        let mut behavior = self.behavior.lock();
        behavior.fail_preview = None;
        behavior.fail_up = None;
        behavior.fail_down = None;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Identities currently deployed.
    pub fn live(&self) -> Vec<String> {
        self.live.lock().iter().cloned().collect()
    }

    /// Last config set for an identity, if any.
    pub fn config_for(&self, identity: &str) -> Option<StackConfig> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find_map(|call| match call {
                EngineCall::SetConfig { identity: id, config } if id == identity => {
                    Some(config.clone())
                }
                _ => None,
            })
    }

    /// True if two engine calls for the same identity ever overlapped.
    pub fn overlap_detected(&self) -> bool {
        *self.overlap.lock()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }

    /// Guard one engine call, flagging same-identity overlap.
    async fn enter(&self, identity: &str) -> ActiveGuard {
        if !self.active.lock().insert(identity.to_string()) {
            *self.overlap.lock() = true;
        }
        // Widen the race window so overlapping callers actually collide.
        tokio::time::sleep(Duration::from_millis(2)).await;
        ActiveGuard { active: Arc::clone(&self.active), identity: identity.to_string() }
    }
}

struct ActiveGuard {
    active: Arc<Mutex<BTreeSet<String>>>,
    identity: String,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.lock().remove(&self.identity);
    }
}

#[async_trait]
impl ScenarioEngine for FakeEngine {
    async fn load(
        &self,
        scenario_dir: &Path,
        identity: &str,
    ) -> Result<Box<dyn Stack>, EngineError> {
        self.record(EngineCall::Load {
            dir: scenario_dir.to_path_buf(),
            identity: identity.to_string(),
        });
        Ok(Box::new(FakeStack { engine: self.clone(), identity: identity.to_string() }))
    }
}

struct FakeStack {
    engine: FakeEngine,
    identity: String,
}

#[async_trait]
impl Stack for FakeStack {
    async fn set_config(&mut self, config: &StackConfig) -> Result<(), EngineError> {
        self.engine.record(EngineCall::SetConfig {
            identity: self.identity.clone(),
            config: config.clone(),
        });
        Ok(())
    }

    async fn preview(&mut self) -> Result<(), EngineError> {
        let _active = self.engine.enter(&self.identity).await;
        self.engine.record(EngineCall::Preview { identity: self.identity.clone() });
        if let Some(fail) = self.engine.behavior.lock().fail_preview.clone() {
            return Err(fail.into_error("preview"));
        }
        Ok(())
    }

    async fn up(&mut self) -> Result<Outputs, EngineError> {
        let _active = self.engine.enter(&self.identity).await;
        self.engine.record(EngineCall::Up { identity: self.identity.clone() });
        if let Some(fail) = self.engine.behavior.lock().fail_up.clone() {
            return Err(fail.into_error("up"));
        }
        self.engine.live.lock().insert(self.identity.clone());
        let behavior = self.engine.behavior.lock();
        Ok(Outputs {
            connection_info: behavior.connection_info.clone(),
            flags: behavior.flags.clone(),
        })
    }

    async fn down(&mut self) -> Result<(), EngineError> {
        let _active = self.engine.enter(&self.identity).await;
        self.engine.record(EngineCall::Down { identity: self.identity.clone() });
        if let Some(fail) = self.engine.behavior.lock().fail_down.clone() {
            return Err(fail.into_error("down"));
        }
        self.engine.live.lock().remove(&self.identity);
        Ok(())
    }

    async fn export(&mut self) -> Result<Vec<u8>, EngineError> {
        self.engine.record(EngineCall::Export { identity: self.identity.clone() });
        Ok(format!(r#"{{"deployment":"{}"}}"#, self.identity).into_bytes())
    }

    async fn import(&mut self, state: &[u8]) -> Result<(), EngineError> {
        self.engine.record(EngineCall::Import {
            identity: self.identity.clone(),
            state: state.to_vec(),
        });
        Ok(())
    }
}
