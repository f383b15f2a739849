// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario engine adapter.
//!
//! A narrow contract over an imperative IaC engine: load a stack from a
//! scenario working directory, configure it, preview/up/down it, and
//! export/import its serialized deployment. The managers only ever talk to
//! the [`ScenarioEngine`]/[`Stack`] traits; the Pulumi CLI implementation
//! lives in [`pulumi`], and tests use the fake in [`fake`].

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod outputs;
pub mod pulumi;
mod subprocess;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use outputs::Outputs;
pub use pulumi::PulumiEngine;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation outlived the configured engine deadline.
    #[error("{op} timed out after {}s", .timeout.as_secs())]
    DeadlineExceeded { op: &'static str, timeout: Duration },

    /// The scenario program itself failed (compile error, bad resource
    /// definition). Attributable to the challenge author.
    #[error("scenario failed during {op}: {stderr}")]
    Scenario { op: &'static str, stderr: String },

    /// The scenario ran but produced outputs violating the contract.
    #[error("invalid scenario output: {0}")]
    InvalidOutput(String),

    /// The engine could not run at all, or failed internally.
    #[error("engine failure during {op}: {message}")]
    Internal { op: &'static str, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration handed to a stack before preview/up.
///
/// Keys land in the scenario's config namespace under the names the
/// scenario contract fixes: `identity`, `challenge_id`,
/// `image_pull_secrets` (JSON list), `additional` (JSON map).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackConfig {
    pub identity: String,
    pub challenge_id: String,
    pub image_pull_secrets: Vec<String>,
    /// Challenge-level `additional` merged with per-instance overrides
    /// (instance wins); merging happens before this struct is built.
    pub additional: BTreeMap<String, String>,
}

impl StackConfig {
    /// Flatten into `(key, value)` config pairs for the engine.
    pub fn pairs(&self) -> Result<Vec<(String, String)>, EngineError> {
        let secrets = serde_json::to_string(&self.image_pull_secrets)
            .map_err(|e| EngineError::InvalidOutput(format!("encode image_pull_secrets: {e}")))?;
        let additional = serde_json::to_string(&self.additional)
            .map_err(|e| EngineError::InvalidOutput(format!("encode additional: {e}")))?;
        Ok(vec![
            ("identity".to_string(), self.identity.clone()),
            ("challenge_id".to_string(), self.challenge_id.clone()),
            ("image_pull_secrets".to_string(), secrets),
            ("additional".to_string(), additional),
        ])
    }
}

/// An opened stack: the engine's named working state for one identity.
#[async_trait]
pub trait Stack: Send + Sync {
    async fn set_config(&mut self, config: &StackConfig) -> Result<(), EngineError>;

    /// Dry-run: compile and plan without touching infrastructure.
    async fn preview(&mut self) -> Result<(), EngineError>;

    /// Create or converge real resources; returns the scenario outputs.
    async fn up(&mut self) -> Result<Outputs, EngineError>;

    /// Destroy all resources. The stack stays usable for a later `up`.
    async fn down(&mut self) -> Result<(), EngineError>;

    /// Serialize the deployment so another process can restore it.
    async fn export(&mut self) -> Result<Vec<u8>, EngineError>;

    /// Restore a deployment exported earlier, before `up` or `down` on a
    /// recovered instance.
    async fn import(&mut self, state: &[u8]) -> Result<(), EngineError>;
}

/// The engine adapter: opens stacks in scenario working directories.
#[async_trait]
pub trait ScenarioEngine: Send + Sync {
    /// Open (or create) the stack named by `identity` in `scenario_dir`.
    async fn load(
        &self,
        scenario_dir: &Path,
        identity: &str,
    ) -> Result<Box<dyn Stack>, EngineError>;

    /// Check a scenario without deploying: random identity, config, preview.
    ///
    /// Used at challenge registration and on scenario updates.
    async fn validate(&self, scenario_dir: &Path, challenge_id: &str) -> Result<(), EngineError> {
        let identity = chall_core::random_identity();
        let mut stack = self.load(scenario_dir, &identity).await?;
        stack
            .set_config(&StackConfig {
                identity,
                challenge_id: challenge_id.to_string(),
                ..StackConfig::default()
            })
            .await?;
        stack.preview().await
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
