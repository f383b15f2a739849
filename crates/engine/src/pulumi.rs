// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pulumi CLI engine.
//!
//! Each instance's scenario working directory doubles as a self-contained
//! Pulumi project: the file backend is rooted there, the stack is named by
//! the instance identity, and no global Pulumi state is touched. Exporting
//! the stack therefore captures everything needed to update or destroy the
//! deployment from another process.

use crate::outputs::{parse_outputs, Outputs};
use crate::subprocess::{check_success, run_with_timeout};
use crate::{EngineError, ScenarioEngine, Stack, StackConfig};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

/// Engine adapter driving the `pulumi` CLI.
#[derive(Debug, Clone)]
pub struct PulumiEngine {
    /// Per-operation deadline; `None` disables enforcement.
    timeout: Option<Duration>,
}

impl PulumiEngine {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ScenarioEngine for PulumiEngine {
    async fn load(
        &self,
        scenario_dir: &Path,
        identity: &str,
    ) -> Result<Box<dyn Stack>, EngineError> {
        chall_core::read_descriptor(scenario_dir)
            .map_err(|e| EngineError::Internal { op: "load", message: e.to_string() })?;

        let stack = PulumiStack {
            workdir: scenario_dir.to_path_buf(),
            identity: identity.to_string(),
            timeout: self.timeout,
        };
        let output = run_with_timeout(
            stack.command(["stack", "select", "--create", &stack.identity]),
            stack.timeout,
            "load",
        )
        .await?;
        check_success("load", output)?;
        Ok(Box::new(stack))
    }
}

struct PulumiStack {
    workdir: PathBuf,
    identity: String,
    timeout: Option<Duration>,
}

impl PulumiStack {
    /// Base `pulumi` invocation: workdir-rooted file backend, no
    /// passphrase, never interactive.
    fn command<const N: usize>(&self, args: [&str; N]) -> Command {
        let mut cmd = Command::new("pulumi");
        cmd.args(args)
            .arg("--non-interactive")
            .current_dir(&self.workdir)
            .env("PULUMI_BACKEND_URL", format!("file://{}", self.workdir.display()))
            .env("PULUMI_CONFIG_PASSPHRASE", "")
            .env("PULUMI_SKIP_UPDATE_CHECK", "true");
        cmd
    }

    async fn run(&self, op: &'static str, cmd: Command) -> Result<std::process::Output, EngineError> {
        let output = run_with_timeout(cmd, self.timeout, op).await?;
        check_success(op, output)
    }
}

#[async_trait]
impl Stack for PulumiStack {
    async fn set_config(&mut self, config: &StackConfig) -> Result<(), EngineError> {
        for (key, value) in config.pairs()? {
            self.run(
                "set_config",
                self.command([
                    "config",
                    "set",
                    "--stack",
                    &self.identity,
                    "--plaintext",
                    &key,
                    &value,
                ]),
            )
            .await?;
        }
        Ok(())
    }

    async fn preview(&mut self) -> Result<(), EngineError> {
        self.run("preview", self.command(["preview", "--stack", &self.identity])).await?;
        Ok(())
    }

    async fn up(&mut self) -> Result<Outputs, EngineError> {
        info!(identity = %self.identity, "pulumi up");
        self.run(
            "up",
            self.command(["up", "--yes", "--skip-preview", "--stack", &self.identity]),
        )
        .await?;

        let output = self
            .run(
                "up",
                self.command(["stack", "output", "--json", "--show-secrets", "--stack", &self.identity]),
            )
            .await?;
        let value: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| EngineError::InvalidOutput(format!("outputs are not JSON: {e}")))?;
        parse_outputs(&value)
    }

    async fn down(&mut self) -> Result<(), EngineError> {
        info!(identity = %self.identity, "pulumi destroy");
        self.run("down", self.command(["destroy", "--yes", "--stack", &self.identity])).await?;
        Ok(())
    }

    async fn export(&mut self) -> Result<Vec<u8>, EngineError> {
        let output = self
            .run("export", self.command(["stack", "export", "--stack", &self.identity]))
            .await?;
        Ok(output.stdout)
    }

    async fn import(&mut self, state: &[u8]) -> Result<(), EngineError> {
        // `stack import` reads from a file; keep it inside the workdir so
        // concurrent stacks in other workdirs can't collide.
        let file_name = format!(".import-{}.json", self.identity);
        let path = self.workdir.join(&file_name);
        tokio::fs::write(&path, state).await?;
        let result = self
            .run(
                "import",
                self.command(["stack", "import", "--file", &file_name, "--stack", &self.identity]),
            )
            .await;
        let _ = tokio::fs::remove_file(&path).await;
        result?;
        Ok(())
    }
}
