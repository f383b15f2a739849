// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine subprocess execution with enforced deadlines.
//!
//! The engine CLI can block indefinitely on cluster resources that never
//! materialize (an unallocated LoadBalancer IP, a pull that never
//! finishes), so every invocation runs under the configured deadline and
//! the child is killed when it expires.

use crate::EngineError;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr slice surfaced in error messages.
const STDERR_LIMIT: usize = 2048;

/// Run `cmd` to completion, enforcing `timeout` when set.
///
/// `kill_on_drop` tears the child down when the deadline fires or the
/// caller is cancelled mid-flight.
pub(crate) async fn run_with_timeout(
    mut cmd: Command,
    timeout: Option<Duration>,
    op: &'static str,
) -> Result<Output, EngineError> {
    cmd.stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let started = std::time::Instant::now();
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, cmd.output())
            .await
            .map_err(|_| EngineError::DeadlineExceeded { op, timeout: limit })?,
        None => cmd.output().await,
    }
    .map_err(|e| EngineError::Internal { op, message: format!("spawn failed: {e}") })?;

    debug!(op, elapsed_ms = started.elapsed().as_millis() as u64, status = ?output.status, "engine command finished");
    Ok(output)
}

/// Turn a non-zero exit into a scenario error carrying trimmed stderr.
pub(crate) fn check_success(op: &'static str, output: Output) -> Result<Output, EngineError> {
    if output.status.success() {
        return Ok(output);
    }
    Err(EngineError::Scenario { op, stderr: stderr_excerpt(&output) })
}

/// Stderr, trimmed and truncated for error messages.
pub(crate) fn stderr_excerpt(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.len() <= STDERR_LIMIT {
        return stderr.to_string();
    }
    let head: String = stderr.chars().take(STDERR_LIMIT).collect();
    format!("{head} [truncated, {} bytes total]", stderr.len())
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
