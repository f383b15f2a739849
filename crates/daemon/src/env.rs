// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use chall_adapters::OciOpts;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Daemon version reported by the info service.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?}: {reason}")]
    Invalid { var: &'static str, value: String, reason: String },
}

/// Janitor scheduling configuration.
#[derive(Debug, Clone)]
pub enum JanitorSchedule {
    /// Fixed interval between ticks.
    Ticker(Duration),
    /// Crontab expression deciding the wake-up moments.
    Cron(String),
}

/// Optional distributed lock backend.
#[derive(Debug, Clone)]
pub struct EtcdConfig {
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Daemon configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory of the persistent store.
    pub directory: PathBuf,
    /// OCI cache root.
    pub cache: PathBuf,
    /// gRPC bind address.
    pub addr: SocketAddr,
    /// Log filter, e.g. `info` or `chall_daemon=debug`.
    pub log_level: String,
    /// Engine per-operation deadline. `None` disables enforcement
    /// (not recommended).
    pub pulumi_timeout: Option<Duration>,
    /// Service name stamped on log lines.
    pub service_name: String,
    pub janitor: JanitorSchedule,
    pub etcd: Option<EtcdConfig>,
    pub oci: OciOpts,
}

impl Config {
    /// Load configuration from `CHALLD_*` environment variables, with
    /// defaults suitable for local development.
    pub fn load() -> Result<Self, ConfigError> {
        let directory = PathBuf::from(var_or("CHALLD_DIRECTORY", "./data"));
        let cache = std::env::var("CHALLD_CACHE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| directory.join("cache"));

        let addr_raw = var_or("CHALLD_ADDR", "0.0.0.0:8080");
        let addr: SocketAddr = addr_raw.parse().map_err(|e| ConfigError::Invalid {
            var: "CHALLD_ADDR",
            value: addr_raw.clone(),
            reason: format!("{e}"),
        })?;

        let janitor = match std::env::var("CHALLD_JANITOR_CRON") {
            Ok(expr) if !expr.is_empty() => JanitorSchedule::Cron(expr),
            _ => JanitorSchedule::Ticker(Duration::from_secs(parse_or(
                "CHALLD_JANITOR_INTERVAL",
                60,
            ))),
        };

        let etcd = std::env::var("CHALLD_ETCD_ENDPOINT").ok().filter(|s| !s.is_empty()).map(
            |endpoint| EtcdConfig {
                endpoint,
                username: non_empty_var("CHALLD_ETCD_USERNAME"),
                password: non_empty_var("CHALLD_ETCD_PASSWORD"),
            },
        );

        Ok(Self {
            directory,
            cache,
            addr,
            log_level: var_or("CHALLD_LOG_LEVEL", "info"),
            pulumi_timeout: pulumi_timeout(),
            service_name: var_or("CHALLD_SERVICE_NAME", "challd"),
            janitor,
            etcd,
            oci: OciOpts {
                insecure: parse_or("CHALLD_OCI_INSECURE", false),
                username: non_empty_var("CHALLD_OCI_USERNAME"),
                password: non_empty_var("CHALLD_OCI_PASSWORD"),
            },
        })
    }
}

/// Engine deadline: seconds, default 120, `0` disables.
fn pulumi_timeout() -> Option<Duration> {
    match parse_or("CHALLD_PULUMI_TIMEOUT", 120u64) {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    }
}

fn var_or(var: &str, default: &str) -> String {
    std::env::var(var).ok().filter(|s| !s.is_empty()).unwrap_or_else(|| default.to_string())
}

fn non_empty_var(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.is_empty())
}

fn parse_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
