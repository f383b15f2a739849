// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario references and the project descriptor.
//!
//! A scenario is an imperative infrastructure program. It is referenced
//! either by an OCI artifact (`oci://registry/name:tag`), by a local
//! directory, or as raw archive bytes attached to an API request.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Descriptor file every materialized scenario must carry.
pub const DESCRIPTOR_FILE: &str = "Pulumi.yaml";

/// Scheme prefix marking an OCI reference.
const OCI_SCHEME: &str = "oci://";

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("empty scenario reference")]
    EmptyReference,

    #[error("scenario has no {DESCRIPTOR_FILE}: {}", .0.display())]
    MissingDescriptor(PathBuf),

    #[error("invalid {DESCRIPTOR_FILE}: {0}")]
    InvalidDescriptor(#[from] serde_yaml::Error),

    #[error("{DESCRIPTOR_FILE} has an empty project name")]
    UnnamedProject,

    #[error("IO error reading scenario: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a scenario comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioRef {
    /// OCI artifact reference, scheme stripped (`registry/name:tag[@digest]`).
    Oci(String),
    /// Local directory, used read-only.
    Dir(PathBuf),
    /// Archive bytes supplied inline (tar.gz), e.g. from an upload.
    Archive { name: String, bytes: Vec<u8> },
}

impl ScenarioRef {
    /// Parse a challenge `scenario` string into a reference.
    pub fn parse(raw: &str) -> Result<Self, ScenarioError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ScenarioError::EmptyReference);
        }
        match raw.strip_prefix(OCI_SCHEME) {
            Some(rest) if !rest.is_empty() => Ok(Self::Oci(rest.to_string())),
            Some(_) => Err(ScenarioError::EmptyReference),
            None => Ok(Self::Dir(PathBuf::from(raw))),
        }
    }
}

impl std::fmt::Display for ScenarioRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Oci(reference) => write!(f, "{OCI_SCHEME}{reference}"),
            Self::Dir(path) => write!(f, "{}", path.display()),
            Self::Archive { name, bytes } => write!(f, "archive:{name} ({} bytes)", bytes.len()),
        }
    }
}

/// Parsed project descriptor.
///
/// Only the fields the orchestrator needs; the engine reads the rest itself.
#[derive(Debug, Clone, Deserialize)]
pub struct Descriptor {
    pub name: String,
    #[serde(default)]
    pub runtime: Option<serde_yaml::Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Read and check the descriptor of a materialized scenario directory.
pub fn read_descriptor(dir: &Path) -> Result<Descriptor, ScenarioError> {
    let path = dir.join(DESCRIPTOR_FILE);
    if !path.is_file() {
        return Err(ScenarioError::MissingDescriptor(path));
    }
    let raw = std::fs::read_to_string(&path)?;
    let descriptor: Descriptor = serde_yaml::from_str(&raw)?;
    if descriptor.name.trim().is_empty() {
        return Err(ScenarioError::UnnamedProject);
    }
    Ok(descriptor)
}

#[cfg(test)]
#[path = "scenario_tests.rs"]
mod tests;
