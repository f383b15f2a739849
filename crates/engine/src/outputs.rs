// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario output contract.
//!
//! A scenario must export `connection_info` (string). Flags come as either
//! `flag` (single string, legacy) or `flags` (list of strings); both are
//! accepted, single flag first when both appear.

use crate::EngineError;
use serde_json::Value;
use tracing::warn;

/// Parsed scenario outputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs {
    pub connection_info: String,
    pub flags: Vec<String>,
}

/// Parse the engine's output map.
pub fn parse_outputs(value: &Value) -> Result<Outputs, EngineError> {
    let map = value
        .as_object()
        .ok_or_else(|| EngineError::InvalidOutput("outputs are not an object".to_string()))?;

    let connection_info = match map.get("connection_info") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(EngineError::InvalidOutput(format!(
                "connection_info must be a string, got {other}"
            )))
        }
        None => return Err(EngineError::InvalidOutput("missing connection_info".to_string())),
    };

    let mut flags = Vec::new();
    match map.get("flag") {
        Some(Value::String(s)) => {
            warn!("scenario exports deprecated `flag` output; prefer `flags`");
            flags.push(s.clone());
        }
        Some(other) => {
            return Err(EngineError::InvalidOutput(format!("flag must be a string, got {other}")))
        }
        None => {}
    }
    if let Some(value) = map.get("flags") {
        let list = value
            .as_array()
            .ok_or_else(|| EngineError::InvalidOutput(format!("flags must be a list, got {value}")))?;
        for entry in list {
            match entry {
                Value::String(s) => flags.push(s.clone()),
                other => {
                    return Err(EngineError::InvalidOutput(format!(
                        "flags entries must be strings, got {other}"
                    )))
                }
            }
        }
    }

    Ok(Outputs { connection_info, flags })
}

#[cfg(test)]
#[path = "outputs_tests.rs"]
mod tests;
