// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable instance record.

use crate::Challenge;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One live materialization of a challenge for a given source.
///
/// Serialized as `chall/<challenge_id>/instance/<identity>/info.json`. The
/// engine's exported deployment lives in a sibling `state.json` blob so this
/// record stays small and human-inspectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Deterministic identity, `identity(challenge_id, source_id)`.
    pub identity: String,
    pub challenge_id: String,
    pub source_id: String,
    /// Creation instant.
    pub since: DateTime<Utc>,
    /// Latest renewal; equals `since` until the first renew.
    pub last_renew: DateTime<Utc>,
    /// Scheduled expiry, when the challenge defines one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    /// Connection string produced by the scenario.
    #[serde(default)]
    pub connection_info: String,
    /// Flags produced by the scenario, in order.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Per-instance config overrides, merged over the challenge `additional`.
    #[serde(default)]
    pub additional: BTreeMap<String, String>,
    /// Set when a teardown failed partway; the janitor retries such
    /// instances on every tick regardless of `until`.
    #[serde(default)]
    pub needs_cleanup: bool,
}

impl Instance {
    /// True once the scheduled expiry has passed.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        self.until.is_some_and(|until| until <= now)
    }

    /// Scenario config map: challenge `additional` overlaid with the
    /// per-instance overrides (instance wins on collision).
    pub fn merged_additional(&self, challenge: &Challenge) -> BTreeMap<String, String> {
        let mut merged = challenge.additional.clone();
        for (k, v) in &self.additional {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
