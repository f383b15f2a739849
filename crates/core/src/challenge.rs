// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable challenge record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A registered challenge: a scenario plus instance policy.
///
/// Serialized as `chall/<id>/info.json`. Readers tolerate unknown fields so
/// the schema can grow without breaking older records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    /// Unique, non-empty challenge id (chosen by the operator).
    pub id: String,
    /// Scenario reference as registered: an `oci://` reference or a local
    /// directory path.
    pub scenario: String,
    /// Content digest of the scenario at registration time; doubles as the
    /// OCI cache key.
    pub hash: String,
    /// Default expiry instant inherited by new instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    /// Default instance lifetime in seconds, inherited by new instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Advisory lower bound on instance count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    /// Upper bound on instance count, enforced at instance creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    /// Extra config threaded into the scenario; instances may override
    /// individual keys.
    #[serde(default)]
    pub additional: BTreeMap<String, String>,
    /// Pull secrets handed to the scenario, in order.
    #[serde(default)]
    pub image_pull_secrets: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Challenge {
    /// Expiry for an instance created at `since`: the sooner of
    /// `since + timeout` and the challenge-wide `until`, when either is set.
    pub fn instance_until(&self, since: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let by_timeout = self.timeout.map(|secs| since + chrono::Duration::seconds(secs as i64));
        match (by_timeout, self.until) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
#[path = "challenge_tests.rs"]
mod tests;
