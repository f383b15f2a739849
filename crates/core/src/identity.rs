// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic per-instance identities.
//!
//! The identity names the instance record on disk and the engine stack, and
//! is handed to the scenario as its `identity` config key, so it must be
//! stable across processes and filesystem/DNS safe.

use sha2::{Digest, Sha256};

/// Length of a derived identity in hex characters.
pub const IDENTITY_LEN: usize = 16;

/// Separator between the hashed parts.
///
/// Required so that ("ab", "c") and ("a", "bc") hash differently.
const SEP: u8 = 0x1f;

/// Derive the identity for one `(challenge_id, source_id)` pair.
///
/// Truncated sha256 over `challenge_id ‖ SEP ‖ source_id`. Collisions are
/// negligible at 64 bits for the instance counts a deployment sees.
pub fn identity(challenge_id: &str, source_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(challenge_id.as_bytes());
    hasher.update([SEP]);
    hasher.update(source_id.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..IDENTITY_LEN].to_string()
}

/// Alphabet for random identities: lowercase hex, matching derived ones.
const ALPHABET: [char; 16] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f'];

/// Generate a random identity for scenario validation runs.
///
/// Same shape as [`identity`] output so the engine treats validation stacks
/// like any other stack.
pub fn random_identity() -> String {
    nanoid::nanoid!(IDENTITY_LEN, &ALPHABET)
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
