// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashSet;
use yare::parameterized;

#[test]
fn identity_is_deterministic() {
    assert_eq!(identity("c1", "u1"), identity("c1", "u1"));
}

#[test]
fn identity_has_fixed_length() {
    assert_eq!(identity("c1", "u1").len(), IDENTITY_LEN);
    assert_eq!(identity("", "").len(), IDENTITY_LEN);
}

#[test]
fn identity_is_lowercase_hex() {
    let id = identity("some-challenge", "some-source");
    assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[parameterized(
    swapped = { "c1", "u1", "u1", "c1" },
    concat_shift = { "ab", "c", "a", "bc" },
    empty_left = { "", "x", "x", "" },
)]
fn identity_separates_parts(c1: &str, s1: &str, c2: &str, s2: &str) {
    assert_ne!(identity(c1, s1), identity(c2, s2));
}

#[test]
fn identity_spread_over_sources() {
    let mut seen = HashSet::new();
    for i in 0..1000 {
        assert!(seen.insert(identity("c1", &format!("user-{i}"))));
    }
}

#[test]
fn random_identity_shape() {
    let id = random_identity();
    assert_eq!(id.len(), IDENTITY_LEN);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(random_identity(), random_identity());
}
