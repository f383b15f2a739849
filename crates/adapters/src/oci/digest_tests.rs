// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn fill(dir: &Path, entries: &[(&str, &str)]) {
    for (path, contents) in entries {
        let full = dir.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, contents).unwrap();
    }
}

#[test]
fn digest_is_stable() {
    let dir = tempdir().unwrap();
    fill(dir.path(), &[("Pulumi.yaml", "name: scn\n"), ("src/main.go", "package main\n")]);
    assert_eq!(dir_digest(dir.path()).unwrap(), dir_digest(dir.path()).unwrap());
}

#[test]
fn digest_ignores_location() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    fill(a.path(), &[("Pulumi.yaml", "name: scn\n")]);
    fill(b.path(), &[("Pulumi.yaml", "name: scn\n")]);
    assert_eq!(dir_digest(a.path()).unwrap(), dir_digest(b.path()).unwrap());
}

#[test]
fn digest_sees_content_changes() {
    let dir = tempdir().unwrap();
    fill(dir.path(), &[("Pulumi.yaml", "name: scn\n")]);
    let before = dir_digest(dir.path()).unwrap();
    fill(dir.path(), &[("Pulumi.yaml", "name: other\n")]);
    assert_ne!(before, dir_digest(dir.path()).unwrap());
}

#[test]
fn digest_sees_renames() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    fill(a.path(), &[("one.txt", "x")]);
    fill(b.path(), &[("two.txt", "x")]);
    assert_ne!(dir_digest(a.path()).unwrap(), dir_digest(b.path()).unwrap());
}

#[test]
fn digest_is_hex() {
    let dir = tempdir().unwrap();
    fill(dir.path(), &[("f", "x")]);
    let digest = dir_digest(dir.path()).unwrap();
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
}
