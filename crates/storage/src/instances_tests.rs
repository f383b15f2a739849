// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::STATE_DIR;
use chall_core::{identity, Instance};
use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;
use tempfile::tempdir;

fn instance(challenge_id: &str, source_id: &str) -> Instance {
    let now = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
    Instance {
        identity: identity(challenge_id, source_id),
        challenge_id: challenge_id.into(),
        source_id: source_id.into(),
        since: now,
        last_renew: now,
        until: None,
        connection_info: "nc 127.0.0.1:31000".into(),
        flags: vec!["FLAG{ok}".into()],
        additional: BTreeMap::new(),
        needs_cleanup: false,
    }
}

#[test]
fn write_then_read_round_trips() {
    let dir = tempdir().unwrap();
    let store = FsStore::new(dir.path());
    let i = instance("c1", "u1");
    store.write_instance(&i).unwrap();
    assert_eq!(store.read_instance("c1", &i.identity).unwrap(), i);
}

#[test]
fn read_missing_is_not_found() {
    let dir = tempdir().unwrap();
    let store = FsStore::new(dir.path());
    assert!(matches!(store.read_instance("c1", "deadbeef"), Err(StoreError::NotFound(_))));
}

#[test]
fn state_blob_round_trips() {
    let dir = tempdir().unwrap();
    let store = FsStore::new(dir.path());
    let i = instance("c1", "u1");
    store.write_instance(&i).unwrap();
    store.write_state("c1", &i.identity, br#"{"deployment":{"resources":[]}}"#).unwrap();
    assert_eq!(
        store.read_state("c1", &i.identity).unwrap(),
        br#"{"deployment":{"resources":[]}}"#.to_vec()
    );
}

#[test]
fn state_missing_is_not_found() {
    let dir = tempdir().unwrap();
    let store = FsStore::new(dir.path());
    assert!(matches!(store.read_state("c1", "deadbeef"), Err(StoreError::NotFound(_))));
}

#[test]
fn list_returns_identities_sorted() {
    let dir = tempdir().unwrap();
    let store = FsStore::new(dir.path());
    let a = instance("c1", "u1");
    let b = instance("c1", "u2");
    store.write_instance(&a).unwrap();
    store.write_instance(&b).unwrap();

    let mut expected = vec![a.identity.clone(), b.identity.clone()];
    expected.sort();
    assert_eq!(store.list_instances("c1").unwrap(), expected);
}

#[test]
fn list_is_scoped_to_challenge() {
    let dir = tempdir().unwrap();
    let store = FsStore::new(dir.path());
    store.write_instance(&instance("c1", "u1")).unwrap();
    store.write_instance(&instance("c2", "u1")).unwrap();
    assert_eq!(store.list_instances("c1").unwrap().len(), 1);
    assert_eq!(store.list_instances("c3").unwrap().len(), 0);
}

#[test]
fn remove_deletes_record_state_and_working_copy() {
    let dir = tempdir().unwrap();
    let store = FsStore::new(dir.path());
    let i = instance("c1", "u1");
    store.write_instance(&i).unwrap();
    store.write_state("c1", &i.identity, b"blob").unwrap();
    let scenario = store.scenario_dir("c1", &i.identity);
    std::fs::create_dir_all(&scenario).unwrap();
    std::fs::write(scenario.join("Pulumi.yaml"), "name: x\n").unwrap();

    store.remove_instance("c1", &i.identity).unwrap();
    assert!(!store.instance_dir("c1", &i.identity).exists());
    // Idempotent.
    store.remove_instance("c1", &i.identity).unwrap();
}

#[test]
fn scenario_dir_is_under_instance_dir() {
    let store = FsStore::new("/data");
    assert_eq!(
        store.scenario_dir("c1", "abcd"),
        store.instance_dir("c1", "abcd").join(STATE_DIR)
    );
}
