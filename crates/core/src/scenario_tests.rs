// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn parse_oci_reference() {
    let r = ScenarioRef::parse("oci://registry.example.com/scn/web:v1").unwrap();
    assert_eq!(r, ScenarioRef::Oci("registry.example.com/scn/web:v1".into()));
}

#[test]
fn parse_local_dir() {
    let r = ScenarioRef::parse("./fixtures/static").unwrap();
    assert_eq!(r, ScenarioRef::Dir(PathBuf::from("./fixtures/static")));
}

#[parameterized(
    empty = { "" },
    blank = { "   " },
    bare_scheme = { "oci://" },
)]
fn parse_rejects(raw: &str) {
    assert!(matches!(ScenarioRef::parse(raw), Err(ScenarioError::EmptyReference)));
}

#[test]
fn display_round_trips_oci_scheme() {
    let r = ScenarioRef::parse("oci://reg/name:tag").unwrap();
    assert_eq!(r.to_string(), "oci://reg/name:tag");
}

#[test]
fn descriptor_requires_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        read_descriptor(dir.path()),
        Err(ScenarioError::MissingDescriptor(_))
    ));
}

#[test]
fn descriptor_requires_name() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(DESCRIPTOR_FILE), "name: \"\"\nruntime: go\n").unwrap();
    assert!(matches!(read_descriptor(dir.path()), Err(ScenarioError::UnnamedProject)));
}

#[test]
fn descriptor_parses() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(DESCRIPTOR_FILE),
        "name: web-intro\nruntime: go\ndescription: demo challenge\n",
    )
    .unwrap();
    let d = read_descriptor(dir.path()).unwrap();
    assert_eq!(d.name, "web-intro");
    assert_eq!(d.description.as_deref(), Some("demo challenge"));
}

#[test]
fn descriptor_rejects_bad_yaml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(DESCRIPTOR_FILE), ": not yaml : [").unwrap();
    assert!(matches!(
        read_descriptor(dir.path()),
        Err(ScenarioError::InvalidDescriptor(_))
    ));
}
