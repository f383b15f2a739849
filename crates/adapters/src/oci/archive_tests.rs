// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::tempdir;

fn tar_with(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        let name = header.as_old_mut().name.as_mut();
        let bytes = path.as_bytes();
        name[..bytes.len()].copy_from_slice(bytes);
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, contents.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap()
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    std::io::Write::write_all(&mut encoder, bytes).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn unpacks_plain_tar() {
    let dst = tempdir().unwrap();
    let tar = tar_with(&[("Pulumi.yaml", "name: scn\n"), ("main.go", "package main\n")]);
    unpack_layer(&tar, dst.path()).unwrap();
    assert_eq!(std::fs::read_to_string(dst.path().join("Pulumi.yaml")).unwrap(), "name: scn\n");
    assert_eq!(std::fs::read_to_string(dst.path().join("main.go")).unwrap(), "package main\n");
}

#[test]
fn unpacks_gzipped_tar() {
    let dst = tempdir().unwrap();
    let tgz = gzip(&tar_with(&[("sub/file.txt", "hello")]));
    unpack_layer(&tgz, dst.path()).unwrap();
    assert_eq!(std::fs::read_to_string(dst.path().join("sub/file.txt")).unwrap(), "hello");
}

#[test]
fn rejects_garbage() {
    let dst = tempdir().unwrap();
    assert!(matches!(
        unpack_layer(b"definitely not a tarball", dst.path()),
        Err(OciError::Malformed(_))
    ));
}

#[test]
fn refuses_escaping_entries() {
    let dst = tempdir().unwrap();
    let evil = tar_with(&[("../escape.txt", "outside")]);
    // tar's unpack refuses parent-relative paths.
    let result = unpack_layer(&evil, dst.path());
    assert!(result.is_err());
    assert!(!dst.path().join("../escape.txt").exists());
}
