// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::sync::Arc;
use tempfile::tempdir;

fn scenario_archive(project: &str) -> Vec<u8> {
    let mut builder =
        tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let descriptor = format!("name: {project}\nruntime: go\n");
    let mut header = tar::Header::new_gnu();
    header.set_size(descriptor.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, "Pulumi.yaml", descriptor.as_bytes()).unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

fn archive_ref(project: &str) -> ScenarioRef {
    ScenarioRef::Archive { name: project.to_string(), bytes: scenario_archive(project) }
}

#[tokio::test]
async fn archive_materializes_into_cache() {
    let cache = tempdir().unwrap();
    let loader = ScenarioLoader::new(cache.path(), OciOpts::default());

    let m = loader.materialize(&archive_ref("web-intro")).await.unwrap();
    assert!(m.dir.starts_with(cache.path()));
    assert!(m.dir.join("Pulumi.yaml").is_file());
    assert!(!m.hash.is_empty());
}

#[tokio::test]
async fn repeated_materialization_hits_cache() {
    let cache = tempdir().unwrap();
    let loader = ScenarioLoader::new(cache.path(), OciOpts::default());
    let scenario = archive_ref("web-intro");

    let first = loader.materialize(&scenario).await.unwrap();
    let second = loader.materialize(&scenario).await.unwrap();
    assert_eq!(first.dir, second.dir);
    assert_eq!(loader.fetch_count(), 1);
}

#[tokio::test]
async fn concurrent_callers_single_flight() {
    let cache = tempdir().unwrap();
    let loader = Arc::new(ScenarioLoader::new(cache.path(), OciOpts::default()));
    let scenario = archive_ref("web-intro");

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let loader = Arc::clone(&loader);
        let scenario = scenario.clone();
        tasks.push(tokio::spawn(async move { loader.materialize(&scenario).await.unwrap() }));
    }

    let mut dirs = Vec::new();
    for task in tasks {
        dirs.push(task.await.unwrap().dir);
    }
    dirs.dedup();
    assert_eq!(dirs.len(), 1);
    assert_eq!(loader.fetch_count(), 1);
}

#[tokio::test]
async fn different_content_gets_different_entries() {
    let cache = tempdir().unwrap();
    let loader = ScenarioLoader::new(cache.path(), OciOpts::default());

    let a = loader.materialize(&archive_ref("alpha")).await.unwrap();
    let b = loader.materialize(&archive_ref("beta")).await.unwrap();
    assert_ne!(a.dir, b.dir);
    assert_ne!(a.hash, b.hash);
    assert_eq!(loader.fetch_count(), 2);
}

#[tokio::test]
async fn invalidate_forces_refetch() {
    let cache = tempdir().unwrap();
    let loader = ScenarioLoader::new(cache.path(), OciOpts::default());
    let scenario = archive_ref("web-intro");

    let m = loader.materialize(&scenario).await.unwrap();
    loader.invalidate(&m.hash).await.unwrap();
    assert!(!m.dir.exists());

    loader.materialize(&scenario).await.unwrap();
    assert_eq!(loader.fetch_count(), 2);
}

#[tokio::test]
async fn archive_without_descriptor_is_malformed() {
    let cache = tempdir().unwrap();
    let loader = ScenarioLoader::new(cache.path(), OciOpts::default());

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(2);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, "other.txt", &b"hi"[..]).unwrap();
    let bytes = builder.into_inner().unwrap().finish().unwrap();

    let result = loader
        .materialize(&ScenarioRef::Archive { name: "bad".into(), bytes })
        .await;
    assert!(matches!(result, Err(OciError::Malformed(_))));
    // Nothing committed: a retry with fixed bytes would re-fetch.
    assert!(std::fs::read_dir(cache.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn dir_reference_used_in_place() {
    let cache = tempdir().unwrap();
    let scenario_dir = tempdir().unwrap();
    std::fs::write(scenario_dir.path().join("Pulumi.yaml"), "name: local\n").unwrap();

    let loader = ScenarioLoader::new(cache.path(), OciOpts::default());
    let m = loader
        .materialize(&ScenarioRef::Dir(scenario_dir.path().to_path_buf()))
        .await
        .unwrap();
    assert_eq!(m.dir, scenario_dir.path());
    assert_eq!(loader.fetch_count(), 0);
}

#[tokio::test]
async fn dir_digest_memoized_until_invalidated() {
    let cache = tempdir().unwrap();
    let scenario_dir = tempdir().unwrap();
    std::fs::write(scenario_dir.path().join("Pulumi.yaml"), "name: local\n").unwrap();

    let loader = ScenarioLoader::new(cache.path(), OciOpts::default());
    let scenario = ScenarioRef::Dir(scenario_dir.path().to_path_buf());
    let first = loader.materialize(&scenario).await.unwrap();

    // Content changes are not observed until the entry is invalidated.
    std::fs::write(scenario_dir.path().join("Pulumi.yaml"), "name: local-v2\n").unwrap();
    let second = loader.materialize(&scenario).await.unwrap();
    assert_eq!(second.hash, first.hash);

    loader.invalidate(&first.hash).await.unwrap();
    let third = loader.materialize(&scenario).await.unwrap();
    assert_ne!(third.hash, first.hash);
}

#[tokio::test]
async fn dir_reference_requires_descriptor() {
    let cache = tempdir().unwrap();
    let scenario_dir = tempdir().unwrap();
    let loader = ScenarioLoader::new(cache.path(), OciOpts::default());
    let result = loader.materialize(&ScenarioRef::Dir(scenario_dir.path().to_path_buf())).await;
    assert!(matches!(result, Err(OciError::Scenario(_))));
}
