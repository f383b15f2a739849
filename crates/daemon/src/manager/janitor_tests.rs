// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::manager::test_support::Harness;
use super::*;
use chall_engine::fake::Fail;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn janitor(h: &Harness) -> Janitor<chall_core::FakeClock> {
    Janitor::new(Arc::clone(&h.deps), Schedule::Ticker(Duration::from_secs(1)))
}

#[tokio::test]
async fn expired_instance_is_swept() {
    let h = Harness::new();
    h.create_challenge_with("c1", |c| c.timeout = Some(1)).await;
    let instance = h.instances.create("c1", "u1", BTreeMap::new(), &h.cancel).await.unwrap();

    h.clock.advance(Duration::from_secs(2));
    let summary = janitor(&h).tick(&h.cancel).await;

    assert_eq!(summary, TickSummary { attempted: 1, deleted: 1, failed: 0 });
    assert!(h.instances.read_by_identity("c1", &instance.identity).is_err());
    assert!(h.engine.live().is_empty());
}

#[tokio::test]
async fn unexpired_instances_are_left_alone() {
    let h = Harness::new();
    h.create_challenge_with("c1", |c| c.timeout = Some(3600)).await;
    let instance = h.instances.create("c1", "u1", BTreeMap::new(), &h.cancel).await.unwrap();

    h.clock.advance(Duration::from_secs(10));
    let summary = janitor(&h).tick(&h.cancel).await;

    assert_eq!(summary, TickSummary::default());
    assert!(h.instances.read_by_identity("c1", &instance.identity).is_ok());
}

#[tokio::test]
async fn instances_without_until_never_expire() {
    let h = Harness::new();
    h.create_challenge("c1").await;
    h.instances.create("c1", "u1", BTreeMap::new(), &h.cancel).await.unwrap();

    h.clock.advance(Duration::from_secs(365 * 24 * 3600));
    let summary = janitor(&h).tick(&h.cancel).await;
    assert_eq!(summary.attempted, 0);
}

#[tokio::test]
async fn failed_sweep_retries_on_next_tick() {
    let h = Harness::new();
    h.create_challenge_with("c1", |c| c.timeout = Some(1)).await;
    let instance = h.instances.create("c1", "u1", BTreeMap::new(), &h.cancel).await.unwrap();
    h.clock.advance(Duration::from_secs(2));

    h.engine.fail_down(Fail::Scenario("stuck".into()));
    let janitor = janitor(&h);
    let summary = janitor.tick(&h.cancel).await;
    assert_eq!(summary, TickSummary { attempted: 1, deleted: 0, failed: 1 });
    assert!(h.instances.read_by_identity("c1", &instance.identity).is_ok());

    // Second tick after the failure clears.
    h.engine.clear_failures();
    let summary = janitor.tick(&h.cancel).await;
    assert_eq!(summary, TickSummary { attempted: 1, deleted: 1, failed: 0 });
    assert!(h.instances.read_by_identity("c1", &instance.identity).is_err());
}

#[tokio::test]
async fn cleanup_flagged_instances_are_swept_before_expiry() {
    let h = Harness::new();
    h.create_challenge_with("c1", |c| c.timeout = Some(3600)).await;
    let instance = h.instances.create("c1", "u1", BTreeMap::new(), &h.cancel).await.unwrap();

    // A client delete fails partway and flags the record.
    h.engine.fail_down(Fail::Scenario("stuck".into()));
    assert!(h.instances.delete("c1", "u1", &h.cancel).await.is_err());
    h.engine.clear_failures();

    // Not expired, but flagged: the janitor finishes the teardown.
    let summary = janitor(&h).tick(&h.cancel).await;
    assert_eq!(summary, TickSummary { attempted: 1, deleted: 1, failed: 0 });
    assert!(h.instances.read_by_identity("c1", &instance.identity).is_err());
}

#[tokio::test]
async fn sweeps_across_challenges() {
    let h = Harness::new();
    h.create_challenge_with("a", |c| c.timeout = Some(1)).await;
    h.create_challenge_with("b", |c| c.timeout = Some(1)).await;
    h.instances.create("a", "u1", BTreeMap::new(), &h.cancel).await.unwrap();
    h.instances.create("b", "u1", BTreeMap::new(), &h.cancel).await.unwrap();

    h.clock.advance(Duration::from_secs(2));
    let summary = janitor(&h).tick(&h.cancel).await;
    assert_eq!(summary.deleted, 2);
    assert!(h.engine.live().is_empty());
}

#[tokio::test]
async fn run_stops_on_cancel() {
    let h = Harness::new();
    let janitor = janitor(&h);
    let cancel = tokio_util::sync::CancellationToken::new();
    let task = tokio::spawn(janitor.run(cancel.clone()));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
}

#[test]
fn cron_schedule_parses() {
    let config = crate::env::JanitorSchedule::Cron("*/30 * * * * *".into());
    assert!(matches!(Schedule::from_config(&config), Ok(Schedule::Cron(_))));

    let bad = crate::env::JanitorSchedule::Cron("not a cron line".into());
    assert!(Schedule::from_config(&bad).is_err());
}
