// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tonic::Code;
use yare::parameterized;

fn code(err: ManagerError) -> Code {
    status_for(&err).code()
}

#[parameterized(
    invalid = { ManagerError::InvalidArgument("empty id".into()), Code::InvalidArgument },
    not_found = { ManagerError::NotFound("challenge c1".into()), Code::NotFound },
    already_exists = { ManagerError::AlreadyExists("challenge c1".into()), Code::AlreadyExists },
    precondition = { ManagerError::FailedPrecondition("no timeout".into()), Code::FailedPrecondition },
    partial = { ManagerError::Partial(vec![("abcd".into(), "down failed".into())]), Code::FailedPrecondition },
    lock_cancelled = { ManagerError::Lock(LockError::Cancelled("chall/c1".into())), Code::Cancelled },
    lock_backend = { ManagerError::Lock(LockError::Backend("etcd gone".into())), Code::Internal },
    store_missing = { ManagerError::Store(StoreError::NotFound("c1".into())), Code::NotFound },
    oci_auth = { ManagerError::Oci(OciError::Unauthenticated("401".into())), Code::Unauthenticated },
    oci_transport = { ManagerError::Oci(OciError::Unavailable("conn refused".into())), Code::Unavailable },
    oci_malformed = { ManagerError::Oci(OciError::Malformed("no descriptor".into())), Code::InvalidArgument },
    engine_timeout = {
        ManagerError::Engine(EngineError::DeadlineExceeded { op: "up", timeout: Duration::from_secs(120) }),
        Code::DeadlineExceeded
    },
    engine_scenario = {
        ManagerError::Engine(EngineError::Scenario { op: "preview", stderr: "compile error".into() }),
        Code::InvalidArgument
    },
    engine_bad_output = {
        ManagerError::Engine(EngineError::InvalidOutput("missing connection_info".into())),
        Code::InvalidArgument
    },
    engine_internal = {
        ManagerError::Engine(EngineError::Internal { op: "up", message: "spawn failed".into() }),
        Code::Internal
    },
)]
fn maps(err: ManagerError, expected: Code) {
    assert_eq!(code(err), expected);
}

#[test]
fn partial_status_lists_failures() {
    let err = ManagerError::Partial(vec![
        ("aaaa".into(), "down failed".into()),
        ("bbbb".into(), "timeout".into()),
    ]);
    let status = status_for(&err);
    assert!(status.message().contains("aaaa: down failed"));
    assert!(status.message().contains("bbbb: timeout"));
}

#[test]
fn engine_stderr_survives_into_message() {
    let err = ManagerError::Engine(EngineError::Scenario {
        op: "up",
        stderr: "panic: no LoadBalancer IP".into(),
    });
    assert!(status_for(&err).message().contains("no LoadBalancer IP"));
}
