// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error mapping: manager errors to user-visible gRPC status codes.
//!
//! This is the single place where the internal error taxonomy meets the
//! API contract; nothing else constructs non-trivial `Status` values.

use crate::manager::ManagerError;
use chall_adapters::{LockError, OciError};
use chall_engine::EngineError;
use chall_storage::StoreError;
use tonic::Status;

/// Map a manager error to the status returned to the client.
pub fn status_for(err: &ManagerError) -> Status {
    match err {
        ManagerError::InvalidArgument(msg) => Status::invalid_argument(msg.clone()),
        ManagerError::NotFound(what) => Status::not_found(format!("{what} not found")),
        ManagerError::AlreadyExists(what) => {
            Status::already_exists(format!("{what} already exists"))
        }
        ManagerError::FailedPrecondition(msg) => Status::failed_precondition(msg.clone()),
        // Retry safe: completed parts are durable, failed parts are listed.
        ManagerError::Partial(_) => Status::failed_precondition(err.to_string()),

        ManagerError::Lock(LockError::Cancelled(_)) => Status::cancelled(err.to_string()),
        ManagerError::Lock(LockError::Backend(_)) => Status::internal(err.to_string()),

        ManagerError::Store(StoreError::NotFound(what)) => {
            Status::not_found(format!("{what} not found"))
        }
        ManagerError::Store(_) => Status::internal(err.to_string()),

        ManagerError::Oci(OciError::Unauthenticated(_)) => Status::unauthenticated(err.to_string()),
        ManagerError::Oci(OciError::Unavailable(_)) => Status::unavailable(err.to_string()),
        ManagerError::Oci(OciError::Malformed(_)) | ManagerError::Oci(OciError::Scenario(_)) => {
            Status::invalid_argument(err.to_string())
        }
        ManagerError::Oci(OciError::Io(_)) => Status::internal(err.to_string()),

        ManagerError::Engine(EngineError::DeadlineExceeded { .. }) => {
            Status::deadline_exceeded(err.to_string())
        }
        // Scenario faults are the challenge author's problem, not ours.
        ManagerError::Engine(EngineError::Scenario { .. })
        | ManagerError::Engine(EngineError::InvalidOutput(_)) => {
            Status::invalid_argument(err.to_string())
        }
        ManagerError::Engine(_) => Status::internal(err.to_string()),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
