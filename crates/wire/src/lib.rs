// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the gRPC surface.
//!
//! Generated from `proto/api/v1/*.proto` by `tonic-build`, plus the
//! timestamp conversions the daemon needs at the boundary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use chrono::{DateTime, TimeZone, Utc};

// Generated code is exempt from the workspace lint policy.
#[allow(clippy::all, clippy::unwrap_used, clippy::expect_used, clippy::panic)]
pub mod v1 {
    tonic::include_proto!("api.v1");
}

/// Chrono instant → protobuf timestamp.
pub fn to_timestamp(instant: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: instant.timestamp(),
        nanos: instant.timestamp_subsec_nanos() as i32,
    }
}

/// Protobuf timestamp → chrono instant. `None` for out-of-range values.
pub fn from_timestamp(timestamp: &prost_types::Timestamp) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(timestamp.seconds, timestamp.nanos.max(0) as u32).single()
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
