// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Challenge instance orchestrator daemon.
//!
//! Ties the lock service, store, scenario loader, and engine adapter into
//! the challenge/instance managers, runs the janitor, and exposes the gRPC
//! surface.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod grpc;
pub mod manager;

pub use manager::{
    ChallengeDelta, ChallengeManager, Deps, InstanceManager, Janitor, ManagerError, NewChallenge,
    Schedule, TickSummary,
};
