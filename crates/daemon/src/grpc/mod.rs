// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gRPC surface: binds the managers to the generated service traits.
//!
//! Handlers stay thin — convert the request, call the manager, map the
//! error through [`status::status_for`]. Query endpoints stream one item
//! per record; a record that fails to load streams an item carrying an
//! `error` field instead of aborting the call.

mod challenge;
mod convert;
mod info;
mod instance;
pub mod status;

pub use challenge::ChallengeGrpc;
pub use info::InfoGrpc;
pub use instance::InstanceGrpc;

use crate::manager::{ChallengeManager, Deps, InstanceManager};
use chall_core::Clock;
use chall_wire::v1::challenge_service_server::ChallengeServiceServer;
use chall_wire::v1::info_service_server::InfoServiceServer;
use chall_wire::v1::instance_service_server::InstanceServiceServer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tonic::transport::server::Router;
use tonic::transport::Server;

/// Channel depth for query streams; backpressure beyond this.
pub(crate) const QUERY_BUFFER: usize = 16;

/// Assemble the gRPC router over shared deps.
///
/// `shutdown` is handed to every manager call so in-flight lock waits end
/// promptly when the process is asked to stop.
pub fn router<C: Clock>(deps: Arc<Deps<C>>, shutdown: CancellationToken) -> Router {
    let challenges = ChallengeManager::new(Arc::clone(&deps));
    let instances = InstanceManager::new(Arc::clone(&deps));

    Server::builder()
        .add_service(ChallengeServiceServer::new(ChallengeGrpc::new(
            challenges.clone(),
            shutdown.clone(),
        )))
        .add_service(InstanceServiceServer::new(InstanceGrpc::new(
            instances,
            challenges,
            shutdown.clone(),
        )))
        .add_service(InfoServiceServer::new(InfoGrpc::default()))
}
