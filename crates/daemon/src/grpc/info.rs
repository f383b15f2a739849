// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! InfoService: version and liveness.

use crate::env::VERSION;
use chall_wire::v1::info_service_server::InfoService;
use chall_wire::v1::{GetInfoRequest, GetInfoResponse, HealthcheckRequest, HealthcheckResponse};
use tonic::{Request, Response, Status};

#[derive(Default)]
pub struct InfoGrpc;

#[tonic::async_trait]
impl InfoService for InfoGrpc {
    async fn get_info(
        &self,
        _request: Request<GetInfoRequest>,
    ) -> Result<Response<GetInfoResponse>, Status> {
        Ok(Response::new(GetInfoResponse { version: VERSION.to_string() }))
    }

    async fn healthcheck(
        &self,
        _request: Request<HealthcheckRequest>,
    ) -> Result<Response<HealthcheckResponse>, Status> {
        Ok(Response::new(HealthcheckResponse { ok: true }))
    }
}
