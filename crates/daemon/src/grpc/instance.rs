// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! InstanceService handlers.

use super::convert::instance_to_wire;
use super::status::status_for;
use super::QUERY_BUFFER;
use crate::manager::{ChallengeManager, InstanceManager};
use chall_core::Clock;
use chall_wire::v1::instance_service_server::InstanceService;
use chall_wire::v1::{
    CreateInstanceRequest, DeleteInstanceRequest, DeleteInstanceResponse, Instance,
    QueryInstanceRequest, QueryInstanceResponse, RenewInstanceRequest, RetrieveInstanceRequest,
    UpdateInstanceRequest,
};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

pub struct InstanceGrpc<C: Clock> {
    manager: InstanceManager<C>,
    challenges: ChallengeManager<C>,
    shutdown: CancellationToken,
}

impl<C: Clock> InstanceGrpc<C> {
    pub fn new(
        manager: InstanceManager<C>,
        challenges: ChallengeManager<C>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { manager, challenges, shutdown }
    }
}

#[tonic::async_trait]
impl<C: Clock> InstanceService for InstanceGrpc<C> {
    async fn create_instance(
        &self,
        request: Request<CreateInstanceRequest>,
    ) -> Result<Response<Instance>, Status> {
        let req = request.into_inner();
        let instance = self
            .manager
            .create(
                &req.challenge_id,
                &req.source_id,
                req.additional.into_iter().collect(),
                &self.shutdown,
            )
            .await
            .map_err(|e| status_for(&e))?;
        Ok(Response::new(instance_to_wire(&instance)))
    }

    async fn retrieve_instance(
        &self,
        request: Request<RetrieveInstanceRequest>,
    ) -> Result<Response<Instance>, Status> {
        let req = request.into_inner();
        let instance =
            self.manager.read(&req.challenge_id, &req.source_id).map_err(|e| status_for(&e))?;
        Ok(Response::new(instance_to_wire(&instance)))
    }

    type QueryInstanceStream = ReceiverStream<Result<QueryInstanceResponse, Status>>;

    async fn query_instance(
        &self,
        request: Request<QueryInstanceRequest>,
    ) -> Result<Response<Self::QueryInstanceStream>, Status> {
        let req = request.into_inner();
        let challenge_ids = if req.challenge_id.is_empty() {
            self.challenges.list().map_err(|e| status_for(&e))?
        } else {
            vec![req.challenge_id]
        };

        let manager = self.manager.clone();
        let challenges = self.challenges.clone();
        let (tx, rx) = tokio::sync::mpsc::channel(QUERY_BUFFER);

        tokio::spawn(async move {
            for challenge_id in challenge_ids {
                let identities = match challenges.list_instances(&challenge_id) {
                    Ok(identities) => identities,
                    Err(e) => {
                        let item = QueryInstanceResponse {
                            instance: None,
                            error: e.to_string(),
                            identity: String::new(),
                        };
                        if tx.send(Ok(item)).await.is_err() {
                            return;
                        }
                        continue;
                    }
                };
                for identity in identities {
                    let item = match manager.read_by_identity(&challenge_id, &identity) {
                        Ok(instance) => QueryInstanceResponse {
                            instance: Some(instance_to_wire(&instance)),
                            error: String::new(),
                            identity,
                        },
                        Err(e) => QueryInstanceResponse {
                            instance: None,
                            error: e.to_string(),
                            identity,
                        },
                    };
                    if tx.send(Ok(item)).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn update_instance(
        &self,
        request: Request<UpdateInstanceRequest>,
    ) -> Result<Response<Instance>, Status> {
        let req = request.into_inner();
        let additional =
            req.update_additional.then(|| req.additional.into_iter().collect());
        let instance = self
            .manager
            .update(&req.challenge_id, &req.source_id, additional, &self.shutdown)
            .await
            .map_err(|e| status_for(&e))?;
        Ok(Response::new(instance_to_wire(&instance)))
    }

    async fn renew_instance(
        &self,
        request: Request<RenewInstanceRequest>,
    ) -> Result<Response<Instance>, Status> {
        let req = request.into_inner();
        let instance = self
            .manager
            .renew(&req.challenge_id, &req.source_id, &self.shutdown)
            .await
            .map_err(|e| status_for(&e))?;
        Ok(Response::new(instance_to_wire(&instance)))
    }

    async fn delete_instance(
        &self,
        request: Request<DeleteInstanceRequest>,
    ) -> Result<Response<DeleteInstanceResponse>, Status> {
        let req = request.into_inner();
        self.manager
            .delete(&req.challenge_id, &req.source_id, &self.shutdown)
            .await
            .map_err(|e| status_for(&e))?;
        Ok(Response::new(DeleteInstanceResponse {}))
    }
}
