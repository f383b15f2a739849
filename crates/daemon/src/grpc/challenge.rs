// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ChallengeService handlers.

use super::convert::challenge_to_wire;
use super::status::status_for;
use super::QUERY_BUFFER;
use crate::manager::{ChallengeDelta, ChallengeManager, NewChallenge};
use chall_core::{Clock, ScenarioRef};
use chall_wire::v1::challenge_service_server::ChallengeService;
use chall_wire::v1::{
    Challenge, CreateChallengeRequest, DeleteChallengeRequest, DeleteChallengeResponse,
    QueryChallengeRequest, QueryChallengeResponse, RetrieveChallengeRequest,
    UpdateChallengeRequest,
};
use chall_wire::from_timestamp;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

pub struct ChallengeGrpc<C: Clock> {
    manager: ChallengeManager<C>,
    shutdown: CancellationToken,
}

impl<C: Clock> ChallengeGrpc<C> {
    pub fn new(manager: ChallengeManager<C>, shutdown: CancellationToken) -> Self {
        Self { manager, shutdown }
    }
}

/// Resolve the scenario from either the inline archive or the reference
/// string.
fn scenario_from(
    id: &str,
    scenario: &str,
    archive: Option<Vec<u8>>,
) -> Result<ScenarioRef, Status> {
    match archive {
        Some(bytes) => Ok(ScenarioRef::Archive { name: id.to_string(), bytes }),
        None => ScenarioRef::parse(scenario).map_err(|e| Status::invalid_argument(e.to_string())),
    }
}

#[tonic::async_trait]
impl<C: Clock> ChallengeService for ChallengeGrpc<C> {
    async fn create_challenge(
        &self,
        request: Request<CreateChallengeRequest>,
    ) -> Result<Response<Challenge>, Status> {
        let req = request.into_inner();
        let scenario = scenario_from(&req.id, &req.scenario, req.scenario_archive)?;
        let new = NewChallenge {
            id: req.id,
            scenario,
            until: req.until.as_ref().and_then(from_timestamp),
            timeout: req.timeout,
            min: req.min,
            max: req.max,
            additional: req.additional.into_iter().collect(),
            image_pull_secrets: req.image_pull_secrets,
        };
        let challenge =
            self.manager.create(new, &self.shutdown).await.map_err(|e| status_for(&e))?;
        Ok(Response::new(challenge_to_wire(&challenge)))
    }

    async fn retrieve_challenge(
        &self,
        request: Request<RetrieveChallengeRequest>,
    ) -> Result<Response<Challenge>, Status> {
        let req = request.into_inner();
        let challenge = self.manager.read(&req.id).map_err(|e| status_for(&e))?;
        Ok(Response::new(challenge_to_wire(&challenge)))
    }

    type QueryChallengeStream = ReceiverStream<Result<QueryChallengeResponse, Status>>;

    async fn query_challenge(
        &self,
        _request: Request<QueryChallengeRequest>,
    ) -> Result<Response<Self::QueryChallengeStream>, Status> {
        let ids = self.manager.list().map_err(|e| status_for(&e))?;
        let manager = self.manager.clone();
        let (tx, rx) = tokio::sync::mpsc::channel(QUERY_BUFFER);

        tokio::spawn(async move {
            for id in ids {
                let item = match manager.read(&id) {
                    Ok(challenge) => QueryChallengeResponse {
                        challenge: Some(challenge_to_wire(&challenge)),
                        error: String::new(),
                        id,
                    },
                    // Keep streaming: the broken record is reported inline.
                    Err(e) => QueryChallengeResponse {
                        challenge: None,
                        error: e.to_string(),
                        id,
                    },
                };
                if tx.send(Ok(item)).await.is_err() {
                    return;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn update_challenge(
        &self,
        request: Request<UpdateChallengeRequest>,
    ) -> Result<Response<Challenge>, Status> {
        let req = request.into_inner();
        let scenario = match (&req.scenario, req.scenario_archive) {
            (_, Some(bytes)) => {
                Some(ScenarioRef::Archive { name: req.id.clone(), bytes })
            }
            (Some(reference), None) => Some(
                ScenarioRef::parse(reference)
                    .map_err(|e| Status::invalid_argument(e.to_string()))?,
            ),
            (None, None) => None,
        };
        let delta = ChallengeDelta {
            scenario,
            until: req.until.as_ref().and_then(from_timestamp),
            timeout: req.timeout,
            min: req.min,
            max: req.max,
            additional: req.update_additional.then(|| req.additional.into_iter().collect()),
            image_pull_secrets: req.update_image_pull_secrets.then_some(req.image_pull_secrets),
        };

        let (challenge, failures) =
            self.manager.update(&req.id, delta, &self.shutdown).await.map_err(|e| status_for(&e))?;
        if !failures.is_empty() {
            return Err(status_for(&crate::manager::ManagerError::Partial(failures)));
        }
        Ok(Response::new(challenge_to_wire(&challenge)))
    }

    async fn delete_challenge(
        &self,
        request: Request<DeleteChallengeRequest>,
    ) -> Result<Response<DeleteChallengeResponse>, Status> {
        let req = request.into_inner();
        self.manager.delete(&req.id, &self.shutdown).await.map_err(|e| status_for(&e))?;
        Ok(Response::new(DeleteChallengeResponse {}))
    }
}
