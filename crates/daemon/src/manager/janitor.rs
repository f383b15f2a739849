// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background expirer.
//!
//! Periodically sweeps the store for instances whose `until` has lapsed
//! (or that a failed teardown flagged for cleanup) and deletes them
//! through the instance manager, so it competes for locks like any other
//! caller. Failures are logged and retried on the next tick.

use super::{Deps, InstanceManager, ManagerError};
use crate::env::{ConfigError, JanitorSchedule};
use chall_core::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// When the janitor wakes up.
pub enum Schedule {
    /// Fixed interval.
    Ticker(Duration),
    /// Crontab moments.
    Cron(cron::Schedule),
}

impl Schedule {
    pub fn from_config(config: &JanitorSchedule) -> Result<Self, ConfigError> {
        match config {
            JanitorSchedule::Ticker(interval) => Ok(Self::Ticker(*interval)),
            JanitorSchedule::Cron(expr) => {
                let schedule = expr.parse::<cron::Schedule>().map_err(|e| {
                    ConfigError::Invalid {
                        var: "CHALLD_JANITOR_CRON",
                        value: expr.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Self::Cron(schedule))
            }
        }
    }

    /// Time until the next wake-up.
    fn next_wait(&self) -> Duration {
        match self {
            Self::Ticker(interval) => *interval,
            Self::Cron(schedule) => schedule
                .upcoming(chrono::Utc)
                .next()
                .and_then(|next| (next - chrono::Utc::now()).to_std().ok())
                .unwrap_or(Duration::from_secs(60)),
        }
    }
}

/// Counters from one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TickSummary {
    pub attempted: usize,
    pub deleted: usize,
    pub failed: usize,
}

pub struct Janitor<C: Clock> {
    deps: Arc<Deps<C>>,
    instances: InstanceManager<C>,
    schedule: Schedule,
}

impl<C: Clock> Janitor<C> {
    pub fn new(deps: Arc<Deps<C>>, schedule: Schedule) -> Self {
        let instances = InstanceManager::new(Arc::clone(&deps));
        Self { deps, instances, schedule }
    }

    /// Run until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        info!("janitor started");
        loop {
            let wait = self.schedule.next_wait();
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("janitor stopped");
                    return;
                }
                () = tokio::time::sleep(wait) => {}
            }
            let summary = self.tick(&cancel).await;
            if summary.attempted > 0 {
                info!(
                    attempted = summary.attempted,
                    deleted = summary.deleted,
                    failed = summary.failed,
                    "janitor sweep finished"
                );
            }
        }
    }

    /// One sweep over every instance of every challenge.
    pub async fn tick(&self, cancel: &CancellationToken) -> TickSummary {
        let mut summary = TickSummary::default();
        let now = self.deps.clock.now();

        let challenges = match self.deps.store.list_challenges() {
            Ok(challenges) => challenges,
            Err(e) => {
                warn!(error = %e, "janitor could not list challenges");
                return summary;
            }
        };

        for challenge_id in challenges {
            let identities = match self.deps.store.list_instances(&challenge_id) {
                Ok(identities) => identities,
                Err(e) => {
                    warn!(challenge_id = %challenge_id, error = %e, "janitor could not list instances");
                    continue;
                }
            };
            for identity in identities {
                let instance = match self.deps.store.read_instance(&challenge_id, &identity) {
                    Ok(instance) => instance,
                    // Raced a concurrent delete, or a corrupt record a
                    // human has to look at; either way, skip.
                    Err(e) => {
                        debug!(challenge_id = %challenge_id, identity = %identity, error = %e, "janitor skipping unreadable instance");
                        continue;
                    }
                };
                if !instance.expired(now) && !instance.needs_cleanup {
                    continue;
                }

                summary.attempted += 1;
                match self.instances.delete(&challenge_id, &instance.source_id, cancel).await {
                    Ok(()) => {
                        summary.deleted += 1;
                        info!(challenge_id = %challenge_id, identity = %identity, "expired instance deleted");
                    }
                    // Lost the lock race to a client delete.
                    Err(ManagerError::NotFound(_)) => {}
                    Err(e) => {
                        summary.failed += 1;
                        warn!(challenge_id = %challenge_id, identity = %identity, error = %e, "expired instance delete failed; will retry next tick");
                    }
                }
            }
        }

        summary
    }
}

#[cfg(test)]
#[path = "janitor_tests.rs"]
mod tests;
