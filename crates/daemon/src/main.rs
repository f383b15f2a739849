// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `challd` entry point: config, backends, janitor, gRPC server.

use chall_adapters::{EtcdLocks, LocalLocks, LockProvider, ScenarioLoader};
use chall_core::SystemClock;
use chall_daemon::env::Config;
use chall_daemon::{grpc, Deps, Janitor, Schedule};
use chall_engine::PulumiEngine;
use chall_storage::FsStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!(
        service = %config.service_name,
        version = chall_daemon::env::VERSION,
        directory = %config.directory.display(),
        addr = %config.addr,
        "starting"
    );

    std::fs::create_dir_all(&config.directory)?;
    std::fs::create_dir_all(&config.cache)?;

    let locks: Arc<dyn LockProvider> = match &config.etcd {
        Some(etcd) => {
            info!(endpoint = %etcd.endpoint, "using etcd lock backend");
            Arc::new(
                EtcdLocks::connect(
                    &etcd.endpoint,
                    etcd.username.as_deref(),
                    etcd.password.as_deref(),
                )
                .await?,
            )
        }
        None => Arc::new(LocalLocks::new()),
    };

    let deps = Arc::new(Deps {
        store: FsStore::new(&config.directory),
        locks,
        loader: Arc::new(ScenarioLoader::new(&config.cache, config.oci.clone())),
        engine: Arc::new(PulumiEngine::new(config.pulumi_timeout)),
        clock: SystemClock,
    });

    let shutdown = CancellationToken::new();

    let schedule = Schedule::from_config(&config.janitor)?;
    let janitor = Janitor::new(Arc::clone(&deps), schedule);
    let janitor_task = tokio::spawn(janitor.run(shutdown.clone()));

    let router = grpc::router(Arc::clone(&deps), shutdown.clone());
    let serve_shutdown = shutdown.clone();
    let serve = router.serve_with_shutdown(config.addr, async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received ctrl-c, shutting down"),
            () = serve_shutdown.cancelled() => {}
        }
    });

    info!(addr = %config.addr, "serving");
    let result = serve.await;

    shutdown.cancel();
    if let Err(e) = janitor_task.await {
        warn!(error = %e, "janitor task did not stop cleanly");
    }
    result?;
    info!("shutdown complete");
    Ok(())
}
