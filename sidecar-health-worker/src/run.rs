// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::manager::HealthManagerImpl;
use crate::worker::HealthWorker;
use crossbeam_channel::Receiver;
use sidecar_health_exports::{HealthConfig, HealthError, HealthManager, HealthReporter, HealthResult};
use sidecar_metrics::SidecarMetrics;
use sidecar_sdk::LedgerRpc;
use std::collections::BTreeSet;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::thread;
use tokio::sync::watch;
use tracing::info;

/// Start the health worker thread
///
/// # Arguments
/// * `cfg`: health worker configuration, nodes are polled in the given order
/// * `rpc`: how nodes are queried
/// * `reporter`: where events and assertions go
/// * `metrics`: gauges updated after each pass
///
/// # Return value
/// The manager used to stop the worker, and a channel receiving the number
/// of completed passes once the worker is done.
pub fn start_health_worker(
    mut cfg: HealthConfig,
    rpc: Box<dyn LedgerRpc>,
    reporter: Box<dyn HealthReporter>,
    metrics: SidecarMetrics,
) -> HealthResult<(Box<dyn HealthManager>, Receiver<u64>)> {
    let mut seen = BTreeSet::new();
    cfg.nodes.retain(|node| seen.insert(node.clone()));
    if cfg.nodes.is_empty() {
        return Err(HealthError::NoNodes);
    }
    if cfg.interval.is_zero() {
        return Err(HealthError::InvalidConfig(
            "interval must be positive".to_string(),
        ));
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("health worker rt")
        .build()
        .map_err(|e| HealthError::Startup(format!("could not build runtime: {}", e)))?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let completed = Arc::new(AtomicU64::new(0));

    info!(
        "starting health worker on {} nodes, one pass every {:?}",
        cfg.nodes.len(),
        cfg.interval
    );
    let worker = HealthWorker::new(cfg, rpc, reporter, metrics, stop_rx, completed.clone());
    let join_handle = thread::Builder::new()
        .name("health worker".into())
        .spawn(move || {
            let passes = runtime.block_on(worker.run());
            // nobody may be listening anymore
            let _ = done_tx.send(passes);
        })
        .map_err(|e| HealthError::Startup(format!("could not spawn thread: {}", e)))?;

    let manager = HealthManagerImpl {
        worker: Some((stop_tx, join_handle)),
        completed,
    };
    Ok((Box::new(manager), done_rx))
}
