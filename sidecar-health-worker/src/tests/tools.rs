// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::worker::HealthWorker;
use sidecar_health_exports::test_exports::{RecordingReporter, ScriptedLedger};
use sidecar_health_exports::{CycleSummary, HealthConfig};
use sidecar_metrics::SidecarMetrics;
use sidecar_models::NodeId;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub fn node_ids(names: &[&str]) -> Vec<NodeId> {
    names.iter().map(|name| NodeId::new(*name)).collect()
}

pub fn test_config(names: &[&str], tolerance: u64) -> HealthConfig {
    HealthConfig {
        nodes: node_ids(names),
        interval: Duration::from_millis(10),
        min_sleep: Duration::from_millis(1),
        tolerance,
        min_index_for_alert: 0,
        max_cycles: 0,
        fetch_server_state: false,
    }
}

/// Health worker driven pass by pass, without its thread
pub struct TestHealth {
    pub worker: HealthWorker,
    pub reporter: RecordingReporter,
    _stop_tx: watch::Sender<bool>,
}

impl TestHealth {
    pub fn new(cfg: HealthConfig, rpc: ScriptedLedger) -> TestHealth {
        let reporter = RecordingReporter::new();
        let (stop_tx, stop_rx) = watch::channel(false);
        let worker = HealthWorker::new(
            cfg,
            Box::new(rpc),
            Box::new(reporter.clone()),
            SidecarMetrics::new(false),
            stop_rx,
            Arc::new(AtomicU64::new(0)),
        );
        TestHealth {
            worker,
            reporter,
            _stop_tx: stop_tx,
        }
    }

    pub async fn run_passes(&mut self, count: usize) -> Vec<CycleSummary> {
        let mut summaries = Vec::with_capacity(count);
        for _ in 0..count {
            summaries.push(self.worker.run_cycle().await);
        }
        summaries
    }
}
