//! Prometheus metrics of the health sidecar
//!
//! Gauges are always created so the worker can update them unconditionally.
//! They are only registered, and the `/metrics` endpoint only served, when
//! metrics are enabled.

#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

use prometheus::{core::Collector, IntCounterVec, IntGauge, IntGaugeVec, Opts};
use std::net::SocketAddr;
use std::thread::JoinHandle;
use tracing::{error, warn};

mod server;

pub use server::bind_metrics;

/// Stops the metrics server thread
pub struct MetricsStopper {
    pub(crate) stopper: Option<tokio::sync::oneshot::Sender<()>>,
    pub(crate) stop_handle: Option<JoinHandle<()>>,
}

impl MetricsStopper {
    /// Shut the server down and wait for its thread
    pub fn stop(&mut self) {
        if let Some(stopper) = self.stopper.take() {
            // the server may already be gone
            let _ = stopper.send(());
        }
        if let Some(handle) = self.stop_handle.take() {
            if let Err(e) = handle.join() {
                warn!("metrics server thread panicked: {:?}", e);
            }
        }
    }
}

/// Gauges and counters updated by the health worker after each pass.
/// Clones share the same collectors.
#[derive(Clone)]
pub struct SidecarMetrics {
    enabled: bool,

    healthcheck_seq: IntGauge,
    reporting_nodes: IntGauge,
    stalled_nodes: IntGauge,

    node_ledger_index: IntGaugeVec,
    node_cycles_since_change: IntGaugeVec,

    poll_errors: IntCounterVec,
    regressions: IntCounterVec,
}

impl SidecarMetrics {
    /// Create the collectors, registering them when `enabled`.
    /// The server is started separately with `bind_metrics`.
    pub fn new(enabled: bool) -> Self {
        let healthcheck_seq = IntGauge::new("sidecar_healthcheck_seq", "last health check pass")
            .expect("Failed to create gauge");
        let reporting_nodes = IntGauge::new(
            "sidecar_reporting_nodes",
            "nodes that answered the last pass",
        )
        .expect("Failed to create gauge");
        let stalled_nodes = IntGauge::new(
            "sidecar_stalled_nodes",
            "nodes stalled during the last pass",
        )
        .expect("Failed to create gauge");

        let node_ledger_index = IntGaugeVec::new(
            Opts::new(
                "sidecar_node_validated_ledger_index",
                "last validated ledger index reported by the node",
            ),
            &["node"],
        )
        .expect("Failed to create gauge vec");
        let node_cycles_since_change = IntGaugeVec::new(
            Opts::new(
                "sidecar_node_cycles_since_change",
                "passes since the node validated ledger last changed",
            ),
            &["node"],
        )
        .expect("Failed to create gauge vec");

        let poll_errors = IntCounterVec::new(
            Opts::new("sidecar_poll_errors_total", "failed node polls"),
            &["node", "kind"],
        )
        .expect("Failed to create counter vec");
        let regressions = IntCounterVec::new(
            Opts::new(
                "sidecar_ledger_regressions_total",
                "validated ledger index decreases",
            ),
            &["node"],
        )
        .expect("Failed to create counter vec");

        if enabled {
            register(healthcheck_seq.clone());
            register(reporting_nodes.clone());
            register(stalled_nodes.clone());
            register(node_ledger_index.clone());
            register(node_cycles_since_change.clone());
            register(poll_errors.clone());
            register(regressions.clone());
        }

        SidecarMetrics {
            enabled,
            healthcheck_seq,
            reporting_nodes,
            stalled_nodes,
            node_ledger_index,
            node_cycles_since_change,
            poll_errors,
            regressions,
        }
    }

    /// The collectors are registered and served
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record the pass number, answering nodes and stalled nodes of a finished pass
    pub fn set_pass(&self, seq: u64, reporting: usize, stalled: usize) {
        self.healthcheck_seq.set(seq as i64);
        self.reporting_nodes.set(reporting as i64);
        self.stalled_nodes.set(stalled as i64);
    }

    /// Record the validated ledger of a node and the passes since it last changed
    pub fn set_node_ledger(&self, node: &str, index: u64, cycles_since_change: u64) {
        self.node_ledger_index
            .with_label_values(&[node])
            .set(index as i64);
        self.node_cycles_since_change
            .with_label_values(&[node])
            .set(cycles_since_change as i64);
    }

    /// Count a failed poll of `node`, `kind` being the error classification
    pub fn inc_poll_error(&self, node: &str, kind: &str) {
        self.poll_errors.with_label_values(&[node, kind]).inc();
    }

    /// Count a validated ledger index decrease of `node`
    pub fn inc_regression(&self, node: &str) {
        self.regressions.with_label_values(&[node]).inc();
    }

    /// Stalled nodes of the last pass
    pub fn stalled_nodes(&self) -> i64 {
        self.stalled_nodes.get()
    }

    /// Failed polls of `node` with that classification so far
    pub fn poll_errors(&self, node: &str, kind: &str) -> u64 {
        self.poll_errors.with_label_values(&[node, kind]).get()
    }
}

fn register<C: Collector + 'static>(collector: C) {
    // error here if metrics already registered
    if let Err(e) = prometheus::register(Box::new(collector)) {
        error!("Failed to register sidecar metric: {}", e);
    }
}

/// Start the `/metrics` server if metrics are enabled
pub fn start_metrics_server(metrics: &SidecarMetrics, addr: SocketAddr) -> Option<MetricsStopper> {
    if metrics.is_enabled() {
        Some(bind_metrics(addr))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_metrics_still_count() {
        let metrics = SidecarMetrics::new(false);
        metrics.set_pass(3, 2, 1);
        metrics.inc_poll_error("val1", "timeout");
        metrics.inc_poll_error("val1", "timeout");
        assert_eq!(metrics.stalled_nodes(), 1);
        assert_eq!(metrics.poll_errors("val1", "timeout"), 2);
        assert_eq!(metrics.poll_errors("val1", "unreachable"), 0);
    }
}
