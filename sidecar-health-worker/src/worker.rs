// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::poller::poll;
use crate::stall_detector::StallDetector;
use futures::future::join_all;
use serde_json::json;
use sidecar_health_exports::{
    CycleSummary, HealthConfig, HealthReporter, PollOutcome, PollResult, StallVerdict,
    ASSERT_NEVER_STALLED, ASSERT_NOT_ALL_STALLED, ASSERT_NO_REGRESSION, EVENT_SIDECAR_START,
    EVENT_VALIDATOR_RECOVERED, EVENT_VALIDATOR_REGRESSION, EVENT_VALIDATOR_STALL,
    EVENT_VAL_HEALTH,
};
use sidecar_logging::sidecar_trace;
use sidecar_metrics::SidecarMetrics;
use sidecar_models::NodeId;
use sidecar_sdk::LedgerRpc;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Structure gathering all elements needed by the health worker thread
pub(crate) struct HealthWorker {
    cfg: HealthConfig,
    rpc: Box<dyn LedgerRpc>,
    reporter: Box<dyn HealthReporter>,
    metrics: SidecarMetrics,
    detector: StallDetector,
    /// nodes in an ongoing stall episode
    stalled: BTreeSet<NodeId>,
    cycle: u64,
    stop_rx: watch::Receiver<bool>,
    completed: Arc<AtomicU64>,
}

impl HealthWorker {
    pub(crate) fn new(
        cfg: HealthConfig,
        rpc: Box<dyn LedgerRpc>,
        reporter: Box<dyn HealthReporter>,
        metrics: SidecarMetrics,
        stop_rx: watch::Receiver<bool>,
        completed: Arc<AtomicU64>,
    ) -> Self {
        let detector = StallDetector::new(&cfg.nodes, cfg.tolerance, cfg.min_index_for_alert);
        HealthWorker {
            cfg,
            rpc,
            reporter,
            metrics,
            detector,
            stalled: BTreeSet::new(),
            cycle: 0,
            stop_rx,
            completed,
        }
    }

    /// Run passes until `max_cycles` is reached or a stop is requested.
    /// Returns the number of completed passes.
    pub(crate) async fn run(mut self) -> u64 {
        let start_payload = json!({
            "config": self.cfg,
            "num_nodes": self.cfg.nodes.len(),
        });
        self.reporter.emit_event(EVENT_SIDECAR_START, &start_payload);

        loop {
            let cycle_start = Instant::now();
            self.run_cycle().await;

            if self.cfg.max_cycles > 0 && self.cycle >= self.cfg.max_cycles {
                info!("health worker reached {} passes", self.cycle);
                break;
            }
            if self.stop_requested() {
                break;
            }

            let wake_at = std::cmp::max(
                cycle_start + self.cfg.interval,
                Instant::now() + self.cfg.min_sleep,
            );
            tokio::select! {
                _ = tokio::time::sleep_until(wake_at) => {}
                // a dropped sender also means stop
                _ = self.stop_rx.changed() => {}
            }
            if self.stop_requested() {
                break;
            }
        }
        self.cycle
    }

    fn stop_requested(&self) -> bool {
        // `has_changed` errs once the sender is gone
        *self.stop_rx.borrow() || self.stop_rx.has_changed().is_err()
    }

    /// One full pass: poll every node, judge, report.
    pub(crate) async fn run_cycle(&mut self) -> CycleSummary {
        self.cycle += 1;
        let cycle = self.cycle;
        debug!("starting healthcheck pass {}", cycle);

        let rpc = self.rpc.as_ref();
        let fetch_server_state = self.cfg.fetch_server_state;
        let results: Vec<PollResult> = join_all(
            self.cfg
                .nodes
                .iter()
                .map(|node| poll(rpc, node, cycle, fetch_server_state)),
        )
        .await;

        let evaluated: Vec<(PollResult, StallVerdict)> = results
            .into_iter()
            .map(|result| {
                let verdict = self.detector.evaluate(&result);
                (result, verdict)
            })
            .collect();

        for (result, verdict) in &evaluated {
            self.report_node(result, verdict);
        }

        let summary = CycleSummary::new(cycle, evaluated);
        self.report_cycle(&summary);
        self.completed.store(cycle, Ordering::SeqCst);
        info!(
            "Done with healthcheck pass {}: {} reporting, {} stalled",
            cycle,
            summary.num_reporting,
            summary.num_stalled()
        );
        summary
    }

    fn report_node(&mut self, result: &PollResult, verdict: &StallVerdict) {
        let node = &result.node;
        match (verdict, &result.outcome) {
            (StallVerdict::Unreachable, PollOutcome::Error(err)) => {
                warn!("pass {}: {} unreachable: {}", result.cycle, node, err);
                self.metrics.inc_poll_error(node.as_str(), &err.kind.to_string());
            }
            (
                StallVerdict::Stalled {
                    cycles_since_change,
                    suppressed: false,
                },
                PollOutcome::Success { ledger_index, .. },
            ) => {
                warn!(
                    "STALLED VALIDATOR {} at ledger {} for {} passes",
                    node, ledger_index, cycles_since_change
                );
                if self.stalled.insert(node.clone()) {
                    let payload = json!({
                        "validator": node,
                        "ledger_index": ledger_index,
                        "missed": cycles_since_change,
                        "details": result,
                    });
                    sidecar_trace!("validator_stall", { "validator": node, "pass": result.cycle });
                    self.reporter.emit_event(EVENT_VALIDATOR_STALL, &payload);
                }
            }
            (StallVerdict::Advanced, PollOutcome::Success { ledger_index, .. }) => {
                if self.stalled.remove(node) {
                    info!("{} recovered at ledger {}", node, ledger_index);
                    self.reporter.emit_event(
                        EVENT_VALIDATOR_RECOVERED,
                        &json!({
                            "validator": node,
                            "ledger_index": ledger_index,
                            "healthcheck_seq": result.cycle,
                        }),
                    );
                }
            }
            (StallVerdict::Regressed { previous, current }, _) => {
                error!(
                    "{} validated ledger went back from {} to {}",
                    node, previous, current
                );
                self.metrics.inc_regression(node.as_str());
                // the node is on a new baseline, any stall episode is over
                self.stalled.remove(node);
                self.reporter.emit_event(
                    EVENT_VALIDATOR_REGRESSION,
                    &json!({
                        "validator": node,
                        "previous_index": previous,
                        "current_index": current,
                        "healthcheck_seq": result.cycle,
                    }),
                );
            }
            _ => {}
        }

        if let (Some(index), Some(state)) = (result.ledger_index(), self.detector.state(node)) {
            self.metrics.set_node_ledger(
                node.as_str(),
                index,
                result.cycle.saturating_sub(state.last_change_cycle),
            );
        }
    }

    fn report_cycle(&self, summary: &CycleSummary) {
        let health = summary.health_event();
        sidecar_trace!("val_health", { "healthcheck_seq": summary.cycle });
        self.reporter.emit_event(EVENT_VAL_HEALTH, &health);

        if summary.has_samples() {
            self.reporter
                .assert_always(summary.no_node_stalled(), ASSERT_NEVER_STALLED, &health);
            self.reporter
                .assert_always(summary.not_all_stalled(), ASSERT_NOT_ALL_STALLED, &health);
            self.reporter
                .assert_always(summary.no_regression(), ASSERT_NO_REGRESSION, &health);
        } else {
            warn!("pass {}: no node answered", summary.cycle);
        }

        self.metrics
            .set_pass(summary.cycle, summary.num_reporting, summary.num_stalled());
    }
}
