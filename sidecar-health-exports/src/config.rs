//! Copyright (c) 2022 MASSA LABS <info@massa.net>

//! This file defines the health worker settings

use serde::Serialize;
use sidecar_models::config::{
    DEFAULT_MIN_INDEX_FOR_ALERT, DEFAULT_MIN_SLEEP, DEFAULT_POLL_INTERVAL,
    DEFAULT_STALL_TOLERANCE,
};
use sidecar_models::{LedgerIndex, NodeId};
use std::time::Duration;

/// Structure defining the settings of the health worker
#[derive(Debug, Clone, Serialize)]
pub struct HealthConfig {
    /// nodes to poll
    pub nodes: Vec<NodeId>,

    /// time between the starts of two passes
    pub interval: Duration,

    /// shortest pause between two passes when a pass overran `interval`
    pub min_sleep: Duration,

    /// number of passes a node may keep the same validated ledger without being stalled
    pub tolerance: u64,

    /// stalls of nodes below this ledger index are not escalated
    pub min_index_for_alert: LedgerIndex,

    /// stop after this number of passes, 0 to run forever
    pub max_cycles: u64,

    /// also query `server_info` during each pass
    pub fetch_server_state: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            nodes: Vec::new(),
            interval: DEFAULT_POLL_INTERVAL,
            min_sleep: DEFAULT_MIN_SLEEP,
            tolerance: DEFAULT_STALL_TOLERANCE,
            min_index_for_alert: DEFAULT_MIN_INDEX_FOR_ALERT,
            max_cycles: 0,
            fetch_server_state: true,
        }
    }
}
