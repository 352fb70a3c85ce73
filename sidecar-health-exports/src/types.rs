// Copyright (c) 2022 MASSA LABS <info@massa.net>

use serde::Serialize;
use serde_json::{json, Value};
use sidecar_models::{LedgerIndex, NodeId, RpcError, ServerState};
use std::collections::{BTreeMap, BTreeSet};

/// Emitted once before the first pass, with the effective configuration
pub const EVENT_SIDECAR_START: &str = "sidecar_start";
/// Emitted after every pass
pub const EVENT_VAL_HEALTH: &str = "val_health";
/// Emitted when a node becomes stalled
pub const EVENT_VALIDATOR_STALL: &str = "validator_stall";
/// Emitted when a stalled node validates a new ledger again
pub const EVENT_VALIDATOR_RECOVERED: &str = "validator_recovered";
/// Emitted when a node reports a lower validated ledger than before
pub const EVENT_VALIDATOR_REGRESSION: &str = "validator_regression";

/// No reporting node is stalled
pub const ASSERT_NEVER_STALLED: &str = "Validators are never stalled";
/// At least one reporting node is not stalled
pub const ASSERT_NOT_ALL_STALLED: &str = "ALL validators are never stalled";
/// No node reported a lower validated ledger than in a previous pass
pub const ASSERT_NO_REGRESSION: &str = "Validated ledger index never regresses";

/// What a node answered during one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollOutcome {
    /// the node reported its validated ledger
    Success {
        /// validated ledger sequence
        ledger_index: LedgerIndex,
        /// validated ledger hash
        ledger_hash: String,
        /// operating mode, if it was queried and answered
        #[serde(skip_serializing_if = "Option::is_none")]
        server_state: Option<ServerState>,
    },
    /// the node could not be queried
    Error(RpcError),
}

/// Outcome of polling one node during one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollResult {
    /// polled node
    pub node: NodeId,
    /// pass number, starting at 1
    pub cycle: u64,
    /// what the node answered
    #[serde(flatten)]
    pub outcome: PollOutcome,
}

impl PollResult {
    /// Validated ledger index, if the node answered
    pub fn ledger_index(&self) -> Option<LedgerIndex> {
        match &self.outcome {
            PollOutcome::Success { ledger_index, .. } => Some(*ledger_index),
            PollOutcome::Error(_) => None,
        }
    }

    /// The node answered this pass
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PollOutcome::Success { .. })
    }
}

/// What the health worker remembers about a node between passes.
///
/// `last_change_cycle` moves to the current pass if and only if
/// `last_known_index` changes (or is observed for the first time) during it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeState {
    /// last validated ledger index reported by the node
    pub last_known_index: LedgerIndex,
    /// pass during which `last_known_index` last changed
    pub last_change_cycle: u64,
    /// the node answered at least once
    pub observed: bool,
}

/// Verdict of the stall detector for one node during one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum StallVerdict {
    /// the node did not answer, it can't be judged this pass
    Unreachable,
    /// first answer or validated ledger moved forward
    Advanced,
    /// same validated ledger, still within tolerance
    Unchanged {
        /// passes since the last change
        cycles_since_change: u64,
    },
    /// same validated ledger for more passes than tolerated
    Stalled {
        /// passes since the last change
        cycles_since_change: u64,
        /// the ledger index is below the alert threshold
        suppressed: bool,
    },
    /// the validated ledger index went down
    Regressed {
        /// index reported before
        previous: LedgerIndex,
        /// index reported now
        current: LedgerIndex,
    },
}

impl StallVerdict {
    /// Escalated stall
    pub fn is_stalled(&self) -> bool {
        matches!(
            self,
            StallVerdict::Stalled {
                suppressed: false,
                ..
            }
        )
    }

    /// Validated ledger index went down
    pub fn is_regression(&self) -> bool {
        matches!(self, StallVerdict::Regressed { .. })
    }
}

/// Everything learned during one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    /// pass number
    pub cycle: u64,
    /// answer of every polled node
    pub results: BTreeMap<NodeId, PollResult>,
    /// stall detector verdict of every polled node
    pub verdicts: BTreeMap<NodeId, StallVerdict>,
    /// nodes with an escalated stall
    pub stalled: BTreeSet<NodeId>,
    /// nodes whose validated ledger index went down
    pub regressed: BTreeSet<NodeId>,
    /// nodes that answered
    pub num_reporting: usize,
}

impl CycleSummary {
    /// Build the summary of a pass from its evaluated poll results
    pub fn new(cycle: u64, evaluated: Vec<(PollResult, StallVerdict)>) -> Self {
        let mut results = BTreeMap::new();
        let mut verdicts = BTreeMap::new();
        let mut stalled = BTreeSet::new();
        let mut regressed = BTreeSet::new();
        let mut num_reporting = 0;
        for (result, verdict) in evaluated {
            if result.is_success() {
                num_reporting += 1;
            }
            if verdict.is_stalled() {
                stalled.insert(result.node.clone());
            }
            if verdict.is_regression() {
                regressed.insert(result.node.clone());
            }
            verdicts.insert(result.node.clone(), verdict);
            results.insert(result.node.clone(), result);
        }
        CycleSummary {
            cycle,
            results,
            verdicts,
            stalled,
            regressed,
            num_reporting,
        }
    }

    /// Number of nodes with an escalated stall
    pub fn num_stalled(&self) -> usize {
        self.stalled.len()
    }

    /// Assertions are only meaningful when at least one node answered
    pub fn has_samples(&self) -> bool {
        self.num_reporting > 0
    }

    /// No reporting node is stalled
    pub fn no_node_stalled(&self) -> bool {
        self.num_stalled() == 0
    }

    /// Some reporting node is still advancing. Weaker than `no_node_stalled`:
    /// only a total consensus failure breaks it.
    pub fn not_all_stalled(&self) -> bool {
        self.num_stalled() < self.num_reporting
    }

    /// No node went back to a lower validated ledger
    pub fn no_regression(&self) -> bool {
        self.regressed.is_empty()
    }

    /// Payload of the per-pass `val_health` event
    pub fn health_event(&self) -> Value {
        json!({
            "healthcheck_seq": self.cycle,
            "validator_status": self.results,
            "stalled_validators": self.stalled,
            "regressed_validators": self.regressed,
            "num_reporting": self.num_reporting,
        })
    }
}
