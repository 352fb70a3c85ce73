// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Stall detection.
//!
//! A node is stalled when it answers but its validated ledger index stays
//! the same for more than `tolerance` passes. Tolerance counts passes, not
//! wall-clock time. An unanswered poll tells nothing about progress: the
//! node state is left untouched and the node is never stalled for it.

use sidecar_health_exports::{NodeState, PollOutcome, PollResult, StallVerdict};
use sidecar_models::{LedgerIndex, NodeId};
use std::collections::BTreeMap;

/// Judge one poll result against what is known of the node.
///
/// Returns the node state to keep for the next pass and the verdict.
pub fn evaluate(
    result: &PollResult,
    state: &NodeState,
    cycle: u64,
    tolerance: u64,
    min_index_for_alert: LedgerIndex,
) -> (NodeState, StallVerdict) {
    let index = match &result.outcome {
        PollOutcome::Error(_) => return (*state, StallVerdict::Unreachable),
        PollOutcome::Success { ledger_index, .. } => *ledger_index,
    };

    let changed = NodeState {
        last_known_index: index,
        last_change_cycle: cycle,
        observed: true,
    };

    // first answer counts as the initial change, whatever the index
    if !state.observed || index > state.last_known_index {
        return (changed, StallVerdict::Advanced);
    }

    if index < state.last_known_index {
        return (
            changed,
            StallVerdict::Regressed {
                previous: state.last_known_index,
                current: index,
            },
        );
    }

    let cycles_since_change = cycle.saturating_sub(state.last_change_cycle);
    if cycles_since_change > tolerance {
        (
            *state,
            StallVerdict::Stalled {
                cycles_since_change,
                suppressed: state.last_known_index < min_index_for_alert,
            },
        )
    } else {
        (*state, StallVerdict::Unchanged { cycles_since_change })
    }
}

/// Owns the state of every polled node across passes
pub(crate) struct StallDetector {
    tolerance: u64,
    min_index_for_alert: LedgerIndex,
    states: BTreeMap<NodeId, NodeState>,
}

impl StallDetector {
    pub(crate) fn new<'a>(
        nodes: impl IntoIterator<Item = &'a NodeId>,
        tolerance: u64,
        min_index_for_alert: LedgerIndex,
    ) -> Self {
        StallDetector {
            tolerance,
            min_index_for_alert,
            states: nodes
                .into_iter()
                .map(|node| (node.clone(), NodeState::default()))
                .collect(),
        }
    }

    /// Evaluate a poll result and remember the resulting node state
    pub(crate) fn evaluate(&mut self, result: &PollResult) -> StallVerdict {
        let state = self.states.entry(result.node.clone()).or_default();
        let (updated, verdict) = evaluate(
            result,
            state,
            result.cycle,
            self.tolerance,
            self.min_index_for_alert,
        );
        *state = updated;
        verdict
    }

    pub(crate) fn state(&self, node: &NodeId) -> Option<&NodeState> {
        self.states.get(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidecar_models::RpcError;

    fn success(node: &str, cycle: u64, index: LedgerIndex) -> PollResult {
        PollResult {
            node: NodeId::new(node),
            cycle,
            outcome: PollOutcome::Success {
                ledger_index: index,
                ledger_hash: format!("H{}", index),
                server_state: None,
            },
        }
    }

    fn failure(node: &str, cycle: u64) -> PollResult {
        PollResult {
            node: NodeId::new(node),
            cycle,
            outcome: PollOutcome::Error(RpcError::unreachable("connection refused")),
        }
    }

    #[test]
    fn test_first_sight_is_never_stalled() {
        for (cycle, index) in [(1, 100), (9, 0), (50, 7)] {
            let (state, verdict) = evaluate(
                &success("a", cycle, index),
                &NodeState::default(),
                cycle,
                0,
                0,
            );
            assert_eq!(verdict, StallVerdict::Advanced);
            assert_eq!(state.last_change_cycle, cycle);
            assert_eq!(state.last_known_index, index);
            assert!(state.observed);
        }
    }

    #[test]
    fn test_advance_resets_change_cycle() {
        let state = NodeState {
            last_known_index: 100,
            last_change_cycle: 1,
            observed: true,
        };
        let (state, verdict) = evaluate(&success("a", 7, 101), &state, 7, 1, 0);
        assert_eq!(verdict, StallVerdict::Advanced);
        assert_eq!(state.last_change_cycle, 7);
        assert_eq!(state.last_known_index, 101);
    }

    #[test]
    fn test_tolerance_boundary() {
        let tolerance = 3;
        let state = NodeState {
            last_known_index: 100,
            last_change_cycle: 10,
            observed: true,
        };
        let (kept, verdict) = evaluate(&success("a", 13, 100), &state, 13, tolerance, 0);
        assert_eq!(
            verdict,
            StallVerdict::Unchanged {
                cycles_since_change: 3
            }
        );
        assert_eq!(kept, state);

        let (kept, verdict) = evaluate(&success("a", 14, 100), &state, 14, tolerance, 0);
        assert_eq!(
            verdict,
            StallVerdict::Stalled {
                cycles_since_change: 4,
                suppressed: false
            }
        );
        assert!(verdict.is_stalled());
        assert_eq!(kept, state);
    }

    #[test]
    fn test_stall_below_alert_threshold_is_suppressed() {
        let state = NodeState {
            last_known_index: 5,
            last_change_cycle: 1,
            observed: true,
        };
        let (_, verdict) = evaluate(&success("a", 4, 5), &state, 4, 1, 10);
        assert_eq!(
            verdict,
            StallVerdict::Stalled {
                cycles_since_change: 3,
                suppressed: true
            }
        );
        assert!(!verdict.is_stalled());
    }

    #[test]
    fn test_unreachable_keeps_state() {
        let state = NodeState {
            last_known_index: 100,
            last_change_cycle: 1,
            observed: true,
        };
        let (kept, verdict) = evaluate(&failure("a", 20), &state, 20, 1, 0);
        assert_eq!(verdict, StallVerdict::Unreachable);
        assert!(!verdict.is_stalled());
        assert_eq!(kept, state);
    }

    #[test]
    fn test_regression_is_not_a_stall() {
        let state = NodeState {
            last_known_index: 100,
            last_change_cycle: 1,
            observed: true,
        };
        let (kept, verdict) = evaluate(&success("a", 9, 90), &state, 9, 1, 0);
        assert_eq!(
            verdict,
            StallVerdict::Regressed {
                previous: 100,
                current: 90
            }
        );
        assert!(!verdict.is_stalled());
        assert_eq!(kept.last_known_index, 90);
        assert_eq!(kept.last_change_cycle, 9);
    }

    #[test]
    fn test_detector_tracks_nodes_independently() {
        let a = NodeId::new("a");
        let b = NodeId::new("b");
        let mut detector = StallDetector::new([&a, &b], 1, 0);

        assert_eq!(detector.evaluate(&success("a", 1, 10)), StallVerdict::Advanced);
        assert_eq!(detector.evaluate(&failure("b", 1)), StallVerdict::Unreachable);
        assert_eq!(detector.state(&b), Some(&NodeState::default()));

        assert_eq!(
            detector.evaluate(&success("a", 2, 10)),
            StallVerdict::Unchanged {
                cycles_since_change: 1
            }
        );
        assert_eq!(detector.evaluate(&success("b", 2, 10)), StallVerdict::Advanced);
        assert!(detector.evaluate(&success("a", 3, 10)).is_stalled());
        assert_eq!(
            detector.evaluate(&success("b", 3, 10)),
            StallVerdict::Unchanged {
                cycles_since_change: 1
            }
        );
    }
}
