// Copyright (c) 2022 MASSA LABS <info@massa.net>

use sidecar_health_exports::{PollOutcome, PollResult};
use sidecar_models::NodeId;
use sidecar_sdk::LedgerRpc;
use tracing::debug;

/// Query one node for one pass.
///
/// Never fails: an unanswered `ledger` query becomes a `PollOutcome::Error`.
/// A failed `server_info` query only leaves `server_state` empty.
pub async fn poll(
    rpc: &dyn LedgerRpc,
    node: &NodeId,
    cycle: u64,
    fetch_server_state: bool,
) -> PollResult {
    let ledger = match rpc.validated_ledger(node).await {
        Ok(ledger) => ledger,
        Err(err) => {
            debug!("pass {}: {} did not report its validated ledger: {}", cycle, node, err);
            return PollResult {
                node: node.clone(),
                cycle,
                outcome: PollOutcome::Error(err),
            };
        }
    };

    let server_state = if fetch_server_state {
        match rpc.server_info(node).await {
            Ok(info) => Some(info.server_state),
            Err(err) => {
                debug!("pass {}: {} did not report its server state: {}", cycle, node, err);
                None
            }
        }
    } else {
        None
    };

    PollResult {
        node: node.clone(),
        cycle,
        outcome: PollOutcome::Success {
            ledger_index: ledger.ledger_index,
            ledger_hash: ledger.ledger_hash,
            server_state,
        },
    }
}
