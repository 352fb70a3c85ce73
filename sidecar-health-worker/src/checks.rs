// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! One-shot readiness checks, used before and after a fault injection run

use displaydoc::Display;
use futures::future::join_all;
use sidecar_models::{LedgerIndex, NodeId, RpcError, ServerState};
use sidecar_sdk::LedgerRpc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Why a node failed the ledger closing check
#[derive(Display, Error, Debug, Clone, PartialEq, Eq)]
pub enum ClosingError {
    /// node is {0}, not proposing
    NotProposing(ServerState),
    /// no ledger after {last_index} validated within {waited:?}
    NoNewLedger {
        /// last index seen
        last_index: LedgerIndex,
        /// time spent waiting
        waited: Duration,
    },
    /// rpc error: {0}
    Rpc(#[from] RpcError),
}

/// The node holds complete ledgers and follows the validated chain
pub async fn check_sync(rpc: &dyn LedgerRpc, node: &NodeId) -> bool {
    match rpc.server_info(node).await {
        Ok(info) => {
            info!(
                "{}: server_state {}, complete_ledgers {}",
                node, info.server_state, info.complete_ledgers
            );
            info.is_synced()
        }
        Err(err) => {
            warn!("{}: no server_info: {}", node, err);
            false
        }
    }
}

/// Wait until the node validates a ledger after the current one
pub async fn wait_for_ledger_close(
    rpc: &dyn LedgerRpc,
    node: &NodeId,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<LedgerIndex, ClosingError> {
    let start = Instant::now();
    let target = rpc.validated_ledger(node).await?.ledger_index + 1;
    loop {
        let current = rpc.validated_ledger(node).await?.ledger_index;
        if current >= target {
            info!("{}: arrived at ledger {}", node, current);
            return Ok(current);
        }
        if start.elapsed() >= timeout {
            return Err(ClosingError::NoNewLedger {
                last_index: current,
                waited: start.elapsed(),
            });
        }
        info!("{}: at {}, waiting for ledger {}", node, current, target);
        tokio::time::sleep(poll_interval).await;
    }
}

/// The node is proposing and closes ledgers
pub async fn check_node_closing(
    rpc: &dyn LedgerRpc,
    node: &NodeId,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<LedgerIndex, ClosingError> {
    let info = rpc.server_info(node).await?;
    if info.server_state != ServerState::Proposing {
        return Err(ClosingError::NotProposing(info.server_state));
    }
    wait_for_ledger_close(rpc, node, poll_interval, timeout).await
}

/// Every node is proposing and closes ledgers. Nodes are checked concurrently.
pub async fn check_closing(
    rpc: &dyn LedgerRpc,
    nodes: &[NodeId],
    poll_interval: Duration,
    timeout: Duration,
) -> bool {
    let results = join_all(
        nodes
            .iter()
            .map(|node| check_node_closing(rpc, node, poll_interval, timeout)),
    )
    .await;

    let mut all_closing = true;
    for (node, result) in nodes.iter().zip(results) {
        match result {
            Ok(index) => info!("{} is closing ledgers (validated {})", node, index),
            Err(err) => {
                error!("{} is not proposing or closing ledgers: {}", node, err);
                all_closing = false;
            }
        }
    }
    all_closing && !nodes.is_empty()
}
