use async_trait::async_trait;
use parking_lot::Mutex;
use sidecar_models::{LedgerIndex, LedgerInfo, NodeId, RpcError, ServerInfo, ServerState};
use sidecar_sdk::LedgerRpc;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// One scripted answer to a `ledger` query: `Some(index)` or unreachable
pub type ScriptStep = Option<LedgerIndex>;

struct NodeScript {
    steps: VecDeque<Result<LedgerInfo, RpcError>>,
    last: Option<Result<LedgerInfo, RpcError>>,
    server_info: Result<ServerInfo, RpcError>,
    ledger_calls: usize,
}

/// `LedgerRpc` answering from per-node scripts instead of the network.
///
/// Each `validated_ledger` call consumes the next step of the node's script;
/// once the script is exhausted the last step is repeated. Unknown nodes
/// are unreachable.
#[derive(Default)]
pub struct ScriptedLedger {
    nodes: Mutex<HashMap<NodeId, NodeScript>>,
    delay: Duration,
}

/// Ledger with that index and a hash derived from it
pub fn ledger_info(index: LedgerIndex) -> LedgerInfo {
    LedgerInfo {
        ledger_index: index,
        ledger_hash: format!("{:064X}", index),
    }
}

impl ScriptedLedger {
    /// No node scripted yet
    pub fn new() -> Self {
        Default::default()
    }

    /// Script the validated ledger indices a node reports, `None` meaning unreachable
    pub fn with_indices(self, node: &str, steps: &[ScriptStep]) -> Self {
        let steps = steps
            .iter()
            .map(|step| match step {
                Some(index) => Ok(ledger_info(*index)),
                None => Err(RpcError::unreachable(format!("{} is down", node))),
            })
            .collect();
        self.with_script(node, steps)
    }

    /// Script raw answers of a node
    pub fn with_script(self, node: &str, steps: Vec<Result<LedgerInfo, RpcError>>) -> Self {
        self.nodes.lock().insert(
            NodeId::new(node),
            NodeScript {
                steps: steps.into(),
                last: None,
                server_info: Ok(ServerInfo {
                    server_state: ServerState::Proposing,
                    complete_ledgers: "1-1000".to_string(),
                }),
                ledger_calls: 0,
            },
        );
        self
    }

    /// Override what `server_info` answers for a scripted node
    pub fn with_server_info(self, node: &str, info: Result<ServerInfo, RpcError>) -> Self {
        if let Some(script) = self.nodes.lock().get_mut(&NodeId::new(node)) {
            script.server_info = info;
        }
        self
    }

    /// Answer every `ledger` query after `delay`, like a slow node
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `ledger` queries the node received
    pub fn ledger_calls(&self, node: &str) -> usize {
        self.nodes
            .lock()
            .get(&NodeId::new(node))
            .map(|script| script.ledger_calls)
            .unwrap_or(0)
    }
}

#[async_trait]
impl LedgerRpc for ScriptedLedger {
    async fn validated_ledger(&self, node: &NodeId) -> Result<LedgerInfo, RpcError> {
        let answer = {
            let mut nodes = self.nodes.lock();
            match nodes.get_mut(node) {
                None => Err(RpcError::unreachable(format!("{} is not scripted", node))),
                Some(script) => {
                    script.ledger_calls += 1;
                    if let Some(step) = script.steps.pop_front() {
                        script.last = Some(step);
                    }
                    script.last.clone().unwrap_or_else(|| {
                        Err(RpcError::unreachable(format!("{} has an empty script", node)))
                    })
                }
            }
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        answer
    }

    async fn server_info(&self, node: &NodeId) -> Result<ServerInfo, RpcError> {
        self.nodes
            .lock()
            .get(node)
            .map(|script| script.server_info.clone())
            .unwrap_or_else(|| Err(RpcError::unreachable(format!("{} is not scripted", node))))
    }
}
