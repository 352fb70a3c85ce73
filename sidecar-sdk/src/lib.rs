// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Client for the JSON-RPC endpoint of a ledger node

#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

use async_trait::async_trait;
use serde_json::{json, Value};
use sidecar_models::config::{DEFAULT_RPC_PORT, DEFAULT_RPC_TIMEOUT};
use sidecar_models::{LedgerIndex, LedgerInfo, NodeId, RpcError, ServerInfo, ServerState};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
mod tests;

/// `ledger` method
pub const METHOD_LEDGER: &str = "ledger";
/// `server_info` method
pub const METHOD_SERVER_INFO: &str = "server_info";

/// Client construction error
#[derive(Debug, Error)]
pub enum SdkError {
    /// The HTTP stack could not be initialized
    #[error("could not build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Connection settings shared by every node query
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// port used for nodes given without one
    pub port: u16,
    /// bound on each query, connection included
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        RpcConfig {
            port: DEFAULT_RPC_PORT,
            timeout: DEFAULT_RPC_TIMEOUT,
        }
    }
}

/// Queries the sidecar needs from a node.
///
/// Failures are always normalized to `RpcError`, transport errors never leak.
#[cfg_attr(any(test, feature = "test-exports"), mockall::automock)]
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Latest validated ledger of the node
    async fn validated_ledger(&self, node: &NodeId) -> Result<LedgerInfo, RpcError>;

    /// Operating mode of the node
    async fn server_info(&self, node: &NodeId) -> Result<ServerInfo, RpcError>;
}

/// HTTP client for the node RPC endpoints. No retries: a failed query is
/// reported as is and the caller decides what to do on the next pass.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    config: RpcConfig,
}

impl RpcClient {
    /// Default constructor
    pub fn new(config: RpcConfig) -> Result<RpcClient, SdkError> {
        let client = reqwest::Client::builder().build()?;
        Ok(RpcClient { client, config })
    }

    /// Connection settings
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Send `{"method": method, "params": [params]}` to the node and return
    /// the `result` member of the answer.
    pub async fn query(
        &self,
        node: &NodeId,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, RpcError> {
        let url = node.rpc_url(self.config.port);
        let body = match params {
            Some(params) => json!({ "method": method, "params": [params] }),
            None => json!({ "method": method }),
        };

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::protocol(format!(
                "{} answered {} to {}",
                node, status, method
            )));
        }

        let bytes = response.bytes().await.map_err(classify)?;
        let mut answer: Value = serde_json::from_slice(&bytes).map_err(|err| {
            RpcError::protocol(format!("{} sent a non-JSON {} answer: {}", node, method, err))
        })?;
        let result = answer
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| RpcError::protocol(format!("{} answer has no result", method)))?;

        if result.get("status").and_then(Value::as_str) == Some("error") {
            let code = result
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let message = result
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return Err(RpcError::protocol(format!(
                "{} rejected {}: {} {}",
                node, method, code, message
            )));
        }
        debug!("{} answered {}", node, method);
        Ok(result)
    }
}

#[async_trait]
impl LedgerRpc for RpcClient {
    async fn validated_ledger(&self, node: &NodeId) -> Result<LedgerInfo, RpcError> {
        let result = self
            .query(
                node,
                METHOD_LEDGER,
                Some(json!({ "ledger_index": "validated" })),
                self.config.timeout,
            )
            .await?;
        parse_validated_ledger(&result)
    }

    async fn server_info(&self, node: &NodeId) -> Result<ServerInfo, RpcError> {
        let result = self
            .query(node, METHOD_SERVER_INFO, None, self.config.timeout)
            .await?;
        parse_server_info(&result)
    }
}

/// Map a transport error onto the sidecar classification
fn classify(err: reqwest::Error) -> RpcError {
    if err.is_timeout() {
        RpcError::timeout(err.to_string())
    } else if err.is_connect() {
        RpcError::unreachable(err.to_string())
    } else if err.is_decode() || err.is_body() || err.is_builder() {
        RpcError::protocol(err.to_string())
    } else {
        // connection reset mid-request and the like
        RpcError::unreachable(err.to_string())
    }
}

/// Read index and hash of a `ledger` result.
///
/// Both the top-level `ledger_index`/`ledger_hash` members and the nested
/// `ledger` object are accepted, the index either as a number or a string.
pub fn parse_validated_ledger(result: &Value) -> Result<LedgerInfo, RpcError> {
    let nested = result.get("ledger");
    let index = result
        .get("ledger_index")
        .or_else(|| nested.and_then(|l| l.get("ledger_index")))
        .ok_or_else(|| RpcError::protocol("ledger result has no ledger_index"))?;
    let ledger_index = parse_index(index)?;

    let ledger_hash = result
        .get("ledger_hash")
        .or_else(|| nested.and_then(|l| l.get("ledger_hash")))
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::protocol("ledger result has no ledger_hash"))?
        .to_string();

    Ok(LedgerInfo {
        ledger_index,
        ledger_hash,
    })
}

fn parse_index(value: &Value) -> Result<LedgerIndex, RpcError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| RpcError::protocol(format!("invalid ledger_index {}", n))),
        Value::String(s) => s
            .parse()
            .map_err(|_| RpcError::protocol(format!("invalid ledger_index {:?}", s))),
        other => Err(RpcError::protocol(format!(
            "invalid ledger_index {}",
            other
        ))),
    }
}

/// Read the `info` member of a `server_info` result
pub fn parse_server_info(result: &Value) -> Result<ServerInfo, RpcError> {
    let info = result
        .get("info")
        .ok_or_else(|| RpcError::protocol("server_info result has no info"))?;
    let server_state = info
        .get("server_state")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::protocol("server_info has no server_state"))?;
    let complete_ledgers = info
        .get("complete_ledgers")
        .and_then(Value::as_str)
        .unwrap_or("empty");
    Ok(ServerInfo {
        server_state: ServerState::from(server_state),
        complete_ledgers: complete_ledgers.to_string(),
    })
}
