// Copyright (c) 2022 MASSA LABS <info@massa.net>

use serde::{Deserialize, Serialize};
use std::convert::Infallible;

/// `NodeId` identifies a pollable node.
///
/// It is the hostname given on the command line (`val1`), optionally with a
/// port (`val1:51234`), or a full URL (`http://127.0.0.1:5005/`).
#[derive(Clone, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node identity from a hostname, `host:port` or URL
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    /// Raw identity as given in the configuration
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL of the node RPC endpoint.
    ///
    /// ```
    /// # use sidecar_models::NodeId;
    /// assert_eq!(NodeId::new("val1").rpc_url(5005), "http://val1:5005/");
    /// assert_eq!(NodeId::new("val1:6006").rpc_url(5005), "http://val1:6006/");
    /// assert_eq!(NodeId::new("http://10.0.0.1:7000").rpc_url(5005), "http://10.0.0.1:7000");
    /// ```
    pub fn rpc_url(&self, default_port: u16) -> String {
        if self.0.contains("://") {
            return self.0.clone();
        }
        if has_explicit_port(&self.0) {
            format!("http://{}/", self.0)
        } else {
            format!("http://{}:{}/", self.0, default_port)
        }
    }
}

/// `host:port` with a numeric port. Bare IPv6 addresses are bracketed when
/// they carry a port (`[::1]:5005`).
fn has_explicit_port(host: &str) -> bool {
    match host.rsplit_once(':') {
        Some((head, port)) => {
            let bracketed_or_plain = head.ends_with(']') || !head.contains(':');
            bracketed_or_plain && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NodeId {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(NodeId(s.trim().to_string()))
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId::new(s)
    }
}
