// Copyright (c) 2022 MASSA LABS <info@massa.net>

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sequence number of a ledger
pub type LedgerIndex = u64;

/// Latest validated ledger as reported by a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInfo {
    /// validated ledger sequence
    pub ledger_index: LedgerIndex,
    /// validated ledger hash
    pub ledger_hash: String,
}

/// Operating mode reported by `server_info`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServerState {
    /// not connected to the network
    Disconnected,
    /// connected, not yet acquiring ledgers
    Connected,
    /// catching up with the network
    Syncing,
    /// following the network, not fully synced
    Tracking,
    /// fully synced
    Full,
    /// fully synced, issuing validations
    Validating,
    /// fully synced, participating in consensus
    Proposing,
    /// state string this version does not know about
    Other(String),
}

impl ServerState {
    /// The node holds the current validated ledger
    pub fn is_synced(&self) -> bool {
        matches!(
            self,
            ServerState::Full | ServerState::Validating | ServerState::Proposing
        )
    }

    /// String as sent on the wire
    pub fn as_str(&self) -> &str {
        match self {
            ServerState::Disconnected => "disconnected",
            ServerState::Connected => "connected",
            ServerState::Syncing => "syncing",
            ServerState::Tracking => "tracking",
            ServerState::Full => "full",
            ServerState::Validating => "validating",
            ServerState::Proposing => "proposing",
            ServerState::Other(s) => s,
        }
    }
}

impl From<&str> for ServerState {
    fn from(s: &str) -> Self {
        match s {
            "disconnected" => ServerState::Disconnected,
            "connected" => ServerState::Connected,
            "syncing" => ServerState::Syncing,
            "tracking" => ServerState::Tracking,
            "full" => ServerState::Full,
            "validating" => ServerState::Validating,
            "proposing" => ServerState::Proposing,
            other => ServerState::Other(other.to_string()),
        }
    }
}

impl FromStr for ServerState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ServerState::from(s))
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ServerState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ServerState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ServerState::from(s.as_str()))
    }
}

/// Subset of `server_info` the sidecar looks at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// operating mode
    pub server_state: ServerState,
    /// ranges of ledgers held locally, `"empty"` when none
    pub complete_ledgers: String,
}

impl ServerInfo {
    /// Holds at least one complete ledger and follows the validated chain
    pub fn is_synced(&self) -> bool {
        self.complete_ledgers != "empty" && self.server_state.is_synced()
    }
}
