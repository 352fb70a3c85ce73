// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Shared types of the validator health sidecar: node identities, the
//! ledger and server views returned by a node, RPC error classification and
//! the layered settings loader.

#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

/// Configuration constants and settings loader
pub mod config;
/// Ledger and server views
pub mod ledger;
/// Node identities
pub mod node;
/// RPC error classification
pub mod rpc_error;

pub use ledger::{LedgerIndex, LedgerInfo, ServerInfo, ServerState};
pub use node::NodeId;
pub use rpc_error::{RpcError, RpcErrorKind};
