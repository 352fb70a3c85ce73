// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed node query
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcErrorKind {
    /// unreachable
    Unreachable,
    /// timeout
    Timeout,
    /// protocol_error
    ProtocolError,
}

/// A node query failure, already normalized from the transport error
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RpcError {
    /// classification
    pub kind: RpcErrorKind,
    /// human readable cause
    pub message: String,
}

impl RpcError {
    /// Connection refused, DNS failure, host down
    pub fn unreachable(message: impl Into<String>) -> Self {
        RpcError {
            kind: RpcErrorKind::Unreachable,
            message: message.into(),
        }
    }

    /// No answer within the request timeout
    pub fn timeout(message: impl Into<String>) -> Self {
        RpcError {
            kind: RpcErrorKind::Timeout,
            message: message.into(),
        }
    }

    /// The node answered with something unexpected
    pub fn protocol(message: impl Into<String>) -> Self {
        RpcError {
            kind: RpcErrorKind::ProtocolError,
            message: message.into(),
        }
    }
}
