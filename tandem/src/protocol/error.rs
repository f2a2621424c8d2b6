// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types: the JSON-RPC 2.0 wire error object and the library error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// Codes from -32768 to -32000 are reserved by the JSON-RPC 2.0 framework.
/// Invalid JSON was received.
pub const ERROR_PARSE: i32 = -32700;
/// The JSON sent is not a valid Request object.
pub const ERROR_INVALID_REQUEST: i32 = -32600;
/// The method does not exist or is not available.
pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;
/// Invalid method parameter(s).
pub const ERROR_INVALID_PARAMS: i32 = -32602;
/// Internal JSON-RPC error.
pub const ERROR_INTERNAL: i32 = -32603;

fn code_desc(code: i32) -> Option<&'static str> {
    match code {
        ERROR_PARSE => Some("Parse error"),
        ERROR_INVALID_REQUEST => Some("Invalid Request"),
        ERROR_METHOD_NOT_FOUND => Some("Method not found"),
        ERROR_INVALID_PARAMS => Some("Invalid params"),
        ERROR_INTERNAL => Some("Internal error"),
        _ => None,
    }
}

/// A JSON-RPC 2.0 Error object. It may be returned by
/// [`Peer::invoke`](crate::Peer::invoke) inside [`PeerError::Rpc`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match code_desc(self.code) {
            Some(desc) => write!(f, "{}: {}", desc, self.message),
            None => write!(f, "RPC error ({}): {}", self.code, self.message),
        }
    }
}

impl std::error::Error for RpcError {}

/// Everything the library can fail with.
#[derive(Error, Debug)]
pub enum PeerError {
    /// The remote answered the call with an error object.
    #[error(transparent)]
    Rpc(RpcError),

    /// The caller's cancellation token fired while the call was in flight.
    #[error("call cancelled")]
    Cancelled,

    /// The peer shut down while the call was in flight, or an operation was
    /// attempted after close.
    #[error("peer closed")]
    Closed,

    /// An inbound frame exceeded the configured size limit.
    #[error("frame exceeds the {limit} byte limit")]
    FrameTooLarge { limit: usize },

    /// A value could not be encoded to or decoded from JSON.
    #[error("wire format error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A second write through the same [`ResponseWriter`](crate::ResponseWriter).
    #[error("response already set")]
    ResponseAlreadySet,

    /// A response write for a request that is a notification.
    #[error("cannot write message for notification")]
    NotificationResponse,

    #[error("method {0} already registered")]
    DuplicateMethod(String),

    #[error("server closed")]
    ServerClosed,
}

impl PeerError {
    /// The wire error carried by a [`PeerError::Rpc`], if that is what this is.
    pub fn as_rpc(&self) -> Option<&RpcError> {
        match self {
            PeerError::Rpc(e) => Some(e),
            _ => None,
        }
    }
}
