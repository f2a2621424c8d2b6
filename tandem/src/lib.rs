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

//! tandem: a bidirectional JSON-RPC 2.0 peer.
//!
//! A single [`Peer`] acts as caller and callee over one duplex byte stream:
//! it sends requests and awaits replies, dispatches incoming requests to a
//! user [`Handler`], and sends notifications. "Server" and "client" differ
//! only in who opened the stream; the protocol engine is identical on both
//! sides.

pub mod config;
pub mod protocol;
pub mod rpc;

pub use config::PeerConfig;
pub use protocol::error::{
    PeerError, RpcError, ERROR_INTERNAL, ERROR_INVALID_PARAMS, ERROR_INVALID_REQUEST,
    ERROR_METHOD_NOT_FOUND, ERROR_PARSE,
};
pub use protocol::id::RequestId;
pub use protocol::wire::{WireMessage, WireObject, WireRequest, WireResponse};
pub use rpc::handler::{DefaultHandler, Handler, HandlerFn, Request, ResponseWriter};
pub use rpc::mux::ServeMux;
pub use rpc::peer::{Batch, BatchReply, Peer};
pub use rpc::server::Server;
