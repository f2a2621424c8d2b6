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

//! Request dispatch surface: the [`Handler`] trait and [`ResponseWriter`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::protocol::error::{PeerError, RpcError, ERROR_METHOD_NOT_FOUND};
use crate::protocol::id::RequestId;
use crate::protocol::wire::WireResponse;
use crate::rpc::peer::Peer;

/// Handles an individual RPC call.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Invoked for each request and notification read from the stream. If a
    /// response is needed for a request and the handler writes nothing, a
    /// success response with a null result is sent. If the request is a
    /// notification, the [`ResponseWriter`] must NOT be used, even for
    /// delivering an error.
    ///
    /// Written responses may not be delivered right away if the request
    /// arrived in a batch.
    async fn serve_rpc(&self, w: Arc<ResponseWriter>, r: Request);
}

/// An incoming request, as seen by a [`Handler`].
#[derive(Clone)]
pub struct Request {
    pub notification: bool,
    pub method: String,
    pub params: Option<Value>,
    /// The peer the request arrived on. Handlers may call back through it.
    pub peer: Peer,
}

impl Request {
    /// Decode the params into a concrete type. Absent params decode as null.
    pub fn parse_params<T: DeserializeOwned>(&self) -> Result<T, PeerError> {
        let value = self.params.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }
}

enum ResponsePayload {
    Result(Value),
    Error(RpcError),
}

/// Writes the response for a single request. The first of
/// [`write_message`](Self::write_message) and
/// [`write_error`](Self::write_error) wins; later writes fail.
pub struct ResponseWriter {
    notification: bool,
    id: RequestId,
    written: AtomicBool,
    payload: Mutex<Option<ResponsePayload>>,
}

impl ResponseWriter {
    pub(crate) fn new(notification: bool, id: RequestId) -> Self {
        Self {
            notification,
            id,
            written: AtomicBool::new(false),
            payload: Mutex::new(None),
        }
    }

    fn claim(&self) -> Result<(), PeerError> {
        if self.notification {
            return Err(PeerError::NotificationResponse);
        }
        if self.written.swap(true, Ordering::SeqCst) {
            return Err(PeerError::ResponseAlreadySet);
        }
        Ok(())
    }

    /// Write a success response. The value is serialized to JSON.
    pub fn write_message<T: Serialize>(&self, msg: T) -> Result<(), PeerError> {
        self.claim()?;
        let body = serde_json::to_value(msg)?;
        *self.payload.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(ResponsePayload::Result(body));
        Ok(())
    }

    /// Write an error response.
    pub fn write_error(
        &self,
        code: i32,
        message: impl std::fmt::Display,
    ) -> Result<(), PeerError> {
        self.claim()?;
        *self.payload.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(ResponsePayload::Error(RpcError::new(
                code,
                message.to_string(),
            )));
        Ok(())
    }

    /// The response to put on the wire. An unwritten response defaults to a
    /// success with a null result.
    pub(crate) fn take_response(&self) -> WireResponse {
        let payload = self
            .payload
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match payload {
            Some(ResponsePayload::Result(value)) => {
                WireResponse::result(self.id.clone(), value)
            }
            Some(ResponsePayload::Error(error)) => WireResponse::error(self.id.clone(), error),
            None => WireResponse::result(self.id.clone(), Value::Null),
        }
    }
}

/// Adapts a closure into a [`Handler`].
///
/// ```no_run
/// use tandem::{HandlerFn, Request, ResponseWriter};
/// use std::sync::Arc;
///
/// let handler = HandlerFn(|w: Arc<ResponseWriter>, r: Request| async move {
///     let _ = w.write_message(format!("you called {}", r.method));
/// });
/// ```
pub struct HandlerFn<F>(pub F);

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Arc<ResponseWriter>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn serve_rpc(&self, w: Arc<ResponseWriter>, r: Request) {
        (self.0)(w, r).await
    }
}

/// A catch-all handler for peers that only make outbound calls: answers
/// every call with method-not-found.
pub struct DefaultHandler;

#[async_trait]
impl Handler for DefaultHandler {
    async fn serve_rpc(&self, w: Arc<ResponseWriter>, r: Request) {
        let _ = w.write_error(
            ERROR_METHOD_NOT_FOUND,
            format!("method {} not found", r.method),
        );
    }
}
