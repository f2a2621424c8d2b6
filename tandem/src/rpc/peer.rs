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

//! The peer engine.
//!
//! One background demultiplexer task per peer reads frames and routes them:
//! responses to the correlator, requests to the user handler. Handlers run
//! on their own tasks so a slow handler never blocks the reader, and a
//! handler may call back through the same peer while servicing a request.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::PeerConfig;
use crate::protocol::error::{PeerError, RpcError, ERROR_INTERNAL, ERROR_INVALID_REQUEST};
use crate::protocol::id::RequestId;
use crate::protocol::wire::{WireMessage, WireObject, WireRequest, WireResponse};
use crate::rpc::codec::InboundFrame;
use crate::rpc::correlator::Correlator;
use crate::rpc::handler::{Handler, Request, ResponseWriter};
use crate::rpc::transport::{split_transport, FrameReader, MessageWriter};

/// One side of a bidirectional JSON-RPC 2.0 connection.
///
/// A `Peer` is symmetric in role: it invokes RPCs on the remote side and
/// services RPCs the remote side invokes on it, over the same byte stream.
/// Cloning is cheap and all clones drive the same connection.
#[derive(Clone)]
pub struct Peer {
    inner: Arc<PeerInner>,
}

struct PeerInner {
    writer: MessageWriter,
    correlator: Correlator,
    handler: Arc<dyn Handler>,
    next_id: AtomicI64,
    /// Fired by `close()`; tells the demultiplexer to stop reading.
    shutdown: CancellationToken,
    /// Fired when the demultiplexer has exited.
    done: CancellationToken,
}

impl Peer {
    /// Create a peer over any duplex byte stream and start reading messages
    /// from it. The handler is invoked for each request and notification
    /// read from the stream.
    pub fn new<T>(io: T, handler: Arc<dyn Handler>) -> Peer
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_config(io, handler, PeerConfig::default())
    }

    pub fn with_config<T>(io: T, handler: Arc<dyn Handler>, config: PeerConfig) -> Peer
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, writer) = split_transport(io, config.max_frame_bytes);
        let peer = Peer {
            inner: Arc::new(PeerInner {
                writer,
                correlator: Correlator::new(config.deposit_timeout),
                handler,
                next_id: AtomicI64::new(0),
                shutdown: CancellationToken::new(),
                done: CancellationToken::new(),
            }),
        };
        tokio::spawn(run_demux(peer.clone(), reader));
        peer
    }

    /// Connect to a TCP endpoint and create a peer on the connection.
    pub async fn dial(
        target: impl ToSocketAddrs,
        handler: Arc<dyn Handler>,
    ) -> Result<Peer, PeerError> {
        let stream = TcpStream::connect(target).await?;
        Ok(Peer::new(stream, handler))
    }

    /// Send a notification to the other side of the connection. There is no
    /// way of knowing whether the other side processed it; an error is
    /// returned only for transport-level problems.
    pub async fn notify<P: Serialize>(&self, method: &str, params: P) -> Result<(), PeerError> {
        let req = WireRequest::notification(method, to_params(params)?);
        self.inner
            .writer
            .send(&WireMessage::single(WireObject::Request(req)))
            .await
    }

    /// Invoke an RPC on the other side of the connection and wait for the
    /// response. RPC-level failures come back as [`PeerError::Rpc`];
    /// cancelling `ctx` abandons the call and any late response is dropped.
    pub async fn invoke<P: Serialize>(
        &self,
        ctx: &CancellationToken,
        method: &str,
        params: P,
    ) -> Result<Value, PeerError> {
        let params = to_params(params)?;
        let id = self.next_id();
        let mut slot = self.inner.correlator.register(id);

        let req = WireRequest::call(RequestId::Number(id), method, params);
        if let Err(e) = self
            .inner
            .writer
            .send(&WireMessage::single(WireObject::Request(req)))
            .await
        {
            self.inner.correlator.unregister(id);
            return Err(e);
        }

        let outcome = tokio::select! {
            _ = ctx.cancelled() => Err(PeerError::Cancelled),
            _ = self.inner.done.cancelled() => Err(PeerError::Closed),
            resp = slot.recv() => settle(resp),
        };
        self.inner.correlator.unregister(id);
        outcome
    }

    /// Start a new request batch.
    pub fn batch(&self) -> Batch {
        Batch {
            peer: self.clone(),
            objects: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Close the peer: the write half is shut down and the demultiplexer
    /// exits. Idempotent.
    pub async fn close(&self) -> Result<(), PeerError> {
        self.inner.shutdown.cancel();
        self.inner.writer.close().await
    }

    /// Completes when the background demultiplexer has exited, whether from
    /// [`close`](Self::close) or a terminal transport error.
    pub async fn done(&self) {
        self.inner.done.cancelled().await
    }

    pub(crate) fn same_peer(&self, other: &Peer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn next_id(&self) -> i64 {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Run every request of one inbound message, then send the collected
    /// responses as a single frame whose batching matches the input's.
    async fn serve_requests(&self, requests: Vec<WireRequest>, batched: bool) {
        let handles: Vec<_> = requests
            .into_iter()
            .map(|req| {
                let notification = req.notification;
                let id = req.id.clone();
                let peer = self.clone();
                let handle = tokio::spawn(async move { peer.handle_request(req).await });
                (notification, id, handle)
            })
            .collect();

        let mut outgoing = Vec::new();
        for (notification, id, handle) in handles {
            match handle.await {
                Ok(Some(resp)) => outgoing.push(WireObject::Response(resp)),
                Ok(None) => {}
                Err(e) => {
                    warn!("request handler panicked: {e}");
                    // A call still gets its one response.
                    if !notification {
                        outgoing.push(WireObject::Response(WireResponse::error(
                            id,
                            RpcError::new(ERROR_INTERNAL, "internal handler failure"),
                        )));
                    }
                }
            }
        }

        if !outgoing.is_empty() {
            let msg = WireMessage {
                batched,
                objects: outgoing,
            };
            if let Err(e) = self.inner.writer.send(&msg).await {
                warn!("error sending message, closing peer: {e}");
                let _ = self.close().await;
            }
        }
    }

    /// Dispatch one request to the handler and collect its response, if the
    /// request calls for one. Notifications never produce a response, even
    /// when the handler errors.
    async fn handle_request(&self, req: WireRequest) -> Option<WireResponse> {
        let writer = Arc::new(ResponseWriter::new(req.notification, req.id.clone()));
        let request = Request {
            notification: req.notification,
            method: req.method,
            params: req.params,
            peer: self.clone(),
        };
        self.inner.handler.serve_rpc(writer.clone(), request).await;
        if req.notification {
            return None;
        }
        Some(writer.take_response())
    }
}

fn to_params<P: Serialize>(params: P) -> Result<Option<Value>, PeerError> {
    match serde_json::to_value(params)? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

/// Turn a delivered response into the caller-facing outcome.
fn settle(resp: Option<WireResponse>) -> Result<Value, PeerError> {
    let Some(resp) = resp else {
        return Err(PeerError::Closed);
    };
    match resp.error {
        Some(error) => Err(PeerError::Rpc(error)),
        None => Ok(resp.result.unwrap_or(Value::Null)),
    }
}

/// The background demultiplexer. Exactly one per peer.
async fn run_demux(peer: Peer, mut reader: FrameReader) {
    loop {
        let frame = tokio::select! {
            _ = peer.inner.shutdown.cancelled() => break,
            frame = reader.next() => frame,
        };
        match frame {
            None => {
                debug!("transport reached end of stream, closing peer");
                break;
            }
            Some(Err(e)) => {
                debug!("closing peer: {e}");
                break;
            }
            Some(Ok(InboundFrame::Invalid(detail))) => {
                // Recoverable: answer on the wire and keep reading. The
                // codec has already discarded the offending bytes.
                if peer
                    .inner
                    .writer
                    .send_error(
                        RequestId::Null,
                        RpcError::new(ERROR_INVALID_REQUEST, detail),
                    )
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Some(Ok(InboundFrame::Message(msg))) => {
                let batched = msg.batched;
                let mut requests = Vec::new();
                for object in msg.objects {
                    match object {
                        WireObject::Request(req) => requests.push(req),
                        WireObject::Response(resp) => match resp.id.correlation_key() {
                            // A response without a usable id is a generic
                            // error from the remote; nothing to correlate.
                            None => warn!(error = ?resp.error, "received error message"),
                            Some(key) => peer.inner.correlator.fulfil(key, resp).await,
                        },
                    }
                }
                if !requests.is_empty() {
                    // Service on a separate task so handlers that call back
                    // through this peer do not deadlock against the reader.
                    let peer = peer.clone();
                    tokio::spawn(async move { peer.serve_requests(requests, batched).await });
                }
            }
        }
    }
    let _ = peer.inner.writer.close().await;
    peer.inner.done.cancel();
}

struct PendingCall {
    id: i64,
    slot: tokio::sync::mpsc::Receiver<WireResponse>,
    reply: BatchReply,
}

/// The eventual result of a call queued on a [`Batch`]. Empty until the
/// batch is committed.
#[derive(Clone)]
pub struct BatchReply(Arc<OnceLock<Value>>);

impl BatchReply {
    /// The raw result, once [`Batch::commit`] has delivered it.
    pub fn get(&self) -> Option<&Value> {
        self.0.get()
    }
}

/// A batch of requests sent as one frame. Created through
/// [`Peer::batch`]; nothing goes on the wire until
/// [`commit`](Self::commit).
pub struct Batch {
    peer: Peer,
    objects: Vec<WireObject>,
    pending: Vec<PendingCall>,
}

impl Batch {
    /// Queue a notification.
    pub fn notify<P: Serialize>(&mut self, method: &str, params: P) -> Result<(), PeerError> {
        let req = WireRequest::notification(method, to_params(params)?);
        self.objects.push(WireObject::Request(req));
        Ok(())
    }

    /// Queue an RPC. The returned [`BatchReply`] stays empty until the
    /// batch is committed.
    pub fn invoke<P: Serialize>(
        &mut self,
        method: &str,
        params: P,
    ) -> Result<BatchReply, PeerError> {
        let params = to_params(params)?;
        let id = self.peer.next_id();
        let slot = self.peer.inner.correlator.register(id);
        let reply = BatchReply(Arc::new(OnceLock::new()));

        self.objects.push(WireObject::Request(WireRequest::call(
            RequestId::Number(id),
            method,
            params,
        )));
        self.pending.push(PendingCall {
            id,
            slot,
            reply: reply.clone(),
        });
        Ok(reply)
    }

    /// Send the batch as one frame and join all queued calls in insertion
    /// order. If any call failed, the first failure is returned; the
    /// remaining replies are still delivered.
    pub async fn commit(mut self, ctx: &CancellationToken) -> Result<(), PeerError> {
        let objects = std::mem::take(&mut self.objects);
        let pending = std::mem::take(&mut self.pending);
        if objects.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.peer.inner.writer.send(&WireMessage::batch(objects)).await {
            for call in &pending {
                self.peer.inner.correlator.unregister(call.id);
            }
            return Err(e);
        }

        let mut first_error: Option<PeerError> = None;
        // Join serially: every slot buffers its response, so the waiters
        // are already satisfied by the time the first is polled.
        for mut call in pending {
            let outcome = tokio::select! {
                _ = ctx.cancelled() => Err(PeerError::Cancelled),
                _ = self.peer.inner.done.cancelled() => Err(PeerError::Closed),
                resp = call.slot.recv() => {
                    settle(resp).map(|value| {
                        let _ = call.reply.0.set(value);
                    })
                }
            };
            self.peer.inner.correlator.unregister(call.id);
            if let Err(e) = outcome {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        // An uncommitted batch must not leave slots behind.
        for call in self.pending.drain(..) {
            self.peer.inner.correlator.unregister(call.id);
        }
    }
}
