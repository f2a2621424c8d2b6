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

//! Framed transport over a duplex byte stream.
//!
//! The read half is consumed by the peer's demultiplexer; the write half is
//! shared behind a mutex so that two sends never interleave bytes on the
//! wire. Every send flushes, so the remote never deadlocks waiting on bytes
//! buffered at the sender.

use futures_util::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::debug;

use crate::protocol::error::{PeerError, RpcError};
use crate::protocol::id::RequestId;
use crate::protocol::wire::{WireMessage, WireObject, WireResponse};
use crate::rpc::codec::JsonFrameCodec;

pub type FrameReader = FramedRead<Box<dyn AsyncRead + Send + Unpin>, JsonFrameCodec>;
type FrameSink = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, JsonFrameCodec>;

/// The write side of the connection. Cheap to share; serializes all sends.
pub struct MessageWriter {
    sink: Mutex<Option<FrameSink>>,
}

impl MessageWriter {
    fn new(sink: FrameSink) -> Self {
        Self {
            sink: Mutex::new(Some(sink)),
        }
    }

    /// Send one message and flush it.
    pub async fn send(&self, msg: &WireMessage) -> Result<(), PeerError> {
        let mut guard = self.sink.lock().await;
        match guard.as_mut() {
            Some(sink) => sink.send(msg).await,
            None => Err(PeerError::Closed),
        }
    }

    /// Send an error response for the given id as a single-frame message.
    pub async fn send_error(&self, id: RequestId, error: RpcError) -> Result<(), PeerError> {
        self.send(&WireMessage::single(WireObject::Response(
            WireResponse::error(id, error),
        )))
        .await
    }

    /// Flush and shut down the write half. Idempotent; later sends fail
    /// with [`PeerError::Closed`].
    pub async fn close(&self) -> Result<(), PeerError> {
        if let Some(mut sink) = self.sink.lock().await.take() {
            debug!("closing transport writer");
            sink.close().await?;
        }
        Ok(())
    }
}

/// Splits a duplex stream into a frame reader for the demultiplexer and a
/// shared [`MessageWriter`].
pub fn split_transport<T>(io: T, max_frame_bytes: usize) -> (FrameReader, MessageWriter)
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (read_half, write_half) = tokio::io::split(io);
    let reader = FramedRead::new(
        Box::new(read_half) as Box<dyn AsyncRead + Send + Unpin>,
        JsonFrameCodec::new(max_frame_bytes),
    );
    let writer = MessageWriter::new(FramedWrite::new(
        Box::new(write_half) as Box<dyn AsyncWrite + Send + Unpin>,
        JsonFrameCodec::new(max_frame_bytes),
    ));
    (reader, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire::WireRequest;
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_round_trip_over_duplex_pipe() {
        let (a, b) = tokio::io::duplex(1024);
        let (_reader_a, writer_a) = split_transport(a, 1024);
        let (mut reader_b, _writer_b) = split_transport(b, 1024);

        let msg = WireMessage::single(WireObject::Request(WireRequest::call(
            crate::RequestId::Number(1),
            "ping",
            None,
        )));
        writer_a.send(&msg).await.unwrap();

        let frame = reader_b.next().await.unwrap().unwrap();
        match frame {
            crate::rpc::codec::InboundFrame::Message(got) => assert_eq!(got, msg),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_ends_remote_stream() {
        let (a, b) = tokio::io::duplex(1024);
        let (_reader_a, writer_a) = split_transport(a, 1024);
        let (mut reader_b, _writer_b) = split_transport(b, 1024);

        writer_a.close().await.unwrap();
        writer_a.close().await.unwrap();
        assert!(matches!(
            writer_a
                .send(&WireMessage::single(WireObject::Request(
                    WireRequest::notification("x", None)
                )))
                .await,
            Err(PeerError::Closed)
        ));

        // Remote reader observes end of stream.
        assert!(reader_b.next().await.is_none());
    }

    #[tokio::test]
    async fn test_truncated_frame_at_eof_is_an_error() {
        let (a, b) = tokio::io::duplex(1024);
        let (mut reader_b, _writer_b) = split_transport(b, 1024);

        let (_read_a, mut write_a) = tokio::io::split(a);
        write_a.write_all(br#"{"jsonrpc":"2.0","#).await.unwrap();
        write_a.shutdown().await.unwrap();

        // decode_eof reports the dangling bytes as a terminal error.
        let last = reader_b.next().await;
        assert!(matches!(last, Some(Err(_))));
    }
}
