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

//! Frame codec for self-delimited JSON.
//!
//! There is no length prefix on the wire: frames are whole top-level JSON
//! values, and the decoder finds their boundaries with a byte-level scan
//! (bracket depth plus string/escape state). A frame that is complete but
//! not a valid JSON-RPC message surfaces as [`InboundFrame::Invalid`] with
//! its bytes consumed, so the stream is positioned at the next value and
//! reading can continue past the bad frame.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::config::DEFAULT_MAX_FRAME_BYTES;
use crate::protocol::error::PeerError;
use crate::protocol::wire::WireMessage;

/// One decoded frame.
#[derive(Debug)]
pub enum InboundFrame {
    Message(WireMessage),
    /// A complete frame arrived but was not a valid JSON-RPC message. The
    /// offending bytes have been consumed; reading may continue.
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default)]
struct ScanState {
    /// How far into the buffer the scan has progressed.
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

pub struct JsonFrameCodec {
    max_frame_bytes: usize,
    scan: ScanState,
}

impl JsonFrameCodec {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            max_frame_bytes,
            scan: ScanState::default(),
        }
    }
}

impl Default for JsonFrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

fn is_json_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn parse_frame(frame: &[u8]) -> InboundFrame {
    match serde_json::from_slice::<WireMessage>(frame) {
        Ok(msg) => InboundFrame::Message(msg),
        Err(e) => InboundFrame::Invalid(e.to_string()),
    }
}

impl Decoder for JsonFrameCodec {
    type Item = InboundFrame;
    type Error = PeerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<InboundFrame>, PeerError> {
        if self.scan.pos == 0 {
            // Between frames: discard whitespace, then sanity-check the
            // first byte. Every legal frame is an object or an array.
            let ws = src.iter().take_while(|b| is_json_whitespace(**b)).count();
            src.advance(ws);
            let first = match src.first() {
                Some(b) => *b,
                None => return Ok(None),
            };
            if first != b'{' && first != b'[' {
                let end = src
                    .iter()
                    .position(|b| *b == b'{' || *b == b'[')
                    .unwrap_or(src.len());
                let garbage = src.split_to(end);
                trace!(len = garbage.len(), "discarding non-JSON bytes");
                return Ok(Some(InboundFrame::Invalid(format!(
                    "frame does not start a JSON object or array: {:.40}",
                    String::from_utf8_lossy(&garbage)
                ))));
            }
        }

        let mut i = self.scan.pos;
        while i < src.len() {
            let b = src[i];
            if self.scan.in_string {
                if self.scan.escaped {
                    self.scan.escaped = false;
                } else if b == b'\\' {
                    self.scan.escaped = true;
                } else if b == b'"' {
                    self.scan.in_string = false;
                }
            } else {
                match b {
                    b'"' => self.scan.in_string = true,
                    b'{' | b'[' => self.scan.depth += 1,
                    b'}' | b']' => {
                        // A mismatched closer still terminates the scan; the
                        // JSON parse below rejects the frame and the bytes
                        // are consumed either way.
                        self.scan.depth = self.scan.depth.saturating_sub(1);
                        if self.scan.depth == 0 {
                            let frame = src.split_to(i + 1);
                            self.scan = ScanState::default();
                            return Ok(Some(parse_frame(&frame)));
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }

        self.scan.pos = i;
        if src.len() > self.max_frame_bytes {
            return Err(PeerError::FrameTooLarge {
                limit: self.max_frame_bytes,
            });
        }
        Ok(None)
    }
}

impl<'a> Encoder<&'a WireMessage> for JsonFrameCodec {
    type Error = PeerError;

    fn encode(&mut self, msg: &'a WireMessage, dst: &mut BytesMut) -> Result<(), PeerError> {
        let body = serde_json::to_vec(msg)?;
        dst.reserve(body.len() + 1);
        dst.extend_from_slice(&body);
        // Inter-frame whitespace, so line-oriented remotes stay happy.
        dst.put_u8(b'\n');
        Ok(())
    }
}
