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

use std::time::Duration;

/// How long the demultiplexer will wait to deposit a response into a
/// caller's slot before dropping it.
pub const DEFAULT_DEPOSIT_TIMEOUT: Duration = Duration::from_millis(500);

/// Upper bound on a single inbound frame. Exceeding it is a terminal
/// transport error.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Tunables for a [`crate::Peer`].
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Bounded wait when delivering a response to a caller. A caller that
    /// does not consume its slot within this window loses the response
    /// instead of wedging every other call on the connection.
    pub deposit_timeout: Duration,
    /// Maximum size of one inbound frame in bytes.
    pub max_frame_bytes: usize,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            deposit_timeout: DEFAULT_DEPOSIT_TIMEOUT,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}
