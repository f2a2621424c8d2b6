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

//! Response correlation: outstanding call id to waiting caller.
//!
//! Ownership rule: callers insert and remove their own slots; the
//! demultiplexer only deposits. A cancelled caller simply removes its entry
//! and any late response misses cleanly, which keeps delivery and
//! cancellation from racing over slot lifetime.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::protocol::wire::WireResponse;

pub(crate) struct Correlator {
    slots: Mutex<HashMap<i64, mpsc::Sender<WireResponse>>>,
    deposit_timeout: Duration,
}

impl Correlator {
    pub fn new(deposit_timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            deposit_timeout,
        }
    }

    /// Insert a slot for a freshly generated id. Must happen before the
    /// request is handed to the transport.
    pub fn register(&self, id: i64) -> mpsc::Receiver<WireResponse> {
        // Capacity 1: the slot holds the response even if the caller is not
        // yet parked on it.
        let (tx, rx) = mpsc::channel(1);
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        rx
    }

    /// Remove a slot. Called by the owning caller on completion or
    /// cancellation, never by the demultiplexer.
    pub fn unregister(&self, id: i64) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Deposit a response into the slot for `id`. Spurious and duplicate
    /// responses are dropped with a warning; a slot that is not consumed
    /// within the deposit window is skipped rather than stalling the peer.
    pub async fn fulfil(&self, id: i64, response: WireResponse) {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned();
        let Some(slot) = slot else {
            warn!(id, "missing listener for message response");
            return;
        };
        if slot
            .send_timeout(response, self.deposit_timeout)
            .await
            .is_err()
        {
            warn!(id, "unresponsive listener, dropping response");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::id::RequestId;

    fn response(id: i64) -> WireResponse {
        WireResponse::result(RequestId::Number(id), serde_json::json!(id))
    }

    #[tokio::test]
    async fn test_register_fulfil_consume() {
        let correlator = Correlator::new(Duration::from_millis(50));
        let mut slot = correlator.register(1);
        correlator.fulfil(1, response(1)).await;
        let got = slot.recv().await.unwrap();
        assert_eq!(got.id, RequestId::Number(1));
        correlator.unregister(1);
    }

    #[tokio::test]
    async fn test_fulfil_unknown_id_is_dropped() {
        let correlator = Correlator::new(Duration::from_millis(50));
        correlator.fulfil(99, response(99)).await;
    }

    #[tokio::test]
    async fn test_fulfil_after_unregister_is_dropped() {
        let correlator = Correlator::new(Duration::from_millis(50));
        let slot = correlator.register(1);
        correlator.unregister(1);
        correlator.fulfil(1, response(1)).await;
        drop(slot);
    }

    #[tokio::test]
    async fn test_duplicate_response_times_out() {
        let correlator = Correlator::new(Duration::from_millis(20));
        let mut slot = correlator.register(1);
        correlator.fulfil(1, response(1)).await;
        // Slot is full and nobody is consuming: the duplicate must be
        // dropped after the bounded wait instead of wedging the caller.
        correlator.fulfil(1, response(1)).await;
        assert!(slot.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_demultiplexer_never_blocks_on_dead_caller() {
        let correlator = Correlator::new(Duration::from_millis(20));
        let slot = correlator.register(1);
        drop(slot);
        // Receiver gone but entry still present: deposit returns promptly.
        correlator.fulfil(1, response(1)).await;
    }
}
