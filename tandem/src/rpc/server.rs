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

//! TCP listener glue: one [`Peer`] per accepted connection.
//!
//! A "server" is nothing more than this accept loop; the protocol engine
//! behind every connection is the same symmetric peer a client uses.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::PeerConfig;
use crate::protocol::error::PeerError;
use crate::rpc::handler::Handler;
use crate::rpc::peer::Peer;

type PeerCallback = Box<dyn Fn(Peer) + Send + Sync>;

struct ServerInner {
    handler: Arc<dyn Handler>,
    config: PeerConfig,
    on_peer: Option<PeerCallback>,
    peers: Mutex<Vec<Peer>>,
    shutdown: CancellationToken,
}

/// Accepts connections and runs a [`Peer`] for each. For a single outbound
/// connection, use [`Peer::dial`] instead.
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

impl Server {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self::with_config(handler, PeerConfig::default())
    }

    pub fn with_config(handler: Arc<dyn Handler>, config: PeerConfig) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                handler,
                config,
                on_peer: None,
                peers: Mutex::new(Vec::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Observe every accepted peer, e.g. to invoke RPCs back at connecting
    /// clients. Must be called before [`serve`](Self::serve).
    pub fn on_peer(self, f: impl Fn(Peer) + Send + Sync + 'static) -> Self {
        // The builder runs before serve(), so the Arc has a single owner.
        let mut inner = Arc::try_unwrap(self.inner)
            .unwrap_or_else(|_| panic!("on_peer must be called before the server is shared"));
        inner.on_peer = Some(Box::new(f));
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Serve connections from the listener until [`close`](Self::close) is
    /// called or accepting fails. Each connection gets its own peer running
    /// the shared handler.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), PeerError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(PeerError::ServerClosed);
        }
        loop {
            let accepted = tokio::select! {
                _ = self.inner.shutdown.cancelled() => return Err(PeerError::ServerClosed),
                accepted = listener.accept() => accepted,
            };
            let (stream, addr) = accepted?;
            debug!(%addr, "accepted connection");

            let peer = Peer::with_config(
                stream,
                self.inner.handler.clone(),
                self.inner.config.clone(),
            );
            self.track(peer.clone());
            if let Some(on_peer) = &self.inner.on_peer {
                on_peer(peer.clone());
            }

            // Reap the entry once the peer's demultiplexer exits.
            let server = self.clone();
            tokio::spawn(async move {
                peer.done().await;
                server.untrack(&peer);
            });
        }
    }

    /// Stop serving and close every live peer. Idempotent; returns the
    /// first close error, if any.
    pub async fn close(&self) -> Result<(), PeerError> {
        self.inner.shutdown.cancel();
        let peers: Vec<Peer> = {
            let mut guard = self
                .inner
                .peers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            guard.drain(..).collect()
        };

        let mut first_error = None;
        for peer in peers {
            if let Err(e) = peer.close().await {
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

    fn track(&self, peer: Peer) {
        self.inner
            .peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(peer);
    }

    fn untrack(&self, peer: &Peer) {
        self.inner
            .peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|p| !p.same_peer(peer));
    }
}
