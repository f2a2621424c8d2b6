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

//! Method-name request multiplexer.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::protocol::error::{PeerError, ERROR_METHOD_NOT_FOUND};
use crate::rpc::handler::{Handler, HandlerFn, Request, ResponseWriter};

/// An RPC request multiplexer. It matches the request's method against a
/// table of registered handlers and dispatches to the one that matches.
/// Unrouted calls are answered with method-not-found; unrouted
/// notifications are dropped silently.
#[derive(Default)]
pub struct ServeMux {
    routes: RwLock<HashMap<String, Arc<dyn Handler>>>,
}

impl ServeMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a method. Registering a method twice is an
    /// error.
    pub fn handle(
        &self,
        method: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Result<(), PeerError> {
        let method = method.into();
        let mut routes = self
            .routes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if routes.contains_key(&method) {
            return Err(PeerError::DuplicateMethod(method));
        }
        routes.insert(method, handler);
        Ok(())
    }

    /// Register a closure for a method.
    pub fn handle_fn<F, Fut>(&self, method: impl Into<String>, f: F) -> Result<(), PeerError>
    where
        F: Fn(Arc<ResponseWriter>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.handle(method, Arc::new(HandlerFn(f)))
    }
}

#[async_trait]
impl Handler for ServeMux {
    async fn serve_rpc(&self, w: Arc<ResponseWriter>, r: Request) {
        let route = {
            let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
            routes.get(&r.method).cloned()
        };
        match route {
            Some(handler) => handler.serve_rpc(w, r).await,
            None => {
                if !r.notification {
                    let _ = w.write_error(
                        ERROR_METHOD_NOT_FOUND,
                        format!("method {} not found", r.method),
                    );
                }
            }
        }
    }
}
