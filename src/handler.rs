//! Handler registration and dispatch for the RPC server.
//!
//! This module provides:
//! - The core `RpcHandler` trait that must be implemented to expose a method
//!   over RPC
//! - An adapter turning plain async closures into handlers
//! - The `DispatchTable` mapping `(service, method)` names to handlers
//!
//! Handlers receive the invocation's JSON argument object and return a JSON
//! value, failing with any [`anyhow::Error`]; the server turns a failure into
//! an error response for the caller. Registration happens before or while the
//! server runs, so the table supports concurrent lookup from every connection
//! task while registrations are serialized.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::protocol::error::AlreadyRegistered;

/// A callable method exposed over RPC.
///
/// Implementations must be shareable across connection tasks; a handler may
/// be invoked concurrently for calls arriving on different connections.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    /// Handles one invocation, receiving the caller's argument object.
    async fn handle(&self, args: Value) -> Result<Value, anyhow::Error>;
}

/// Wraps an async closure as an [`RpcHandler`]. Built by [`handler_fn`].
pub struct HandlerFn<F> {
    f: F,
}

/// Adapts a plain async closure into a handler.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, anyhow::Error>> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> RpcHandler for HandlerFn<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, anyhow::Error>> + Send + 'static,
{
    async fn handle(&self, args: Value) -> Result<Value, anyhow::Error> {
        (self.f)(args).await
    }
}

/// Maps `(service, method)` pairs to their registered handlers.
///
/// Lookups happen on every invocation from every connection task, so the
/// table sits behind a read/write lock: reads are concurrent, registrations
/// exclusive. Registering a pair that is already present is rejected and
/// leaves the existing handler in place.
#[derive(Default)]
pub struct DispatchTable {
    handlers: RwLock<HashMap<(String, String), Arc<dyn RpcHandler>>>,
}

impl DispatchTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under a service and method name.
    ///
    /// Fails with [`AlreadyRegistered`] if the pair is taken; the original
    /// registration is not disturbed.
    pub fn register(
        &self,
        service: impl Into<String>,
        method: impl Into<String>,
        handler: Arc<dyn RpcHandler>,
    ) -> Result<(), AlreadyRegistered> {
        let key = (service.into(), method.into());
        let mut handlers = self.handlers.write().expect("unable to lock handler table");
        match handlers.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(handler);
                Ok(())
            }
            Entry::Occupied(slot) => {
                let (service, method) = slot.key().clone();
                Err(AlreadyRegistered { service, method })
            }
        }
    }

    /// Looks up the handler registered for a service and method, if any.
    pub fn lookup(&self, service: &str, method: &str) -> Option<Arc<dyn RpcHandler>> {
        let key = (service.to_string(), method.to_string());
        let handlers = self.handlers.read().expect("unable to lock handler table");
        handlers.get(&key).cloned()
    }
}
