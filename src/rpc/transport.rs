//! Upstream transport abstraction.
//!
//! A `Transport` moves one request envelope to the upstream node and returns
//! its response envelope as received. `RpcClient` sits on top and issues
//! requests the provider synthesizes itself, allocating their ids.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::rpc::envelope::{Request, Response};
use crate::utils::errors::TransportError;

/// Upstream JSON-RPC transport (implement for HTTP, WS, IPC, mocks)
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send `request` and return the upstream response, including responses
    /// that carry a JSON-RPC `error` member.
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

/// Issues provider-originated calls against a transport.
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    request_id: AtomicU64,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport, request_id: AtomicU64::new(1) }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Call `method` and return its result member.
    pub async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let request = Request::new(self.next_request_id(), method, params);
        self.transport.send(request).await?.into_result()
    }
}
