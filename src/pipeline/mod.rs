//! Submission pipeline for `eth_sendTransaction`.
//!
//! - `SubmissionQueue`: per-provider FIFO of transaction jobs drained by a single task
//! - `submit::process`: nonce → gas price / gas limit → sign → relay for one job
//!
//! The pipeline reaches the rest of the system only through `PipelineDeps`,
//! which the provider implements.

pub mod queue;
pub mod submit;

pub use queue::{Job, SubmissionQueue};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider::capabilities::TransactionObject;
use crate::rpc::envelope::{Request, Response};
use crate::utils::errors::{CapabilityError, ProviderError, TransportError};

/// Block tag used when querying the sender's transaction count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceTag {
    /// Counts transactions still in the upstream mempool.
    #[default]
    Pending,
    Latest,
}

impl NonceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            NonceTag::Pending => "pending",
            NonceTag::Latest => "latest",
        }
    }
}

/// Dependencies the pipeline requires.
#[async_trait]
pub trait PipelineDeps: Clone + Send + Sync + 'static {
    /// Route a request through the dispatcher, so local overrides apply.
    async fn dispatch(&self, request: Request) -> Result<Response, ProviderError>;

    /// Call the upstream directly, bypassing local overrides.
    async fn call_upstream(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, TransportError>;

    /// Hand a finished envelope to the upstream transport.
    async fn relay(&self, request: Request) -> Result<Response, TransportError>;

    async fn sign_transaction(&self, tx: TransactionObject) -> Result<String, CapabilityError>;

    fn nonce_tag(&self) -> NonceTag;
}
