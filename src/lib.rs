//! JSON-RPC provider that keeps signing local.
//!
//! Methods that need signing material (`eth_sendTransaction`, typed-data and
//! message signing) are served through injected capabilities; everything else
//! is forwarded to the upstream transport unchanged. Transactions are queued
//! per provider so nonce resolution, signing and relay never interleave.

pub mod app;
pub mod pipeline;
pub mod provider;
pub mod rpc;
pub mod signer;
pub mod utils;


pub use pipeline::NonceTag;
pub use provider::{
    Capabilities, CapabilitiesBuilder, ProviderOptions, SignerProvider, TransactionObject,
};
pub use rpc::{HttpTransport, JsonRpcError, Request, Response, Transport};
pub use utils::errors::{ConfigError, ProviderError};
