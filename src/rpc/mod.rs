//! RPC module
//!
//! - `envelope`: JSON-RPC 2.0 request / response types
//! - `transport`: upstream `Transport` trait and the id-allocating `RpcClient`
//! - `http`: reqwest-based HTTP transport with optional timeout
//! - `server`: axum endpoint exposing a provider over HTTP

pub mod envelope;
pub mod http;
pub mod server;
pub mod transport;

pub use envelope::{JsonRpcError, Request, Response};
pub use http::HttpTransport;
pub use server::ProxyServer;
pub use transport::{RpcClient, Transport};
