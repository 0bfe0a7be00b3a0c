//! Binary wiring: TOML config and the `signer-provider` CLI.

pub mod cli;
pub mod config;

pub use cli::run_cli;
pub use config::{ProxyConfig, SignerConfig};
