use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::pipeline::NonceTag;
use crate::provider::{ProviderOptions, SignerProvider};
use crate::signer::RemoteSigner;
use crate::utils::errors::ConfigError;

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8545))
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Proxy configuration, loaded from TOML.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Upstream JSON-RPC endpoint
    pub upstream: String,
    /// Upstream round-trip timeout in ms; 0 disables it.
    #[serde(default)]
    pub timeout_ms: u64,
    #[serde(default)]
    pub nonce_tag: NonceTag,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Fixed answer for `eth_gasPrice`
    pub gas_price: Option<Value>,
    /// Fixed answer for `eth_accounts`; the signer is asked otherwise.
    pub accounts: Option<Vec<String>>,
    pub signer: SignerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SignerConfig {
    pub url: String,
    #[serde(default)]
    pub timeout_ms: u64,
}

fn timeout(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl ProxyConfig {
    /// Load and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        let cfg: ProxyConfig = toml::from_str(data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.upstream)?;
        Url::parse(&self.signer.url)?;
        match &self.gas_price {
            None | Some(Value::String(_)) | Some(Value::Number(_)) => {}
            Some(other) => {
                return Err(ConfigError::InvalidOption {
                    field: "gas_price",
                    reason: format!("expected a quantity string or integer, got {}", other),
                })
            }
        }
        Ok(())
    }

    pub fn upstream_timeout(&self) -> Option<Duration> {
        timeout(self.timeout_ms)
    }

    /// Wire the remote signer, static overrides and upstream transport together.
    pub fn build_provider(&self) -> Result<SignerProvider, ConfigError> {
        let signer = RemoteSigner::http(&self.signer.url, timeout(self.signer.timeout_ms))?;
        let mut builder = signer.capabilities();
        if let Some(accounts) = &self.accounts {
            builder = builder.static_accounts(accounts.clone());
        }
        if let Some(price) = &self.gas_price {
            builder = builder.static_gas_price(price.clone());
        }

        let mut options = ProviderOptions::new(builder.build()?).with_nonce_tag(self.nonce_tag);
        options.timeout = self.upstream_timeout();
        SignerProvider::http(&self.upstream, options)
    }
}
