use thiserror::Error;

use crate::rpc::envelope::JsonRpcError;

/// JSON-RPC code used for failures that have no more specific mapping.
pub const SERVER_ERROR: i64 = -32000;
/// JSON-RPC code for malformed or missing params.
pub const INVALID_PARAMS: i64 = -32602;

/// Raised while building a provider; never retried.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing mandatory capability `{0}`")]
    MissingCapability(&'static str),

    #[error("invalid option `{field}`: {reason}")]
    InvalidOption { field: &'static str, reason: String },

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// An injected capability rejected or panicked.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("capability `{capability}` failed: {source}")]
    Rejected {
        capability: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("capability `{capability}` panicked")]
    Panicked { capability: &'static str },
}

/// Failure reported by the upstream transport.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json-rpc error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Step of the submission pipeline a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Nonce,
    GasPrice,
    GasEstimate,
    Signing,
    Relay,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Nonce => "nonce resolution",
            PipelineStage::GasPrice => "gas price resolution",
            PipelineStage::GasEstimate => "gas estimation",
            PipelineStage::Signing => "transaction signing",
            PipelineStage::Relay => "raw transaction relay",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    #[source]
    pub source: Box<ProviderError>,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, source: impl Into<ProviderError>) -> Self {
        Self { stage, source: Box::new(source.into()) }
    }
}

/// Everything `SignerProvider::handle` can fail with.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Convert into the error member of a JSON-RPC response.
    ///
    /// Upstream JSON-RPC errors keep their original code and message.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        match self {
            ProviderError::Transport(TransportError::Rpc(e)) => e.clone(),
            ProviderError::Pipeline(p) => match p.source.as_ref() {
                ProviderError::Transport(TransportError::Rpc(e)) => e.clone(),
                ProviderError::InvalidRequest(_) => {
                    JsonRpcError::new(INVALID_PARAMS, self.to_string())
                }
                _ => JsonRpcError::new(SERVER_ERROR, self.to_string()),
            },
            ProviderError::InvalidRequest(_) => JsonRpcError::new(INVALID_PARAMS, self.to_string()),
            _ => JsonRpcError::new(SERVER_ERROR, self.to_string()),
        }
    }
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, ProviderError>;
