use std::time::Duration;

use crate::pipeline::NonceTag;
use crate::provider::capabilities::Capabilities;

/// Construction options for `SignerProvider`.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub capabilities: Capabilities,
    /// Round-trip timeout for the default HTTP transport; `None` disables it.
    pub timeout: Option<Duration>,
    pub nonce_tag: NonceTag,
}

impl ProviderOptions {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities, timeout: None, nonce_tag: NonceTag::default() }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_nonce_tag(mut self, tag: NonceTag) -> Self {
        self.nonce_tag = tag;
        self
    }
}
