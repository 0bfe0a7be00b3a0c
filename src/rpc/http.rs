use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::rpc::envelope::{Request, Response};
use crate::rpc::transport::Transport;
use crate::utils::errors::{ConfigError, TransportError};

/// JSON-RPC over HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    /// `timeout` bounds each round trip; `None` waits indefinitely.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint)?;
        let mut builder = Client::builder().use_rustls_tls();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().map_err(ConfigError::HttpClient)?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        debug!(method = %request.method, endpoint = %self.endpoint, "http request");
        let resp = self.client.post(self.endpoint.clone()).json(&request).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        // nodes often pair non-2xx statuses with a valid error envelope
        match serde_json::from_slice::<Response>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(e) if status.is_success() => Err(TransportError::Json(e)),
            Err(_) => Err(TransportError::InvalidResponse(format!(
                "http status {}: {}",
                status,
                String::from_utf8_lossy(&body)
            ))),
        }
    }
}
