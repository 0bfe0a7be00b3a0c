//! SignerProvider: classifies each request by method and resolves it locally,
//! queues it for submission, or forwards it upstream untouched.
//!
//! Decision list, first match wins:
//! - `eth_accounts`, `eth_getTransactionCount`, `eth_gasPrice` → capability, if configured
//! - `eth_sendTransaction` → submission queue
//! - `eth_signTypedData`, `eth_signTypedData_v3`, `eth_sign`, `personal_sign` → capability,
//!   if configured
//! - anything else → transport, response returned verbatim

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::pipeline::{NonceTag, PipelineDeps, SubmissionQueue};
use crate::provider::capabilities::{
    invoke, AccountsFn, Capabilities, GasPrice, SignDataFn, SignPairFn, TransactionCountFn,
    TransactionObject,
};
use crate::provider::options::ProviderOptions;
use crate::rpc::envelope::{Request, Response};
use crate::rpc::http::HttpTransport;
use crate::rpc::transport::{RpcClient, Transport};
use crate::utils::errors::{CapabilityError, ConfigError, ProviderError, Result, TransportError};
use crate::utils::metrics::{FORWARDED, METRICS, RESOLVED_LOCALLY};

/// Where a request goes.
enum Route<'a> {
    Accounts(&'a AccountsFn),
    TransactionCount(&'a TransactionCountFn),
    GasPrice(&'a GasPrice),
    SendTransaction,
    SignTypedData(&'a SignDataFn),
    /// Capability name + function for the two-argument signing methods.
    SignPair(&'static str, &'a SignPairFn),
    Forward,
}

struct Inner {
    capabilities: Capabilities,
    rpc: RpcClient,
    queue: SubmissionQueue,
    nonce_tag: NonceTag,
}

/// JSON-RPC provider that signs locally and forwards the rest (cheap to clone).
#[derive(Clone)]
pub struct SignerProvider {
    inner: Arc<Inner>,
}

impl SignerProvider {
    /// Build on top of any transport; this is also how a custom transport
    /// replaces the default HTTP one.
    pub fn new(transport: Arc<dyn Transport>, options: ProviderOptions) -> Self {
        info!(
            capabilities = ?options.capabilities.present(),
            nonce_tag = options.nonce_tag.as_str(),
            "signer provider created"
        );
        Self {
            inner: Arc::new(Inner {
                capabilities: options.capabilities,
                rpc: RpcClient::new(transport),
                queue: SubmissionQueue::new(),
                nonce_tag: options.nonce_tag,
            }),
        }
    }

    /// Build with an HTTP transport to `endpoint`, honouring `options.timeout`.
    pub fn http(
        endpoint: &str,
        options: ProviderOptions,
    ) -> std::result::Result<Self, ConfigError> {
        let transport = HttpTransport::new(endpoint, options.timeout)?;
        Ok(Self::new(Arc::new(transport), options))
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.inner.capabilities
    }

    /// Transactions waiting behind the one currently in flight.
    pub fn queued_transactions(&self) -> usize {
        self.inner.queue.len()
    }

    fn route(&self, method: &str) -> Route<'_> {
        let caps = &self.inner.capabilities;
        let route = match method {
            "eth_accounts" => caps.accounts.as_ref().map(Route::Accounts),
            "eth_getTransactionCount" => {
                caps.get_transaction_count.as_ref().map(Route::TransactionCount)
            }
            "eth_gasPrice" => caps.gas_price.as_ref().map(Route::GasPrice),
            "eth_sendTransaction" => Some(Route::SendTransaction),
            "eth_signTypedData" => caps.sign_typed_data.as_ref().map(Route::SignTypedData),
            "eth_signTypedData_v3" => caps
                .sign_typed_data_v3
                .as_ref()
                .map(|f| Route::SignPair("sign_typed_data_v3", f)),
            "eth_sign" => caps.sign_message.as_ref().map(|f| Route::SignPair("sign_message", f)),
            "personal_sign" => caps
                .sign_personal_message
                .as_ref()
                .map(|f| Route::SignPair("sign_personal_message", f)),
            _ => None,
        };
        route.unwrap_or(Route::Forward)
    }

    /// Handle one request. Exactly one outcome is produced per request;
    /// capability failures and panics come back as errors.
    pub async fn handle(&self, request: Request) -> Result<Response> {
        debug!(method = %request.method, id = %request.id_or_null(), "dispatching request");
        let result = match self.route(&request.method) {
            Route::Accounts(f) => {
                let f = f.clone();
                let accounts = invoke("accounts", move || f()).await?;
                json!(accounts)
            }
            Route::TransactionCount(f) => {
                let f = f.clone();
                let params = request.params_list();
                invoke("get_transaction_count", move || f(params)).await?
            }
            Route::GasPrice(GasPrice::Static(price)) => price.clone(),
            Route::GasPrice(GasPrice::Dynamic(f)) => {
                let f = f.clone();
                invoke("gas_price", move || f()).await?
            }
            Route::SendTransaction => return self.submit_transaction(request).await,
            Route::SignTypedData(f) => {
                let f = f.clone();
                let data = required_param(&request, 0)?;
                Value::String(invoke("sign_typed_data", move || f(data)).await?)
            }
            Route::SignPair(name, f) => {
                let f = f.clone();
                let first = required_param(&request, 0)?;
                let second = required_param(&request, 1)?;
                Value::String(invoke(name, move || f(first, second)).await?)
            }
            Route::Forward => {
                METRICS.inc_counter(FORWARDED);
                return Ok(self.inner.rpc.transport().send(request).await?);
            }
        };
        METRICS.inc_counter(RESOLVED_LOCALLY);
        Ok(Response::result(&request, result))
    }

    /// Callback form of `handle`: runs the request on the current tokio
    /// runtime and invokes `callback` exactly once.
    ///
    /// Outside a runtime nothing is spawned; `callback` is invoked
    /// immediately with `ProviderError::Internal`.
    pub fn send_async<F>(&self, request: Request, callback: F)
    where
        F: FnOnce(Result<Response>) + Send + 'static,
    {
        match Handle::try_current() {
            Ok(handle) => self.send_async_on(&handle, request, callback),
            Err(e) => {
                warn!(method = %request.method, error = %e, "send_async without a runtime");
                callback(Err(ProviderError::Internal(format!("no tokio runtime: {}", e))));
            }
        }
    }

    /// `send_async` on an explicit runtime, callable from any thread.
    pub fn send_async_on<F>(&self, runtime: &Handle, request: Request, callback: F)
    where
        F: FnOnce(Result<Response>) + Send + 'static,
    {
        let provider = self.clone();
        runtime.spawn(async move {
            callback(provider.handle(request).await);
        });
    }

    async fn submit_transaction(&self, request: Request) -> Result<Response> {
        debug!(id = %request.id_or_null(), queued = self.inner.queue.len(), "queueing transaction");
        let rx = self.inner.queue.submit(self.clone(), request);
        rx.await
            .map_err(|_| ProviderError::Internal("submission queue dropped the job".into()))?
    }
}

fn required_param(request: &Request, index: usize) -> Result<Value> {
    request.param(index).cloned().ok_or_else(|| {
        ProviderError::InvalidRequest(format!("{} expects params[{}]", request.method, index))
    })
}

#[async_trait]
impl PipelineDeps for SignerProvider {
    async fn dispatch(&self, request: Request) -> Result<Response> {
        self.handle(request).await
    }

    async fn call_upstream(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> std::result::Result<Value, TransportError> {
        self.inner.rpc.request(method, params).await
    }

    async fn relay(&self, request: Request) -> std::result::Result<Response, TransportError> {
        self.inner.rpc.transport().send(request).await
    }

    async fn sign_transaction(
        &self,
        tx: TransactionObject,
    ) -> std::result::Result<String, CapabilityError> {
        self.inner.capabilities.sign_transaction(tx).await
    }

    fn nonce_tag(&self) -> NonceTag {
        self.inner.nonce_tag
    }
}
