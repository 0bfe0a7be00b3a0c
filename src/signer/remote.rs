//! RemoteSigner: capabilities backed by an external JSON-RPC signing service
//! (clef / web3signer style).
//!
//! The signing methods are called on the service with the same names and
//! positional params they arrived with; `eth_signTransaction` may answer with a
//! bare hex string or with an object carrying it under `raw`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use serde_json::Value;

use crate::provider::capabilities::{CapabilitiesBuilder, TransactionObject};
use crate::rpc::http::HttpTransport;
use crate::rpc::transport::{RpcClient, Transport};
use crate::utils::errors::ConfigError;

#[derive(Clone)]
pub struct RemoteSigner {
    rpc: Arc<RpcClient>,
}

impl RemoteSigner {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { rpc: Arc::new(RpcClient::new(transport)) }
    }

    pub fn http(url: &str, timeout: Option<Duration>) -> Result<Self, ConfigError> {
        Ok(Self::new(Arc::new(HttpTransport::new(url, timeout)?)))
    }

    pub async fn accounts(&self) -> anyhow::Result<Vec<String>> {
        let v = self.rpc.request("eth_accounts", vec![]).await?;
        Ok(serde_json::from_value(v)?)
    }

    pub async fn sign_transaction(&self, tx: TransactionObject) -> anyhow::Result<String> {
        let v = self.rpc.request("eth_signTransaction", vec![Value::Object(tx)]).await?;
        match v {
            Value::String(raw) => Ok(raw),
            Value::Object(ref obj) => match obj.get("raw") {
                Some(Value::String(raw)) => Ok(raw.clone()),
                _ => Err(anyhow!("signer response has no `raw` field: {}", v)),
            },
            other => Err(anyhow!("unexpected signer response: {}", other)),
        }
    }

    async fn signature(&self, method: &str, params: Vec<Value>) -> anyhow::Result<String> {
        match self.rpc.request(method, params).await? {
            Value::String(sig) => Ok(sig),
            other => Err(anyhow!("{} returned a non-string signature: {}", method, other)),
        }
    }

    /// A builder with every signing capability and `accounts` wired to this signer.
    pub fn capabilities(&self) -> CapabilitiesBuilder {
        let (s1, s2, s3, s4, s5, s6) =
            (self.clone(), self.clone(), self.clone(), self.clone(), self.clone(), self.clone());
        CapabilitiesBuilder::default()
            .accounts(move || {
                let s = s1.clone();
                async move { s.accounts().await }
            })
            .sign_transaction(move |tx| {
                let s = s2.clone();
                async move { s.sign_transaction(tx).await }
            })
            .sign_typed_data(move |data| {
                let s = s3.clone();
                async move { s.signature("eth_signTypedData", vec![data]).await }
            })
            .sign_typed_data_v3(move |a, b| {
                let s = s4.clone();
                async move { s.signature("eth_signTypedData_v3", vec![a, b]).await }
            })
            .sign_message(move |a, b| {
                let s = s5.clone();
                async move { s.signature("eth_sign", vec![a, b]).await }
            })
            .sign_personal_message(move |a, b| {
                let s = s6.clone();
                async move { s.signature("personal_sign", vec![a, b]).await }
            })
    }
}
