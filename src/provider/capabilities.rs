//! Capability set: the externally supplied functions the provider invokes for
//! operations it does not implement itself (account listing, signing).
//!
//! Every capability is an async function returning `anyhow::Result`, so any
//! signer backend can report failures with its own error type. Only
//! `sign_transaction` is mandatory; an absent optional capability makes the
//! provider forward the matching method upstream instead.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};

use crate::utils::errors::{CapabilityError, ConfigError};

/// Transaction object handed to `sign_transaction` (`params[0]` of
/// `eth_sendTransaction` plus the resolved fields).
pub type TransactionObject = Map<String, Value>;

pub type CapabilityFuture<T> = BoxFuture<'static, anyhow::Result<T>>;

pub(crate) type AccountsFn = Arc<dyn Fn() -> CapabilityFuture<Vec<String>> + Send + Sync>;
pub(crate) type TransactionCountFn =
    Arc<dyn Fn(Vec<Value>) -> CapabilityFuture<Value> + Send + Sync>;
pub(crate) type GasPriceFn = Arc<dyn Fn() -> CapabilityFuture<Value> + Send + Sync>;
pub(crate) type SignTransactionFn =
    Arc<dyn Fn(TransactionObject) -> CapabilityFuture<String> + Send + Sync>;
pub(crate) type SignDataFn = Arc<dyn Fn(Value) -> CapabilityFuture<String> + Send + Sync>;
pub(crate) type SignPairFn = Arc<dyn Fn(Value, Value) -> CapabilityFuture<String> + Send + Sync>;

/// `eth_gasPrice` override: a fixed quantity or a function producing one.
#[derive(Clone)]
pub enum GasPrice {
    Static(Value),
    Dynamic(GasPriceFn),
}

/// Immutable set of injected capabilities, shared by all requests of a provider.
#[derive(Clone)]
pub struct Capabilities {
    pub(crate) accounts: Option<AccountsFn>,
    pub(crate) get_transaction_count: Option<TransactionCountFn>,
    pub(crate) gas_price: Option<GasPrice>,
    pub(crate) sign_transaction: SignTransactionFn,
    pub(crate) sign_typed_data: Option<SignDataFn>,
    pub(crate) sign_typed_data_v3: Option<SignPairFn>,
    pub(crate) sign_message: Option<SignPairFn>,
    pub(crate) sign_personal_message: Option<SignPairFn>,
}

impl Capabilities {
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::default()
    }

    /// Names of the capabilities that are configured.
    pub fn present(&self) -> Vec<&'static str> {
        let mut names = vec!["sign_transaction"];
        let optional = [
            ("accounts", self.accounts.is_some()),
            ("get_transaction_count", self.get_transaction_count.is_some()),
            ("gas_price", self.gas_price.is_some()),
            ("sign_typed_data", self.sign_typed_data.is_some()),
            ("sign_typed_data_v3", self.sign_typed_data_v3.is_some()),
            ("sign_message", self.sign_message.is_some()),
            ("sign_personal_message", self.sign_personal_message.is_some()),
        ];
        names.extend(optional.iter().filter(|(_, on)| *on).map(|(name, _)| *name));
        names
    }

    pub(crate) async fn sign_transaction(
        &self,
        tx: TransactionObject,
    ) -> Result<String, CapabilityError> {
        let f = self.sign_transaction.clone();
        invoke("sign_transaction", move || f(tx)).await
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities").field("present", &self.present()).finish()
    }
}

/// Run a capability, converting rejections and panics into `CapabilityError`.
///
/// The capability is called inside the guarded future so a panic raised
/// before its first await is caught as well.
pub(crate) async fn invoke<T, F>(capability: &'static str, call: F) -> Result<T, CapabilityError>
where
    F: FnOnce() -> CapabilityFuture<T> + Send,
    T: Send,
{
    match AssertUnwindSafe(async move { call().await }).catch_unwind().await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(source)) => Err(CapabilityError::Rejected { capability, source }),
        Err(_) => Err(CapabilityError::Panicked { capability }),
    }
}

/// Builder for `Capabilities`; `build` fails without `sign_transaction`.
#[derive(Default)]
pub struct CapabilitiesBuilder {
    accounts: Option<AccountsFn>,
    get_transaction_count: Option<TransactionCountFn>,
    gas_price: Option<GasPrice>,
    sign_transaction: Option<SignTransactionFn>,
    sign_typed_data: Option<SignDataFn>,
    sign_typed_data_v3: Option<SignPairFn>,
    sign_message: Option<SignPairFn>,
    sign_personal_message: Option<SignPairFn>,
}

impl CapabilitiesBuilder {
    pub fn accounts<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Vec<String>>> + Send + 'static,
    {
        self.accounts = Some(Arc::new(move || f().boxed()));
        self
    }

    /// Answer `eth_accounts` with a fixed list.
    pub fn static_accounts(self, accounts: Vec<String>) -> Self {
        self.accounts(move || {
            let accounts = accounts.clone();
            async move { Ok(accounts) }
        })
    }

    /// Called with the positional params of `eth_getTransactionCount`.
    pub fn get_transaction_count<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.get_transaction_count = Some(Arc::new(move |params| f(params).boxed()));
        self
    }

    pub fn gas_price<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.gas_price = Some(GasPrice::Dynamic(Arc::new(move || f().boxed())));
        self
    }

    pub fn static_gas_price(mut self, price: impl Into<Value>) -> Self {
        self.gas_price = Some(GasPrice::Static(price.into()));
        self
    }

    /// Sign a transaction object and return the raw transaction as hex.
    pub fn sign_transaction<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(TransactionObject) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.sign_transaction = Some(Arc::new(move |tx| f(tx).boxed()));
        self
    }

    pub fn sign_typed_data<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.sign_typed_data = Some(Arc::new(move |data| f(data).boxed()));
        self
    }

    pub fn sign_typed_data_v3<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.sign_typed_data_v3 = Some(Arc::new(move |a, b| f(a, b).boxed()));
        self
    }

    pub fn sign_message<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.sign_message = Some(Arc::new(move |a, b| f(a, b).boxed()));
        self
    }

    pub fn sign_personal_message<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        self.sign_personal_message = Some(Arc::new(move |a, b| f(a, b).boxed()));
        self
    }

    pub fn build(self) -> Result<Capabilities, ConfigError> {
        let sign_transaction = self
            .sign_transaction
            .ok_or(ConfigError::MissingCapability("sign_transaction"))?;
        Ok(Capabilities {
            accounts: self.accounts,
            get_transaction_count: self.get_transaction_count,
            gas_price: self.gas_price,
            sign_transaction,
            sign_typed_data: self.sign_typed_data,
            sign_typed_data_v3: self.sign_typed_data_v3,
            sign_message: self.sign_message,
            sign_personal_message: self.sign_personal_message,
        })
    }
}
