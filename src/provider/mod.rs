//! Provider module
//!
//! - `Capabilities`: injected signer / account functions
//! - `SignerProvider`: dispatcher that resolves signing methods locally,
//!   queues `eth_sendTransaction` and forwards everything else upstream

pub mod capabilities;
pub mod dispatcher;
pub mod options;

pub use capabilities::{Capabilities, CapabilitiesBuilder, GasPrice, TransactionObject};
pub use dispatcher::SignerProvider;
pub use options::ProviderOptions;
