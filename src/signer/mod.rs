//! Signer backends that can be plugged into a `Capabilities` set.
//!
//! Only the remote signer lives here; in-process key signers are supplied by
//! the embedding application as closures.

pub mod remote;

pub use remote::RemoteSigner;
