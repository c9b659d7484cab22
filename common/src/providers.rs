//! Interfaces to the collaborators the engine consumes but does not own

use crate::address::Address;
use crate::asset::Value;
use crate::crypto::{ExtendedPublicKey, Signature};
use crate::error::WalletError;
use crate::hash::TxHash;
use crate::tx::{KeyPath, UnspentOutput};
use async_trait::async_trait;

/// Source of chain state for a set of addresses
#[async_trait]
pub trait UtxoSource: Send + Sync {
    /// Unspent outputs held by any of `addresses`
    async fn list_unspent(&self, addresses: &[Address]) -> Result<Vec<UnspentOutput>, WalletError>;

    /// Total value held by `addresses`
    async fn get_balance(&self, addresses: &[Address]) -> Result<Value, WalletError>;

    /// The subset of `addresses` that has ever appeared on chain, in input order
    async fn filter_used(&self, addresses: &[Address]) -> Result<Vec<Address>, WalletError>;
}

/// Holder of the wallet's keys
///
/// Only public material and signatures cross this boundary.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn derive_address(&self, path: &KeyPath) -> Result<Address, WalletError>;

    async fn public_key(&self, path: &KeyPath) -> Result<ExtendedPublicKey, WalletError>;

    /// Ed25519 signature over `message`; a missing key is a `SigningFailure`
    async fn sign(&self, path: &KeyPath, message: &[u8]) -> Result<Signature, WalletError>;
}

/// Relay that broadcasts finished transactions
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, signed: &[u8]) -> Result<TxHash, WalletError>;
}
