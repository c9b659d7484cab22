//! Wallet facade over the engine and its collaborators
//!
//! Every call rediscovers addresses and builds its own state, so concurrent calls never
//! share a draft. Collaborator failures pass through unchanged and nothing is retried.

use crate::builder::{TxBuilder, TxIntent, TxRequest};
use crate::discovery::{AddressBook, AddressDiscovery};
use crate::signer::{required_key_paths, sign};
use anyhow::Result;
use config::Config;
use sendada_codec::{encode_signed, era_transaction_id};
use sendada_common::{
    providers::{KeyProvider, Submitter, UtxoSource},
    *,
};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalletConfig {
    pub builder: BuilderConfig,
    pub discovery: DiscoveryConfig,
}

impl WalletConfig {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            builder: BuilderConfig::from_config(config)?,
            discovery: DiscoveryConfig::from_config(config)?,
        })
    }

    /// Legacy-era wallets only hold legacy addresses
    pub fn schemes(&self) -> Vec<AddressScheme> {
        match self.builder.params.era {
            Era::Byron => vec![AddressScheme::Legacy],
            Era::Shelley => vec![AddressScheme::Current, AddressScheme::Legacy],
        }
    }
}

pub struct Wallet {
    keys: Arc<dyn KeyProvider>,
    utxos: Arc<dyn UtxoSource>,
    submitter: Arc<dyn Submitter>,
    config: WalletConfig,
    builder: TxBuilder,
}

impl Wallet {
    pub fn new(
        keys: Arc<dyn KeyProvider>,
        utxos: Arc<dyn UtxoSource>,
        submitter: Arc<dyn Submitter>,
        config: WalletConfig,
    ) -> Self {
        Self {
            keys,
            utxos,
            submitter,
            config,
            builder: TxBuilder::new(config.builder),
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub async fn address_book(&self) -> Result<AddressBook, WalletError> {
        AddressDiscovery::new(self.keys.as_ref(), self.utxos.as_ref(), self.config.discovery)
            .discover(&self.config.schemes())
            .await
    }

    async fn spendable(&self, book: &AddressBook) -> Result<Vec<UnspentOutput>, WalletError> {
        let addresses: Vec<Address> = book.addresses().cloned().collect();
        self.utxos.list_unspent(&addresses).await
    }

    #[instrument(skip(self))]
    pub async fn balance(&self) -> Result<Value, WalletError> {
        let book = self.address_book().await?;
        let addresses: Vec<Address> = book.addresses().cloned().collect();
        self.utxos.get_balance(&addresses).await
    }

    #[instrument(skip(self, address), fields(address = %address))]
    pub async fn is_own_address(&self, address: &Address) -> Result<bool, WalletError> {
        Ok(self.address_book().await?.is_own_address(address))
    }

    #[instrument(skip(self))]
    pub async fn change_address(&self) -> Result<Address, WalletError> {
        self.address_book()
            .await?
            .change_address()
            .cloned()
            .ok_or_else(|| WalletError::InvalidRequest("no unused change address".to_string()))
    }

    /// Build for `intent`, returning change to the wallet's next unused internal address
    #[instrument(skip(self, intent))]
    pub async fn prepare_tx(&self, intent: TxIntent) -> Result<UnsignedTx, WalletError> {
        let book = self.address_book().await?;
        let change_address = book
            .change_address()
            .cloned()
            .ok_or_else(|| WalletError::InvalidRequest("no unused change address".to_string()))?;
        let request = TxRequest {
            intent,
            ..TxRequest::pay(Vec::new(), change_address)
        };
        let pool = self.spendable(&book).await?;
        self.builder.build(&request, &pool)
    }

    /// Build a fully specified request against the wallet's current UTXOs
    #[instrument(skip(self, request))]
    pub async fn prepare_request(&self, request: &TxRequest) -> Result<UnsignedTx, WalletError> {
        let book = self.address_book().await?;
        let pool = self.spendable(&book).await?;
        self.builder.build(request, &pool)
    }

    #[instrument(skip(self, intent))]
    pub async fn fee_quote(&self, intent: TxIntent) -> Result<Lovelace, WalletError> {
        Ok(self.prepare_tx(intent).await?.body.fee)
    }

    #[instrument(skip(self, destination), fields(destination = %destination))]
    pub async fn max_sendable(&self, destination: &Address) -> Result<Lovelace, WalletError> {
        let book = self.address_book().await?;
        let pool = self.spendable(&book).await?;
        self.builder.max_sendable(&pool, destination)
    }

    #[instrument(skip(self, tx), fields(inputs = tx.body.inputs.len()))]
    pub async fn sign_tx(&self, tx: &UnsignedTx) -> Result<SignedTx, WalletError> {
        let book = self.address_book().await?;
        let paths = required_key_paths(tx, &book)?;
        sign(tx, &paths, self.keys.as_ref(), &self.config.builder.params).await
    }

    #[instrument(skip(self, signed))]
    pub async fn submit_tx(&self, signed: &SignedTx) -> Result<TxHash, WalletError> {
        let bytes = encode_signed(signed)?;
        let expected = era_transaction_id(signed.era, &signed.body)?;
        let id = self.submitter.submit(&bytes).await?;
        info!(%id, size = bytes.len(), "Submitted transaction");
        if id != expected {
            return Err(WalletError::RejectedByNetwork(format!(
                "relay acknowledged {id}, expected {expected}"
            )));
        }
        Ok(id)
    }
}
