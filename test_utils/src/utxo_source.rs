use async_trait::async_trait;
use sendada_common::{providers::UtxoSource, Address, UnspentOutput, Value, WalletError};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// UTXO source backed by in-memory maps
#[derive(Default)]
pub struct InMemoryUtxoSource {
    utxos: RwLock<HashMap<Address, Vec<UnspentOutput>>>,
    /// Addresses with history but possibly nothing unspent
    history: RwLock<HashSet<Address>>,
    failure: RwLock<Option<WalletError>>,
}

impl InMemoryUtxoSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, utxo: UnspentOutput) {
        self.history.write().await.insert(utxo.address.clone());
        self.utxos.write().await.entry(utxo.address.clone()).or_default().push(utxo);
    }

    pub async fn mark_used(&self, address: &Address) {
        self.history.write().await.insert(address.clone());
    }

    /// Make every later call fail with `error`
    pub async fn fail_with(&self, error: WalletError) {
        *self.failure.write().await = Some(error);
    }

    async fn check(&self) -> Result<(), WalletError> {
        match self.failure.read().await.as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl UtxoSource for InMemoryUtxoSource {
    async fn list_unspent(&self, addresses: &[Address]) -> Result<Vec<UnspentOutput>, WalletError> {
        self.check().await?;
        let utxos = self.utxos.read().await;
        let mut seen = HashSet::new();
        Ok(addresses
            .iter()
            .filter(|address| seen.insert(*address))
            .filter_map(|address| utxos.get(address))
            .flatten()
            .cloned()
            .collect())
    }

    async fn get_balance(&self, addresses: &[Address]) -> Result<Value, WalletError> {
        let utxos = self.list_unspent(addresses).await?;
        Value::sum(utxos.iter().map(|utxo| &utxo.value))
            .ok_or_else(|| WalletError::NetworkError("balance overflows".to_string()))
    }

    async fn filter_used(&self, addresses: &[Address]) -> Result<Vec<Address>, WalletError> {
        self.check().await?;
        let history = self.history.read().await;
        Ok(addresses.iter().filter(|address| history.contains(*address)).cloned().collect())
    }
}
